use std::io::{self, SeekFrom};
use std::path::Path;

/// Access requested from the native open call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeAccess {
    Read,
    Write,
    ReadWrite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeOpenOptions {
    pub access: NativeAccess,
    pub create: bool,
    pub truncate: bool,
    /// Fail if the file already exists (`O_EXCL`).
    pub exclusive: bool,
    /// Permission bits used when the file is created.
    pub mode: u32,
}

impl NativeOpenOptions {
    pub fn open(access: NativeAccess) -> Self {
        Self {
            access,
            create: false,
            truncate: false,
            exclusive: false,
            mode: 0o666,
        }
    }

    pub fn create(mode: u32, exclusive: bool) -> Self {
        Self {
            access: NativeAccess::ReadWrite,
            create: true,
            truncate: true,
            exclusive,
            mode,
        }
    }

    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeFileType {
    Regular,
    Directory,
    CharDevice,
    Fifo,
    Other,
}

/// Subset of `stat(2)` the emulation needs. Times are Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeStat {
    pub file_type: NativeFileType,
    /// Owner write permission is missing.
    pub readonly: bool,
    pub size: u64,
    pub nlink: u64,
    pub ino: u64,
    pub mtime: i64,
    pub atime: i64,
}

impl NativeStat {
    pub fn is_dir(&self) -> bool {
        self.file_type == NativeFileType::Directory
    }
}

/// An open native descriptor, exclusively owned by one file object.
///
/// The seek position belongs to the descriptor, so every handle that
/// shares the owning object shares the position.
pub trait NativeFile: Send + Sync {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;
    fn write(&self, buf: &[u8]) -> io::Result<usize>;
    fn seek(&self, pos: SeekFrom) -> io::Result<u64>;
    /// Truncate or extend the file to the current position.
    fn truncate_at_current(&self) -> io::Result<()>;
    fn sync(&self) -> io::Result<()>;
    fn metadata(&self) -> io::Result<NativeStat>;
    fn set_times(&self, accessed: Option<i64>, modified: Option<i64>) -> io::Result<()>;
    /// Duplicate the descriptor (`dup(2)`).
    fn try_clone(&self) -> io::Result<Box<dyn NativeFile>>;
    /// Release the descriptor. Later calls on this value are not expected.
    fn close(&mut self);
}

/// Native storage primitives.
pub trait NativeFsPort: Send + Sync {
    fn open(&self, path: &Path, options: &NativeOpenOptions) -> io::Result<Box<dyn NativeFile>>;
    fn stat(&self, path: &Path) -> io::Result<NativeStat>;
    fn unlink(&self, path: &Path) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn is_dir_writable(&self, dir: &Path) -> bool;
}

#[cfg(test)]
mockall::mock! {
    pub NativeDescriptor {}

    impl NativeFile for NativeDescriptor {
        fn read(&self, buf: &mut [u8]) -> io::Result<usize>;
        fn write(&self, buf: &[u8]) -> io::Result<usize>;
        fn seek(&self, pos: SeekFrom) -> io::Result<u64>;
        fn truncate_at_current(&self) -> io::Result<()>;
        fn sync(&self) -> io::Result<()>;
        fn metadata(&self) -> io::Result<NativeStat>;
        fn set_times(&self, accessed: Option<i64>, modified: Option<i64>) -> io::Result<()>;
        fn try_clone(&self) -> io::Result<Box<dyn NativeFile>>;
        fn close(&mut self);
    }
}

#[cfg(test)]
mockall::mock! {
    pub NativeFs {}

    impl NativeFsPort for NativeFs {
        fn open(&self, path: &Path, options: &NativeOpenOptions) -> io::Result<Box<dyn NativeFile>>;
        fn stat(&self, path: &Path) -> io::Result<NativeStat>;
        fn unlink(&self, path: &Path) -> io::Result<()>;
        fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
        fn is_dir_writable(&self, dir: &Path) -> bool;
    }
}
