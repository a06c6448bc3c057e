//! `std::fs` implementation of the native storage ports.

use std::fs::{self, File, Metadata, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ek_core::ports::{
    NativeAccess, NativeFile, NativeFileType, NativeFsPort, NativeOpenOptions, NativeStat,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct StdNativeFs;

impl StdNativeFs {
    pub fn new() -> Self {
        Self
    }
}

impl NativeFsPort for StdNativeFs {
    fn open(&self, path: &Path, options: &NativeOpenOptions) -> io::Result<Box<dyn NativeFile>> {
        let mut open = OpenOptions::new();
        match options.access {
            NativeAccess::Read => open.read(true),
            NativeAccess::Write => open.write(true),
            NativeAccess::ReadWrite => open.read(true).write(true),
        };
        if options.exclusive {
            open.create_new(true);
        } else {
            open.create(options.create);
        }
        open.truncate(options.truncate);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            open.mode(options.mode);
        }

        let file = open.open(path)?;
        tracing::trace!(path = %path.display(), access = ?options.access, "native open");
        Ok(Box::new(StdNativeFile::new(file)))
    }

    fn stat(&self, path: &Path) -> io::Result<NativeStat> {
        fs::metadata(path).map(|metadata| native_stat(&metadata))
    }

    fn unlink(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn is_dir_writable(&self, dir: &Path) -> bool {
        fs::metadata(dir).is_ok_and(|metadata| metadata.is_dir() && !owner_readonly(&metadata))
    }
}

/// Descriptor backed by a [`File`]. All operations after `close` fail with
/// `EBADF`-like errors.
#[derive(Debug)]
pub struct StdNativeFile {
    file: Option<File>,
}

impl StdNativeFile {
    pub fn new(file: File) -> Self {
        Self { file: Some(file) }
    }

    fn file(&self) -> io::Result<&File> {
        self.file
            .as_ref()
            .ok_or_else(|| io::Error::other("descriptor already closed"))
    }
}

impl NativeFile for StdNativeFile {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut file = self.file()?;
        loop {
            match file.read(buf) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                result => return result,
            }
        }
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.file()?;
        loop {
            match file.write(buf) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                result => return result,
            }
        }
    }

    fn seek(&self, pos: SeekFrom) -> io::Result<u64> {
        let mut file = self.file()?;
        file.seek(pos)
    }

    fn truncate_at_current(&self) -> io::Result<()> {
        let mut file = self.file()?;
        let position = file.stream_position()?;
        file.set_len(position)
    }

    fn sync(&self) -> io::Result<()> {
        self.file()?.sync_all()
    }

    fn metadata(&self) -> io::Result<NativeStat> {
        self.file()?.metadata().map(|metadata| native_stat(&metadata))
    }

    fn set_times(&self, accessed: Option<i64>, modified: Option<i64>) -> io::Result<()> {
        let mut times = fs::FileTimes::new();
        if let Some(secs) = accessed {
            times = times.set_accessed(system_time(secs));
        }
        if let Some(secs) = modified {
            times = times.set_modified(system_time(secs));
        }
        self.file()?.set_times(times)
    }

    fn try_clone(&self) -> io::Result<Box<dyn NativeFile>> {
        let clone = self.file()?.try_clone()?;
        Ok(Box::new(StdNativeFile::new(clone)))
    }

    fn close(&mut self) {
        if self.file.take().is_some() {
            tracing::trace!("native close");
        }
    }
}

fn system_time(secs: i64) -> SystemTime {
    let offset = Duration::from_secs(secs.unsigned_abs());
    if secs >= 0 {
        UNIX_EPOCH + offset
    } else {
        UNIX_EPOCH - offset
    }
}

fn unix_secs(time: io::Result<SystemTime>) -> i64 {
    match time.map(|time| time.duration_since(UNIX_EPOCH)) {
        Ok(Ok(after)) => i64::try_from(after.as_secs()).unwrap_or(i64::MAX),
        Ok(Err(before)) => -i64::try_from(before.duration().as_secs()).unwrap_or(i64::MAX),
        Err(_) => 0,
    }
}

#[cfg(unix)]
fn owner_readonly(metadata: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o200 == 0
}

#[cfg(not(unix))]
fn owner_readonly(metadata: &Metadata) -> bool {
    metadata.permissions().readonly()
}

#[cfg(unix)]
fn native_file_type(metadata: &Metadata) -> NativeFileType {
    use std::os::unix::fs::FileTypeExt;
    let file_type = metadata.file_type();
    if file_type.is_file() {
        NativeFileType::Regular
    } else if file_type.is_dir() {
        NativeFileType::Directory
    } else if file_type.is_char_device() {
        NativeFileType::CharDevice
    } else if file_type.is_fifo() {
        NativeFileType::Fifo
    } else {
        NativeFileType::Other
    }
}

#[cfg(not(unix))]
fn native_file_type(metadata: &Metadata) -> NativeFileType {
    if metadata.is_file() {
        NativeFileType::Regular
    } else if metadata.is_dir() {
        NativeFileType::Directory
    } else {
        NativeFileType::Other
    }
}

#[cfg(unix)]
fn link_info(metadata: &Metadata) -> (u64, u64) {
    use std::os::unix::fs::MetadataExt;
    (metadata.nlink(), metadata.ino())
}

#[cfg(not(unix))]
fn link_info(_metadata: &Metadata) -> (u64, u64) {
    (1, 0)
}

fn native_stat(metadata: &Metadata) -> NativeStat {
    let (nlink, ino) = link_info(metadata);
    NativeStat {
        file_type: native_file_type(metadata),
        readonly: owner_readonly(metadata),
        size: metadata.len(),
        nlink,
        ino,
        mtime: unix_secs(metadata.modified()),
        atime: unix_secs(metadata.accessed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create(path: &Path) -> Box<dyn NativeFile> {
        StdNativeFs::new()
            .open(path, &NativeOpenOptions::create(0o666, false))
            .unwrap()
    }

    #[test]
    fn test_clone_shares_position() {
        let dir = TempDir::new().unwrap();
        let file = create(&dir.path().join("data.bin"));
        let clone = file.try_clone().unwrap();

        assert_eq!(file.write(b"hello world").unwrap(), 11);
        assert_eq!(clone.seek(SeekFrom::Current(0)).unwrap(), 11);

        clone.seek(SeekFrom::Start(6)).unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(file.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"world");
    }

    #[test]
    fn test_truncate_at_current_position() {
        let dir = TempDir::new().unwrap();
        let file = create(&dir.path().join("data.bin"));
        file.write(b"0123456789").unwrap();
        file.seek(SeekFrom::Start(4)).unwrap();

        file.truncate_at_current().unwrap();

        assert_eq!(file.metadata().unwrap().size, 4);
    }

    #[test]
    fn test_exclusive_create_fails_on_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("taken.tmp");
        create(&path);

        let err = StdNativeFs::new()
            .open(&path, &NativeOpenOptions::create(0o666, true))
            .err()
            .unwrap();

        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_set_times_leaves_unset_time_alone() {
        let dir = TempDir::new().unwrap();
        let file = create(&dir.path().join("stamped"));
        file.set_times(Some(1_000_000), Some(2_000_000)).unwrap();

        file.set_times(None, Some(3_000_000)).unwrap();

        let stat = file.metadata().unwrap();
        assert_eq!(stat.atime, 1_000_000);
        assert_eq!(stat.mtime, 3_000_000);
    }

    #[test]
    fn test_closed_descriptor_rejects_io() {
        let dir = TempDir::new().unwrap();
        let mut file = create(&dir.path().join("gone"));

        file.close();

        assert!(file.write(b"x").is_err());
        assert!(file.metadata().is_err());
    }

    #[test]
    fn test_stat_classifies_directories() {
        let dir = TempDir::new().unwrap();
        let stat = StdNativeFs::new().stat(dir.path()).unwrap();

        assert!(stat.is_dir());
        assert!(StdNativeFs::new().is_dir_writable(dir.path()));
        assert!(!StdNativeFs::new().is_dir_writable(&dir.path().join("missing")));
    }

    #[cfg(unix)]
    #[test]
    fn test_create_mode_marks_file_read_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locked");
        StdNativeFs::new()
            .open(&path, &NativeOpenOptions::create(0o444, false))
            .unwrap();

        assert!(StdNativeFs::new().stat(&path).unwrap().readonly);
    }
}
