use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};
use crate::handle::{KernelObjectBody, ObjectKind};
use crate::ports::{NativeFile, NativeFileType};

/// `GetFileType` classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Unknown,
    Disk,
    Char,
    Pipe,
    Remote,
}

impl FileType {
    pub fn code(self) -> u32 {
        match self {
            FileType::Unknown => 0,
            FileType::Disk => 1,
            FileType::Char => 2,
            FileType::Pipe => 3,
            FileType::Remote => 0x8000,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(FileType::Unknown),
            1 => Some(FileType::Disk),
            2 => Some(FileType::Char),
            3 => Some(FileType::Pipe),
            0x8000 => Some(FileType::Remote),
            _ => None,
        }
    }
}

impl From<NativeFileType> for FileType {
    fn from(native: NativeFileType) -> Self {
        match native {
            NativeFileType::CharDevice => FileType::Char,
            NativeFileType::Fifo => FileType::Pipe,
            NativeFileType::Regular | NativeFileType::Directory | NativeFileType::Other => {
                FileType::Disk
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Kernel object wrapping one native descriptor.
///
/// The descriptor is released by [`KernelObjectBody::destroy`], never by
/// individual handles, so duplicated handles share it and its position.
pub struct FileObject {
    native: Mutex<Option<Box<dyn NativeFile>>>,
    path: Mutex<Option<PathBuf>>,
    file_type: Mutex<FileType>,
}

impl FileObject {
    pub fn new(native: Box<dyn NativeFile>, path: Option<PathBuf>, file_type: FileType) -> Self {
        Self {
            native: Mutex::new(Some(native)),
            path: Mutex::new(path),
            file_type: Mutex::new(file_type),
        }
    }

    /// Native path the file was opened by, absent for adopted descriptors.
    pub fn path(&self) -> Option<PathBuf> {
        lock(&self.path).clone()
    }

    pub fn file_type(&self) -> FileType {
        *lock(&self.file_type)
    }

    pub fn set_file_type(&self, file_type: FileType) {
        *lock(&self.file_type) = file_type;
    }

    pub fn is_open(&self) -> bool {
        lock(&self.native).is_some()
    }

    /// Run a native call against the descriptor, translating its failure.
    pub(crate) fn with_native<T>(
        &self,
        op: impl FnOnce(&dyn NativeFile) -> std::io::Result<T>,
    ) -> KernelResult<T> {
        let guard = lock(&self.native);
        let native = guard.as_deref().ok_or(KernelError::InvalidHandle)?;
        op(native).map_err(|err| KernelError::from_native(&err))
    }
}

impl KernelObjectBody for FileObject {
    fn kind(&self) -> ObjectKind {
        ObjectKind::File
    }

    fn destroy(&self) {
        if let Some(mut native) = lock(&self.native).take() {
            native.close();
        }
        lock(&self.path).take();
    }
}

impl fmt::Debug for FileObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileObject")
            .field("open", &self.is_open())
            .field("path", &self.path())
            .field("file_type", &self.file_type())
            .finish()
    }
}
