//! Kernel error taxonomy and the per-process last-error channel.
//!
//! Native failures are translated into [`KernelError`] at the point where the
//! native call fails. Callers of the ABI-shaped facade never see an
//! `io::Error`; they see a sentinel return value and consult [`LastError`].

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum KernelError {
    #[error("invalid handle")]
    InvalidHandle,

    #[error("file not found")]
    NotFound,

    #[error("access denied")]
    AccessDenied,

    #[error("file exists")]
    Exists,

    #[error("disk full")]
    DiskFull,

    #[error("too many open handles")]
    TooManyOpenHandles,

    #[error("out of memory")]
    OutOfMemory,

    /// Native resource temporarily busy. Callers may retry.
    #[error("lock violation")]
    LockViolation,

    #[error("invalid parameter")]
    InvalidParameter,

    /// Unmapped native condition.
    #[error("general failure")]
    GeneralFailure,
}

/// DOS extended error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ErrorClass {
    OutOfResource = 0x01,
    Temporary = 0x02,
    AccessDenied = 0x03,
    SystemFailure = 0x06,
    ProgramError = 0x07,
    NotFound = 0x08,
    MediaError = 0x0b,
    Exists = 0x0c,
}

/// DOS extended error suggested action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SuggestedAction {
    Retry = 0x01,
    Abort = 0x04,
}

/// DOS extended error locus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ErrorLocus {
    Unknown = 0x01,
    Disk = 0x02,
    Memory = 0x05,
}

/// Full DOS extended error record, as returned by the int21 "get extended
/// error" call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DosError {
    pub code: u16,
    pub class: ErrorClass,
    pub action: SuggestedAction,
    pub locus: ErrorLocus,
}

pub mod codes {
    pub const ER_FILE_NOT_FOUND: u16 = 0x02;
    pub const ER_TOO_MANY_OPEN_FILES: u16 = 0x04;
    pub const ER_ACCESS_DENIED: u16 = 0x05;
    pub const ER_INVALID_HANDLE: u16 = 0x06;
    pub const ER_OUT_OF_MEMORY: u16 = 0x08;
    pub const ER_GENERAL_FAILURE: u16 = 0x1f;
    pub const ER_LOCK_VIOLATION: u16 = 0x21;
    pub const ER_DISK_FULL: u16 = 0x27;
    pub const ER_INVALID_PARAMETER: u16 = 0x57;
    pub const ER_FILE_EXISTS: u16 = 0x50;
}

impl KernelError {
    pub fn dos_error(self) -> DosError {
        use codes::*;
        let (code, class, action, locus) = match self {
            KernelError::InvalidHandle => (
                ER_INVALID_HANDLE,
                ErrorClass::ProgramError,
                SuggestedAction::Abort,
                ErrorLocus::Disk,
            ),
            KernelError::NotFound => (
                ER_FILE_NOT_FOUND,
                ErrorClass::NotFound,
                SuggestedAction::Abort,
                ErrorLocus::Disk,
            ),
            KernelError::AccessDenied => (
                ER_ACCESS_DENIED,
                ErrorClass::AccessDenied,
                SuggestedAction::Abort,
                ErrorLocus::Disk,
            ),
            KernelError::Exists => (
                ER_FILE_EXISTS,
                ErrorClass::Exists,
                SuggestedAction::Abort,
                ErrorLocus::Disk,
            ),
            KernelError::DiskFull => (
                ER_DISK_FULL,
                ErrorClass::MediaError,
                SuggestedAction::Abort,
                ErrorLocus::Disk,
            ),
            KernelError::TooManyOpenHandles => (
                ER_TOO_MANY_OPEN_FILES,
                ErrorClass::ProgramError,
                SuggestedAction::Abort,
                ErrorLocus::Disk,
            ),
            KernelError::OutOfMemory => (
                ER_OUT_OF_MEMORY,
                ErrorClass::OutOfResource,
                SuggestedAction::Abort,
                ErrorLocus::Memory,
            ),
            KernelError::LockViolation => (
                ER_LOCK_VIOLATION,
                ErrorClass::Temporary,
                SuggestedAction::Retry,
                ErrorLocus::Disk,
            ),
            KernelError::InvalidParameter => (
                ER_INVALID_PARAMETER,
                ErrorClass::ProgramError,
                SuggestedAction::Abort,
                ErrorLocus::Unknown,
            ),
            KernelError::GeneralFailure => (
                ER_GENERAL_FAILURE,
                ErrorClass::SystemFailure,
                SuggestedAction::Abort,
                ErrorLocus::Unknown,
            ),
        };
        DosError {
            code,
            class,
            action,
            locus,
        }
    }

    pub fn code(self) -> u16 {
        self.dos_error().code
    }

    pub fn is_retryable(self) -> bool {
        self.dos_error().action == SuggestedAction::Retry
    }

    /// Translate a native failure.
    ///
    /// Conditions with no DOS counterpart become [`KernelError::GeneralFailure`]
    /// and are reported on the diagnostic channel.
    pub fn from_native(err: &io::Error) -> Self {
        if let Some(mapped) = err.raw_os_error().and_then(errno::map) {
            return mapped;
        }
        match err.kind() {
            io::ErrorKind::NotFound => KernelError::NotFound,
            io::ErrorKind::PermissionDenied
            | io::ErrorKind::ReadOnlyFilesystem
            | io::ErrorKind::IsADirectory => KernelError::AccessDenied,
            io::ErrorKind::AlreadyExists => KernelError::Exists,
            io::ErrorKind::StorageFull => KernelError::DiskFull,
            io::ErrorKind::WouldBlock | io::ErrorKind::ResourceBusy => KernelError::LockViolation,
            io::ErrorKind::OutOfMemory => KernelError::OutOfMemory,
            io::ErrorKind::InvalidInput => KernelError::InvalidParameter,
            _ => {
                tracing::warn!(error = %err, kind = ?err.kind(), "unmapped native error");
                KernelError::GeneralFailure
            }
        }
    }
}

impl From<io::Error> for KernelError {
    fn from(err: io::Error) -> Self {
        KernelError::from_native(&err)
    }
}

/// Raw errno values whose `io::ErrorKind` is not specific enough.
#[cfg(unix)]
mod errno {
    use super::KernelError;

    const EBADF: i32 = 9;
    const ENFILE: i32 = 23;
    const EMFILE: i32 = 24;

    pub(super) fn map(raw: i32) -> Option<KernelError> {
        match raw {
            EBADF => Some(KernelError::InvalidHandle),
            ENFILE | EMFILE => Some(KernelError::TooManyOpenHandles),
            _ => None,
        }
    }
}

#[cfg(not(unix))]
mod errno {
    use super::KernelError;

    pub(super) fn map(_raw: i32) -> Option<KernelError> {
        None
    }
}

pub type KernelResult<T> = Result<T, KernelError>;

/// Process-wide "last error" side channel.
///
/// Every failing facade operation records its error here; successful
/// operations leave the previous value in place, as the classic API does.
#[derive(Debug, Default, Clone, Copy)]
pub struct LastError {
    error: Option<KernelError>,
}

impl LastError {
    pub fn record(&mut self, error: KernelError) {
        self.error = Some(error);
    }

    pub fn clear(&mut self) {
        self.error = None;
    }

    pub fn get(&self) -> Option<KernelError> {
        self.error
    }

    /// DOS code of the last error, 0 when nothing failed yet.
    pub fn code(&self) -> u16 {
        self.error.map(KernelError::code).unwrap_or(0)
    }

    pub fn extended(&self) -> Option<DosError> {
        self.error.map(KernelError::dos_error)
    }
}
