//! ABI-shaped kernel facade.
//!
//! [`Kernel`] owns the per-session state (handle table, file service,
//! clipboard coordinator and last error) and exposes the classic calls with
//! integer handles and sentinel returns. Every failure is recorded in the
//! last-error channel before the sentinel is returned.

mod clipboard_api;
mod file_api;

use ek_core::clipboard::ClipboardCoordinator;
use ek_core::error::{KernelError, KernelResult, LastError};
use ek_core::file::FileSystem;
use ek_core::handle::{Handle, HandleTable};

/// Failure return of the integer-handle file calls.
pub const HFILE_ERROR: i32 = -1;

pub struct Kernel {
    table: HandleTable,
    files: FileSystem,
    clipboard: ClipboardCoordinator,
    last_error: LastError,
}

impl Kernel {
    pub fn new(files: FileSystem, clipboard: ClipboardCoordinator, max_handles: usize) -> Self {
        Self {
            table: HandleTable::new(max_handles),
            files,
            clipboard,
            last_error: LastError::default(),
        }
    }

    pub fn last_error(&self) -> &LastError {
        &self.last_error
    }

    pub fn set_last_error(&mut self, error: Option<KernelError>) {
        match error {
            Some(error) => self.last_error.record(error),
            None => self.last_error.clear(),
        }
    }

    pub fn handles(&self) -> &HandleTable {
        &self.table
    }

    pub fn files(&self) -> &FileSystem {
        &self.files
    }

    pub fn clipboard(&self) -> &ClipboardCoordinator {
        &self.clipboard
    }

    /// Direct access for window procedures and selection pumps.
    pub fn clipboard_mut(&mut self) -> &mut ClipboardCoordinator {
        &mut self.clipboard
    }

    /// `SetHandleCount`: grow the table, returning the new capacity.
    pub fn set_handle_count(&mut self, count: u16) -> u16 {
        let capacity = self.table.set_handle_count(usize::from(count));
        u16::try_from(capacity).unwrap_or(u16::MAX)
    }

    /// End of session: close every handle and give all clipboard data and
    /// the host selection back. Returns the number of handles closed.
    pub fn shutdown(&mut self) -> usize {
        let closed = self.table.close_all();
        self.clipboard.release_all();
        tracing::info!(closed, "kernel session shut down");
        closed
    }

    /// Record a failure, passing successes through.
    fn check<T>(&mut self, result: KernelResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::debug!(error = %err, code = err.code(), "kernel call failed");
                self.last_error.record(err);
                None
            }
        }
    }
}

/// Table handle named by an integer file handle.
fn handle_of(hfile: i32) -> KernelResult<Handle> {
    u32::try_from(hfile)
        .ok()
        .filter(|raw| *raw != 0)
        .map(Handle::from_raw)
        .ok_or(KernelError::InvalidHandle)
}

fn hfile_of(handle: Handle) -> i32 {
    i32::try_from(handle.raw()).unwrap_or(HFILE_ERROR)
}
