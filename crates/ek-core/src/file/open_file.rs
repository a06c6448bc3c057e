//! `OpenFile` and its flag word.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::service::{close_quietly, FileSystem};
use super::time::DosDateTime;
use crate::error::{KernelError, KernelResult};
use crate::handle::{Handle, HandleTable};
use crate::ports::{DosFullName, NativeAccess, NativeOpenOptions};

bitflags! {
    /// `OF_*` mode bits. No access bit means read-only.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFileFlags: u32 {
        const WRITE = 0x0001;
        const READWRITE = 0x0002;
        const PARSE = 0x0100;
        const DELETE = 0x0200;
        /// Same bit as `SEARCH`; means verify when combined with `REOPEN`.
        const VERIFY = 0x0400;
        const SEARCH = 0x0400;
        const CREATE = 0x1000;
        const EXIST = 0x4000;
        const REOPEN = 0x8000;
    }
}

impl OpenFileFlags {
    pub fn access(self) -> NativeAccess {
        match self.bits() & 3 {
            1 => NativeAccess::Write,
            2 => NativeAccess::ReadWrite,
            _ => NativeAccess::Read,
        }
    }
}

/// `OFSTRUCT`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfStruct {
    pub fixed_disk: bool,
    /// DOS error code of the last failure, 0 on success.
    pub error_code: u16,
    /// Emulated (short) path of the file found.
    pub path_name: String,
    /// Last-write stamp recorded at open, checked by `VERIFY | REOPEN`.
    pub reserved: DosDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFileOutcome {
    /// `PARSE`: the struct was filled, nothing opened.
    Parsed,
    /// `DELETE`: the file was removed.
    Deleted,
    /// `EXIST`: the file could be opened; the handle is already closed.
    Exists(Handle),
    Opened(Handle),
}

impl FileSystem {
    pub fn open_file(
        &self,
        table: &mut HandleTable,
        name: &str,
        ofs: &mut OfStruct,
        flags: OpenFileFlags,
    ) -> KernelResult<OpenFileOutcome> {
        ofs.error_code = 0;
        let name = if flags.contains(OpenFileFlags::REOPEN) {
            ofs.path_name.clone()
        } else {
            name.to_string()
        };
        tracing::debug!(name = %name, flags = ?flags, "OpenFile");

        let result = self.do_open_file(table, &name, ofs, flags);
        if let Err(err) = result {
            tracing::debug!(name = %name, error = %err, "OpenFile failed");
            ofs.error_code = err.code();
        }
        result
    }

    fn do_open_file(
        &self,
        table: &mut HandleTable,
        name: &str,
        ofs: &mut OfStruct,
        flags: OpenFileFlags,
    ) -> KernelResult<OpenFileOutcome> {
        if flags.contains(OpenFileFlags::PARSE) {
            let full = self.paths.full_name(name, false)?;
            ofs.fixed_disk = self.paths.is_fixed_disk(&full.short_name);
            ofs.path_name = full.short_name;
            return Ok(OpenFileOutcome::Parsed);
        }

        if flags.contains(OpenFileFlags::CREATE) {
            let handle = self.create(table, name, 0o666, false)?;
            if let Ok(full) = self.paths.full_name(name, false) {
                ofs.path_name = full.short_name;
            }
            return Ok(finish(table, handle, flags));
        }

        let full = self.locate(name, flags).ok_or(KernelError::NotFound)?;
        tracing::debug!(long = %full.long_name.display(), short = %full.short_name, "OpenFile found");
        ofs.path_name = full.short_name.clone();

        if flags.contains(OpenFileFlags::DELETE) {
            self.native
                .unlink(&full.long_name)
                .map_err(|_| KernelError::NotFound)?;
            return Ok(OpenFileOutcome::Deleted);
        }

        let handle = self
            .open_native(table, &full.long_name, &NativeOpenOptions::open(flags.access()))
            .map_err(|_| KernelError::NotFound)?;
        let stamp = match self.file_times(table, handle) {
            Ok(times) => times.last_write.to_dos_date_time(),
            Err(err) => {
                close_quietly(table, handle);
                return Err(err);
            }
        };
        if flags.contains(OpenFileFlags::VERIFY | OpenFileFlags::REOPEN) && ofs.reserved != stamp {
            tracing::debug!(name, "OpenFile verify failed");
            close_quietly(table, handle);
            return Err(KernelError::NotFound);
        }
        ofs.reserved = stamp;
        Ok(finish(table, handle, flags))
    }

    /// With `SEARCH` the name is tried as given, then by its bare file name
    /// along the search path. Otherwise the search path resolves it.
    fn locate(&self, name: &str, flags: OpenFileFlags) -> Option<DosFullName> {
        if flags.contains(OpenFileFlags::SEARCH) && !flags.contains(OpenFileFlags::REOPEN) {
            if let Ok(full) = self.paths.full_name(name, true) {
                return Some(full);
            }
            let bare = bare_file_name(name);
            if bare.is_empty() {
                return None;
            }
            return self.paths.search_path(bare);
        }
        self.paths.search_path(name)
    }
}

fn finish(table: &mut HandleTable, handle: Handle, flags: OpenFileFlags) -> OpenFileOutcome {
    if flags.contains(OpenFileFlags::EXIST) {
        close_quietly(table, handle);
        OpenFileOutcome::Exists(handle)
    } else {
        OpenFileOutcome::Opened(handle)
    }
}

/// Drop a drive prefix and any directory components.
fn bare_file_name(name: &str) -> &str {
    let name = match name.as_bytes() {
        [_, b':', ..] => &name[2..],
        _ => name,
    };
    name.rsplit(['\\', '/']).next().unwrap_or(name)
}
