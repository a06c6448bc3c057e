//! Integer-handle file calls.

use ek_core::error::KernelError;
use ek_core::file::{
    FileInfo, FileTime, FileTimes, FileType, OfStruct, OpenFileFlags, OpenFileOutcome, SeekOrigin,
};
use ek_core::ports::{NativeFile, NativeOpenOptions};

use super::{handle_of, hfile_of, Kernel, HFILE_ERROR};

/// `_lcreat` attribute bit making the new file read-only.
const ATTR_READONLY: u32 = 0x01;

/// Failure return of the calls answering with a 32-bit value.
pub const INVALID_VALUE: u32 = u32::MAX;

impl Kernel {
    /// `_lopen`: open an existing file. The low two bits of `mode` select
    /// read, write or read-write access.
    pub fn lopen(&mut self, path: &str, mode: u32) -> i32 {
        let access = OpenFileFlags::from_bits_truncate(mode).access();
        let result = self
            .files
            .open(&mut self.table, path, &NativeOpenOptions::open(access));
        self.check(result).map_or(HFILE_ERROR, hfile_of)
    }

    /// `_lcreat`: create or truncate a file.
    pub fn lcreat(&mut self, path: &str, attributes: u32) -> i32 {
        let mode = if attributes & ATTR_READONLY != 0 { 0o444 } else { 0o666 };
        let result = self.files.create(&mut self.table, path, mode, false);
        self.check(result).map_or(HFILE_ERROR, hfile_of)
    }

    /// `_lcreat_uniq`: like [`Kernel::lcreat`] but fails with `Exists` when
    /// the file is already there.
    pub fn lcreat_uniq(&mut self, path: &str, attributes: u32) -> i32 {
        let mode = if attributes & ATTR_READONLY != 0 { 0o444 } else { 0o666 };
        let result = self.files.create(&mut self.table, path, mode, true);
        self.check(result).map_or(HFILE_ERROR, hfile_of)
    }

    pub fn lclose(&mut self, hfile: i32) -> i32 {
        let result = handle_of(hfile).and_then(|handle| self.files.close(&mut self.table, handle));
        self.check(result).map_or(HFILE_ERROR, |()| 0)
    }

    /// `_lread`: bytes read into `buf`.
    pub fn lread(&mut self, hfile: i32, buf: &mut [u8]) -> i32 {
        let result = handle_of(hfile).and_then(|handle| self.files.read(&self.table, handle, buf));
        self.check(result)
            .map_or(HFILE_ERROR, |count| i32::try_from(count).unwrap_or(i32::MAX))
    }

    /// `_hwrite`: bytes written. An empty write truncates the file at the
    /// current position.
    pub fn hwrite(&mut self, hfile: i32, data: &[u8]) -> i32 {
        let result = handle_of(hfile).and_then(|handle| {
            if data.is_empty() {
                self.files.set_end_of_file(&self.table, handle).map(|()| 0)
            } else {
                self.files.write(&self.table, handle, data)
            }
        });
        self.check(result)
            .map_or(HFILE_ERROR, |count| i32::try_from(count).unwrap_or(i32::MAX))
    }

    /// `_llseek`: new position, `HFILE_ERROR` on failure.
    pub fn llseek(&mut self, hfile: i32, offset: i32, origin: u32) -> i32 {
        let result = handle_of(hfile)
            .and_then(|handle| {
                self.files.seek(
                    &self.table,
                    handle,
                    i64::from(offset),
                    SeekOrigin::from_code(origin),
                )
            })
            .and_then(|position| i32::try_from(position).map_err(|_| KernelError::InvalidParameter));
        self.check(result).unwrap_or(HFILE_ERROR)
    }

    pub fn set_end_of_file(&mut self, hfile: i32) -> bool {
        let result = handle_of(hfile).and_then(|handle| self.files.set_end_of_file(&self.table, handle));
        self.check(result).is_some()
    }

    pub fn flush_file_buffers(&mut self, hfile: i32) -> bool {
        let result = handle_of(hfile).and_then(|handle| self.files.flush(&self.table, handle));
        self.check(result).is_some()
    }

    /// Second handle on the same open file; both share one position.
    pub fn duplicate_handle(&mut self, hfile: i32) -> i32 {
        let result = handle_of(hfile).and_then(|handle| self.files.dup(&mut self.table, handle));
        self.check(result).map_or(HFILE_ERROR, hfile_of)
    }

    /// Make `target` name the file behind `source`.
    pub fn duplicate_handle_to(&mut self, source: i32, target: i32) -> i32 {
        let result = handle_of(source).and_then(|source| {
            let target = handle_of(target)?;
            self.files.dup2(&mut self.table, source, target)
        });
        self.check(result).map_or(HFILE_ERROR, hfile_of)
    }

    /// Wrap a duplicate of a host descriptor in a new file handle. The
    /// caller keeps ownership of `native`.
    pub fn adopt_native_file(&mut self, native: &dyn NativeFile) -> i32 {
        let result = self.files.adopt_native(&mut self.table, native);
        self.check(result).map_or(HFILE_ERROR, hfile_of)
    }

    /// `OpenFile`. Returns the handle for an open, the already closed
    /// handle for `OF_EXIST`, 1 for `OF_DELETE` and 0 for `OF_PARSE`.
    pub fn open_file(&mut self, name: &str, ofs: &mut OfStruct, mode: u32) -> i32 {
        let flags = OpenFileFlags::from_bits_truncate(mode);
        let result = self.files.open_file(&mut self.table, name, ofs, flags);
        match self.check(result) {
            Some(OpenFileOutcome::Parsed) => 0,
            Some(OpenFileOutcome::Deleted) => 1,
            Some(OpenFileOutcome::Exists(handle) | OpenFileOutcome::Opened(handle)) => hfile_of(handle),
            None => HFILE_ERROR,
        }
    }

    /// `GetTempFileName`: the numeric part of the name, 0 on failure. The
    /// full name is written to `out`.
    pub fn get_temp_file_name(
        &mut self,
        dir: Option<&str>,
        prefix: &str,
        unique: u32,
        out: &mut String,
    ) -> u32 {
        let result = self
            .files
            .generate_temp_name(&mut self.table, dir, prefix, unique);
        match self.check(result) {
            Some(temp) => {
                *out = temp.path;
                temp.unique
            }
            None => 0,
        }
    }

    pub fn copy_file(&mut self, source: &str, dest: &str, fail_if_exists: bool) -> bool {
        let result = self.files.copy(&mut self.table, source, dest, fail_if_exists);
        self.check(result).is_some()
    }

    /// `MoveFile`: a plain rename. Moves across devices fail.
    pub fn move_file(&mut self, source: &str, dest: &str) -> bool {
        let result = self.files.move_file(source, dest);
        self.check(result).is_some()
    }

    pub fn delete_file(&mut self, path: &str) -> bool {
        let result = self.files.delete(path);
        self.check(result).is_some()
    }

    /// Information about a file by name, without opening it.
    pub fn stat(&mut self, path: &str) -> Option<FileInfo> {
        let result = self.files.stat(path);
        self.check(result)
    }

    /// `GetFileAttributes`: attribute bits, [`INVALID_VALUE`] on failure.
    pub fn get_file_attributes(&mut self, path: &str) -> u32 {
        let result = self.files.attributes(path);
        self.check(result)
            .map_or(INVALID_VALUE, |attributes| attributes.bits())
    }

    /// Low 32 bits of the size, [`INVALID_VALUE`] on failure. The high
    /// word goes to `high` when given.
    pub fn get_file_size(&mut self, hfile: i32, high: Option<&mut u32>) -> u32 {
        let result = handle_of(hfile).and_then(|handle| self.files.file_size(&self.table, handle));
        let Some(size) = self.check(result) else {
            return INVALID_VALUE;
        };
        if let Some(high) = high {
            *high = (size >> 32) as u32;
        }
        size as u32
    }

    pub fn get_file_type(&mut self, hfile: i32) -> u32 {
        let result = handle_of(hfile).and_then(|handle| self.files.file_type(&self.table, handle));
        self.check(result).map_or(0, |file_type| file_type.code())
    }

    /// Override the reported file type. Unknown type codes are rejected.
    pub fn set_file_type(&mut self, hfile: i32, code: u32) -> bool {
        let result = handle_of(hfile).and_then(|handle| {
            let file_type = FileType::from_code(code).ok_or(KernelError::InvalidParameter)?;
            self.files.set_file_type(&self.table, handle, file_type)
        });
        self.check(result).is_some()
    }

    pub fn get_file_information_by_handle(&mut self, hfile: i32) -> Option<FileInfo> {
        let result = handle_of(hfile)
            .and_then(|handle| self.files.information_by_handle(&self.table, handle));
        self.check(result)
    }

    pub fn get_file_time(&mut self, hfile: i32) -> Option<FileTimes> {
        let result = handle_of(hfile).and_then(|handle| self.files.file_times(&self.table, handle));
        self.check(result)
    }

    /// `SetFileTime`. Creation time cannot be stored and is ignored.
    pub fn set_file_time(
        &mut self,
        hfile: i32,
        last_access: Option<FileTime>,
        last_write: Option<FileTime>,
    ) -> bool {
        let result = handle_of(hfile).and_then(|handle| {
            self.files
                .set_file_times(&self.table, handle, last_access, last_write)
        });
        self.check(result).is_some()
    }
}
