//! File operations layered on the handle table.
//!
//! Every handle-based operation borrows the file object through
//! [`HandleTable::lookup`], runs the native call, and lets the borrow drop
//! before returning. Native failures are translated where they occur.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::info::{FileAttributes, FileInfo, FileTimes};
use super::object::{FileObject, FileType};
use super::time::FileTime;
use crate::config::FilesConfig;
use crate::error::{KernelError, KernelResult};
use crate::handle::{Handle, HandleTable, ObjectKind, ObjectRef};
use crate::ports::{
    ClockPort, NativeAccess, NativeFile, NativeFsPort, NativeOpenOptions, NativeStat,
    PathResolverPort,
};

/// Size of the buffer `copy` streams through.
pub const COPY_CHUNK_SIZE: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeekOrigin {
    Begin,
    Current,
    End,
}

impl SeekOrigin {
    /// `FILE_BEGIN`/`FILE_CURRENT`/`FILE_END`; unknown values seek from the start.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => SeekOrigin::Current,
            2 => SeekOrigin::End,
            _ => SeekOrigin::Begin,
        }
    }
}

pub struct FileSystem {
    pub(super) paths: Arc<dyn PathResolverPort>,
    pub(super) native: Arc<dyn NativeFsPort>,
    pub(super) clock: Arc<dyn ClockPort>,
    fail_read_only: bool,
}

impl FileSystem {
    pub fn new(
        paths: Arc<dyn PathResolverPort>,
        native: Arc<dyn NativeFsPort>,
        clock: Arc<dyn ClockPort>,
        config: &FilesConfig,
    ) -> Self {
        Self {
            paths,
            native,
            clock,
            fail_read_only: config.fail_read_only,
        }
    }

    pub fn paths(&self) -> &Arc<dyn PathResolverPort> {
        &self.paths
    }

    fn borrow_file(table: &HandleTable, handle: Handle) -> KernelResult<ObjectRef> {
        table.lookup(handle, Some(ObjectKind::File))
    }

    fn with_file<T>(
        table: &HandleTable,
        handle: Handle,
        op: impl FnOnce(&FileObject) -> KernelResult<T>,
    ) -> KernelResult<T> {
        let object = Self::borrow_file(table, handle)?;
        let file = object.as_file().ok_or(KernelError::InvalidHandle)?;
        op(file)
    }

    /// Open an existing file (or device) by emulated path.
    ///
    /// A failed read-write open is retried read-only unless
    /// `files.fail_read_only` is set. Directories are refused.
    pub fn open(
        &self,
        table: &mut HandleTable,
        path: &str,
        options: &NativeOpenOptions,
    ) -> KernelResult<Handle> {
        tracing::debug!(path, access = ?options.access, "open");
        let native_path = match self.paths.device_name(path) {
            Some(device) => {
                tracing::debug!(device = %device.name, "opening device");
                device.target.ok_or_else(|| {
                    tracing::debug!(device = %device.name, "device does not exist");
                    KernelError::NotFound
                })?
            }
            None => self.paths.full_name(path, !options.create)?.long_name,
        };
        self.open_native(table, &native_path, options)
    }

    pub(super) fn open_native(
        &self,
        table: &mut HandleTable,
        path: &Path,
        options: &NativeOpenOptions,
    ) -> KernelResult<Handle> {
        let native = match self.native.open(path, options) {
            Ok(native) => native,
            Err(err) if self.may_fall_back(options) => {
                tracing::info!(path = %path.display(), error = %err, "read-write open failed, retrying read-only");
                self.native
                    .open(path, &NativeOpenOptions::open(NativeAccess::Read))
                    .map_err(|err| KernelError::from_native(&err))?
            }
            Err(err) => return Err(KernelError::from_native(&err)),
        };

        let stat = match native.metadata() {
            Ok(stat) => stat,
            Err(err) => {
                close_native(native);
                return Err(KernelError::from_native(&err));
            }
        };
        if stat.is_dir() {
            tracing::debug!(path = %path.display(), "refusing to open a directory");
            close_native(native);
            return Err(KernelError::AccessDenied);
        }

        let object = FileObject::new(native, Some(path.to_path_buf()), stat.file_type.into());
        table.allocate(object)
    }

    fn may_fall_back(&self, options: &NativeOpenOptions) -> bool {
        !self.fail_read_only && options.access == NativeAccess::ReadWrite && !options.create
    }

    /// Create or truncate a file, read-write. `exclusive` fails with
    /// [`KernelError::Exists`] when the file is already there.
    pub fn create(
        &self,
        table: &mut HandleTable,
        path: &str,
        mode: u32,
        exclusive: bool,
    ) -> KernelResult<Handle> {
        tracing::debug!(path, mode = format_args!("{mode:o}"), exclusive, "create");
        if let Some(device) = self.paths.device_name(path) {
            tracing::debug!(device = %device.name, "refusing to create a device");
            return Err(KernelError::AccessDenied);
        }
        let full = self.paths.full_name(path, false)?;
        let native = self
            .native
            .open(&full.long_name, &NativeOpenOptions::create(mode, exclusive))
            .map_err(|err| KernelError::from_native(&err))?;
        table.allocate(FileObject::new(native, Some(full.long_name), FileType::Disk))
    }

    pub fn close(&self, table: &mut HandleTable, handle: Handle) -> KernelResult<()> {
        table.close(handle)
    }

    /// Read up to `buf.len()` bytes. An empty buffer reads nothing but still
    /// validates the handle.
    pub fn read(&self, table: &HandleTable, handle: Handle, buf: &mut [u8]) -> KernelResult<usize> {
        Self::with_file(table, handle, |file| {
            if buf.is_empty() {
                return Ok(0);
            }
            file.with_native(|native| native.read(buf))
        })
    }

    pub fn write(&self, table: &HandleTable, handle: Handle, data: &[u8]) -> KernelResult<usize> {
        Self::with_file(table, handle, |file| file.with_native(|native| native.write(data)))
    }

    /// Move the shared position. Seeking before the start of the file is
    /// [`KernelError::InvalidParameter`].
    pub fn seek(
        &self,
        table: &HandleTable,
        handle: Handle,
        offset: i64,
        origin: SeekOrigin,
    ) -> KernelResult<u64> {
        let pos = match origin {
            SeekOrigin::Begin => {
                SeekFrom::Start(u64::try_from(offset).map_err(|_| KernelError::InvalidParameter)?)
            }
            SeekOrigin::Current => SeekFrom::Current(offset),
            SeekOrigin::End => SeekFrom::End(offset),
        };
        Self::with_file(table, handle, |file| file.with_native(|native| native.seek(pos)))
    }

    /// Truncate or extend the file to the current position.
    pub fn set_end_of_file(&self, table: &HandleTable, handle: Handle) -> KernelResult<()> {
        Self::with_file(table, handle, |file| {
            file.with_native(|native| native.truncate_at_current())
        })
    }

    pub fn flush(&self, table: &HandleTable, handle: Handle) -> KernelResult<()> {
        Self::with_file(table, handle, |file| file.with_native(|native| native.sync()))
    }

    pub fn information_by_handle(&self, table: &HandleTable, handle: Handle) -> KernelResult<FileInfo> {
        Self::with_file(table, handle, |file| {
            file.with_native(|native| native.metadata())
                .map(|stat| FileInfo::from(&stat))
        })
    }

    pub fn file_size(&self, table: &HandleTable, handle: Handle) -> KernelResult<u64> {
        self.information_by_handle(table, handle).map(|info| info.size)
    }

    pub fn file_times(&self, table: &HandleTable, handle: Handle) -> KernelResult<FileTimes> {
        self.information_by_handle(table, handle).map(|info| info.times())
    }

    /// Set access and write times. `None` leaves that time unchanged.
    pub fn set_file_times(
        &self,
        table: &HandleTable,
        handle: Handle,
        last_access: Option<FileTime>,
        last_write: Option<FileTime>,
    ) -> KernelResult<()> {
        Self::with_file(table, handle, |file| {
            tracing::debug!(path = ?file.path(), ?last_access, ?last_write, "set file times");
            file.with_native(|native| {
                native.set_times(
                    last_access.map(FileTime::to_unix_secs),
                    last_write.map(FileTime::to_unix_secs),
                )
            })
        })
    }

    pub fn file_type(&self, table: &HandleTable, handle: Handle) -> KernelResult<FileType> {
        Self::with_file(table, handle, |file| Ok(file.file_type()))
    }

    pub fn set_file_type(
        &self,
        table: &HandleTable,
        handle: Handle,
        file_type: FileType,
    ) -> KernelResult<()> {
        Self::with_file(table, handle, |file| {
            file.set_file_type(file_type);
            Ok(())
        })
    }

    /// Second handle on the same file object.
    pub fn dup(&self, table: &mut HandleTable, handle: Handle) -> KernelResult<Handle> {
        drop(Self::borrow_file(table, handle)?);
        let duplicate = table.duplicate(handle)?;
        tracing::debug!(%handle, %duplicate, "dup");
        Ok(duplicate)
    }

    /// Make `target` refer to the file behind `source`, closing whatever
    /// `target` referred to before.
    pub fn dup2(&self, table: &mut HandleTable, source: Handle, target: Handle) -> KernelResult<Handle> {
        drop(Self::borrow_file(table, source)?);
        tracing::debug!(%source, %target, "dup2");
        table.remap_slot(source, target)
    }

    /// Wrap a duplicate of a descriptor the caller keeps ownership of.
    pub fn adopt_native(&self, table: &mut HandleTable, native: &dyn NativeFile) -> KernelResult<Handle> {
        let duplicate = native
            .try_clone()
            .map_err(|err| KernelError::from_native(&err))?;
        table.allocate(FileObject::new(duplicate, None, FileType::Disk))
    }

    /// Native path behind a handle, if it was opened by name.
    pub fn native_path(&self, table: &HandleTable, handle: Handle) -> KernelResult<Option<PathBuf>> {
        Self::with_file(table, handle, |file| Ok(file.path()))
    }

    /// Stat an emulated path.
    pub fn stat(&self, path: &str) -> KernelResult<FileInfo> {
        let full = self.paths.full_name(path, true)?;
        self.stat_native(&full.long_name).map(|stat| FileInfo::from(&stat))
    }

    pub fn attributes(&self, path: &str) -> KernelResult<FileAttributes> {
        self.stat(path).map(|info| info.attributes)
    }

    fn stat_native(&self, path: &Path) -> KernelResult<NativeStat> {
        self.native
            .stat(path)
            .map_err(|err| KernelError::from_native(&err))
    }

    /// Copy `source` to `dest`. The destination is read-only when the source
    /// is. Both handles are closed on every path out.
    pub fn copy(
        &self,
        table: &mut HandleTable,
        source: &str,
        dest: &str,
        fail_if_exists: bool,
    ) -> KernelResult<()> {
        tracing::debug!(source, dest, fail_if_exists, "copy");
        let from = self.open(table, source, &NativeOpenOptions::open(NativeAccess::Read))?;
        let result = self.copy_into(table, from, dest, fail_if_exists);
        close_quietly(table, from);
        result
    }

    fn copy_into(
        &self,
        table: &mut HandleTable,
        from: Handle,
        dest: &str,
        fail_if_exists: bool,
    ) -> KernelResult<()> {
        let info = self.information_by_handle(table, from)?;
        let mode = if info.attributes.contains(FileAttributes::READONLY) {
            0o444
        } else {
            0o666
        };
        let to = self.create(table, dest, mode, fail_if_exists)?;
        let result = self.stream(table, from, to);
        close_quietly(table, to);
        result
    }

    fn stream(&self, table: &HandleTable, from: Handle, to: Handle) -> KernelResult<()> {
        let mut buffer = [0u8; COPY_CHUNK_SIZE];
        loop {
            let count = self.read(table, from, &mut buffer)?;
            if count == 0 {
                return Ok(());
            }
            let mut pending = &buffer[..count];
            while !pending.is_empty() {
                let written = self.write(table, to, pending)?;
                if written == 0 {
                    return Err(KernelError::DiskFull);
                }
                pending = &pending[written..];
            }
        }
    }

    /// Rename. Moving across devices and replacing an existing destination
    /// are not handled; the native rename decides what happens.
    pub fn move_file(&self, source: &str, dest: &str) -> KernelResult<()> {
        tracing::debug!(source, dest, "move");
        let from = self.paths.full_name(source, true)?;
        let to = self.paths.full_name(dest, false)?;
        self.native
            .rename(&from.long_name, &to.long_name)
            .map_err(|err| KernelError::from_native(&err))
    }

    pub fn delete(&self, path: &str) -> KernelResult<()> {
        tracing::debug!(path, "delete");
        if let Some(device) = self.paths.device_name(path) {
            tracing::debug!(device = %device.name, "refusing to delete a device");
            return Err(KernelError::NotFound);
        }
        let full = self.paths.full_name(path, true)?;
        self.native
            .unlink(&full.long_name)
            .map_err(|err| KernelError::from_native(&err))
    }
}

fn close_native(mut native: Box<dyn NativeFile>) {
    native.close();
}

pub(super) fn close_quietly(table: &mut HandleTable, handle: Handle) {
    if let Err(err) = table.close(handle) {
        tracing::debug!(%handle, error = %err, "close failed");
    }
}
