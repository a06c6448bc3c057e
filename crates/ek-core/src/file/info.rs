use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::time::FileTime;
use crate::ports::NativeStat;

bitflags! {
    /// `FILE_ATTRIBUTE_*`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FileAttributes: u32 {
        const READONLY = 0x01;
        const HIDDEN = 0x02;
        const SYSTEM = 0x04;
        const DIRECTORY = 0x10;
        const ARCHIVE = 0x20;
        const NORMAL = 0x80;
    }
}

/// `BY_HANDLE_FILE_INFORMATION` built from a native stat.
///
/// The native side keeps no creation time, so `creation` mirrors
/// `last_write`. The file index is the inode number split in two words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub attributes: FileAttributes,
    pub creation: FileTime,
    pub last_access: FileTime,
    pub last_write: FileTime,
    pub volume_serial: u32,
    pub size: u64,
    pub links: u64,
    pub index_high: u32,
    pub index_low: u32,
}

impl FileInfo {
    pub fn size_high(&self) -> u32 {
        (self.size >> 32) as u32
    }

    pub fn size_low(&self) -> u32 {
        self.size as u32
    }

    pub fn times(&self) -> FileTimes {
        FileTimes {
            creation: self.creation,
            last_access: self.last_access,
            last_write: self.last_write,
        }
    }
}

impl From<&NativeStat> for FileInfo {
    fn from(stat: &NativeStat) -> Self {
        let mut attributes = FileAttributes::ARCHIVE;
        if stat.is_dir() {
            attributes |= FileAttributes::DIRECTORY;
        }
        if stat.readonly {
            attributes |= FileAttributes::READONLY;
        }
        let written = FileTime::from_unix_secs(stat.mtime);

        Self {
            attributes,
            creation: written,
            last_access: FileTime::from_unix_secs(stat.atime),
            last_write: written,
            volume_serial: 0,
            size: if stat.is_dir() { 0 } else { stat.size },
            links: stat.nlink,
            index_high: (stat.ino >> 32) as u32,
            index_low: stat.ino as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTimes {
    pub creation: FileTime,
    pub last_access: FileTime,
    pub last_write: FileTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::NativeFileType;

    fn stat(file_type: NativeFileType, readonly: bool) -> NativeStat {
        NativeStat {
            file_type,
            readonly,
            size: 4096,
            nlink: 2,
            ino: 0x1_0000_0002,
            mtime: 1_000,
            atime: 2_000,
        }
    }

    #[test]
    fn test_directory_has_zero_size() {
        let info = FileInfo::from(&stat(NativeFileType::Directory, false));
        assert_eq!(info.attributes, FileAttributes::ARCHIVE | FileAttributes::DIRECTORY);
        assert_eq!(info.size, 0);
        assert_eq!(info.index_high, 1);
        assert_eq!(info.index_low, 2);
    }

    #[test]
    fn test_creation_mirrors_last_write() {
        let info = FileInfo::from(&stat(NativeFileType::Regular, true));
        assert!(info.attributes.contains(FileAttributes::READONLY));
        assert_eq!(info.creation, info.last_write);
        assert!(info.last_access > info.last_write);
        assert_eq!(info.size_low(), 4096);
        assert_eq!(info.size_high(), 0);
    }
}
