use std::path::PathBuf;

use crate::error::KernelResult;

/// Result of resolving an emulated path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DosFullName {
    /// Native path.
    pub long_name: PathBuf,
    /// Emulated (drive-letter, 8.3) spelling of the same path.
    pub short_name: String,
}

/// A reserved device name (`NUL`, `CON`, `COM1`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAlias {
    pub name: String,
    /// Native path backing the device, `None` for devices that do not exist
    /// on this host.
    pub target: Option<PathBuf>,
}

/// Path normalization service.
pub trait PathResolverPort: Send + Sync {
    /// Map an emulated path onto the native file system. With `must_exist`
    /// the last component has to exist too.
    fn full_name(&self, raw: &str, must_exist: bool) -> KernelResult<DosFullName>;

    fn device_name(&self, raw: &str) -> Option<DeviceAlias>;

    /// Emulated temporary directory, without trailing separator.
    fn temp_path(&self) -> String;

    /// Look a bare file name up along the configured search path.
    fn search_path(&self, name: &str) -> Option<DosFullName>;

    /// Whether the drive of an emulated path is a fixed disk.
    fn is_fixed_disk(&self, dos_path: &str) -> bool;
}

#[cfg(test)]
mockall::mock! {
    pub PathResolver {}

    impl PathResolverPort for PathResolver {
        fn full_name(&self, raw: &str, must_exist: bool) -> KernelResult<DosFullName>;
        fn device_name(&self, raw: &str) -> Option<DeviceAlias>;
        fn temp_path(&self) -> String;
        fn search_path(&self, name: &str) -> Option<DosFullName>;
        fn is_fixed_disk(&self, dos_path: &str) -> bool;
    }
}
