//! Configuration data transfer objects.
//!
//! Pure data: loading, layering and environment overrides live in
//! `ek-infra::config`. Missing keys take the defaults below.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::handle::DEFAULT_HANDLE_COUNT;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub files: FilesConfig,
    pub paths: PathsConfig,
    /// Drive letter (`"C"`) to native root directory.
    pub drives: BTreeMap<String, PathBuf>,
}

impl KernelConfig {
    /// Defaults with drive `C:` rooted at `drive_c`.
    pub fn with_system_defaults(drive_c: PathBuf) -> Self {
        let mut config = Self::default();
        config.drives.insert("C".to_string(), drive_c);
        config
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Do not fall back to read-only when a read-write open fails.
    pub fail_read_only: bool,
    pub max_handles: usize,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            fail_read_only: false,
            max_handles: DEFAULT_HANDLE_COUNT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Emulated temporary directory.
    pub temp_dir: String,
    /// Emulated directories searched by `OpenFile` after the current one.
    pub search_path: Vec<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            temp_dir: "C:\\TEMP".to_string(),
            search_path: vec!["C:\\WINDOWS".to_string(), "C:\\WINDOWS\\SYSTEM".to_string()],
        }
    }
}
