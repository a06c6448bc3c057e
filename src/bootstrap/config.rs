//! # Configuration bootstrap
//!
//! Loads [`KernelConfig`] through `ek-infra` and fills in the one value a
//! session cannot start without: the native root of drive `C:`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use ek_core::config::KernelConfig;

const SYSTEM_DRIVE: &str = "C";

/// `<home>/.emukrnl/drive_c`.
pub fn default_drive_c() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".emukrnl").join("drive_c"))
}

/// Load configuration from `config_path` (or the default location) and
/// environment overrides. `drive_c` replaces the configured `C:` root.
///
/// # Errors
///
/// Fails when the configuration cannot be loaded, or when no `C:` root is
/// configured and no home directory is known.
pub fn load_config(
    config_path: Option<&Path>,
    drive_c: Option<PathBuf>,
) -> anyhow::Result<KernelConfig> {
    let mut config = ek_infra::config::load_config(config_path)
        .with_context(|| match config_path {
            Some(path) => format!("Failed to load config file: {}", path.display()),
            None => "Failed to load configuration".to_string(),
        })?;

    if let Some(root) = drive_c {
        config.drives.insert(SYSTEM_DRIVE.to_string(), root);
    }
    if !config.drives.contains_key(SYSTEM_DRIVE) {
        let root = default_drive_c().context("No C: drive configured and no home directory")?;
        tracing::info!(root = %root.display(), "using default C: drive");
        config.drives.insert(SYSTEM_DRIVE.to_string(), root);
    }
    Ok(config)
}
