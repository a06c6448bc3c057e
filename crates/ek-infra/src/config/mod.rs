//! # Configuration loader
//!
//! Reads the TOML configuration file (when there is one) and layers
//! `EMUKRNL__*` environment variables over it, e.g.
//! `EMUKRNL__FILES__FAIL_READ_ONLY=true` or `EMUKRNL__DRIVES__D=/mnt/cdrom`.
//!
//! Pure data loading: missing keys take the DTO's serde defaults and no
//! value is validated here.

use std::path::{Path, PathBuf};

use anyhow::Context;
use ::config::{Config, Environment, File, FileFormat, Map};
use ek_core::config::KernelConfig;

pub const ENV_PREFIX: &str = "EMUKRNL";
const ENV_SEPARATOR: &str = "__";
const CONFIG_FILE_NAME: &str = "config.toml";

/// `<platform config dir>/emukrnl/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("emukrnl").join(CONFIG_FILE_NAME))
}

/// Load configuration from `path`, or from [`default_config_path`] when it
/// exists, with process environment overrides.
///
/// # Errors
///
/// Fails when an explicitly given file cannot be read, or when any source
/// does not map onto [`KernelConfig`].
pub fn load_config(path: Option<&Path>) -> anyhow::Result<KernelConfig> {
    load_config_with_env(path, None)
}

/// [`load_config`] with the environment taken from `env` instead of the
/// process when given.
pub fn load_config_with_env(
    path: Option<&Path>,
    env: Option<Map<String, String>>,
) -> anyhow::Result<KernelConfig> {
    let mut builder = Config::builder();
    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        None => {
            if let Some(default) = default_config_path() {
                tracing::debug!(path = %default.display(), "looking for default config file");
                builder = builder
                    .add_source(File::from(default).format(FileFormat::Toml).required(false));
            }
        }
    }
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(env),
    );

    let mut config: KernelConfig = builder
        .build()
        .context("Failed to read configuration sources")?
        .try_deserialize()
        .context("Failed to map configuration onto KernelConfig")?;

    // Keys may arrive lower-cased from the environment.
    config.drives = std::mem::take(&mut config.drives)
        .into_iter()
        .map(|(letter, root)| (letter.to_ascii_uppercase(), root))
        .collect();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn no_env() -> Option<Map<String, String>> {
        Some(Map::new())
    }

    #[test]
    fn test_load_config_reads_file() {
        let file = write_toml(
            r#"
            [files]
            fail_read_only = true
            max_handles = 40

            [paths]
            temp_dir = "D:\\SCRATCH"
            search_path = ["C:\\DOS"]

            [drives]
            C = "/srv/drive_c"
            "#,
        );

        let config = load_config_with_env(Some(file.path()), no_env()).unwrap();

        assert!(config.files.fail_read_only);
        assert_eq!(config.files.max_handles, 40);
        assert_eq!(config.paths.temp_dir, "D:\\SCRATCH");
        assert_eq!(config.paths.search_path, vec!["C:\\DOS".to_string()]);
        assert_eq!(config.drives.get("C"), Some(&PathBuf::from("/srv/drive_c")));
    }

    #[test]
    fn test_missing_sections_take_defaults() {
        let file = write_toml("[files]\nmax_handles = 30\n");

        let config = load_config_with_env(Some(file.path()), no_env()).unwrap();

        assert_eq!(config.files.max_handles, 30);
        assert!(!config.files.fail_read_only);
        assert_eq!(config.paths, KernelConfig::default().paths);
        assert!(config.drives.is_empty());
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_toml("[files]\nfail_read_only = false\n");
        let env = Map::from([
            ("EMUKRNL__FILES__FAIL_READ_ONLY".to_string(), "true".to_string()),
            ("EMUKRNL__DRIVES__D".to_string(), "/mnt/cdrom".to_string()),
            ("UNRELATED".to_string(), "1".to_string()),
        ]);

        let config = load_config_with_env(Some(file.path()), Some(env)).unwrap();

        assert!(config.files.fail_read_only);
        assert_eq!(config.drives.get("D"), Some(&PathBuf::from("/mnt/cdrom")));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("absent.toml");

        assert!(load_config_with_env(Some(&missing), no_env()).is_err());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let file = write_toml("[files\nmax_handles = ");

        assert!(load_config_with_env(Some(file.path()), no_env()).is_err());
    }

    #[test]
    fn test_default_path_ends_with_file_name() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("emukrnl/config.toml"));
        }
    }
}
