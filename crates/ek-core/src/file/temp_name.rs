use serde::{Deserialize, Serialize};

use super::service::{close_quietly, FileSystem};
use crate::error::{KernelError, KernelResult};
use crate::handle::HandleTable;

/// Result of [`FileSystem::generate_temp_name`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempName {
    /// Emulated path, `<dir>\~<prefix><hex>.tmp`.
    pub path: String,
    /// Numeric part of the name.
    pub unique: u32,
}

impl FileSystem {
    /// Build a temporary file name in `dir` (the configured temp directory
    /// when `None`).
    ///
    /// With `unique == 0` candidates starting at the clock's low 16 bits are
    /// tried by exclusive creation until one is free; the winning file is
    /// created empty. The search skips 0, which callers read as failure.
    /// A non-zero `unique` is used as is and nothing is created.
    pub fn generate_temp_name(
        &self,
        table: &mut HandleTable,
        dir: Option<&str>,
        prefix: &str,
        unique: u32,
    ) -> KernelResult<TempName> {
        let mut base = dir.map_or_else(|| self.paths.temp_path(), str::to_string);
        if !base.ends_with('\\') {
            base.push('\\');
        }
        base.push('~');
        base.extend(prefix.chars().take(3));
        let candidate = |num: u32| format!("{base}{num:04x}.tmp");

        let start = if unique != 0 {
            unique & 0xffff
        } else {
            match (self.clock.now_secs() & 0xffff) as u32 {
                0 => 1,
                seed => seed,
            }
        };
        let mut num = start;
        let mut path = candidate(num);

        if unique == 0 {
            loop {
                match self.create(table, &path, 0o666, true) {
                    Ok(handle) => {
                        tracing::debug!(path = %path, "created temp file");
                        close_quietly(table, handle);
                        break;
                    }
                    Err(KernelError::Exists) => {
                        num = if num >= 0xffff { 1 } else { num + 1 };
                        if num == start {
                            tracing::debug!(base = %base, "temp name space exhausted");
                            return Err(KernelError::Exists);
                        }
                        path = candidate(num);
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        self.warn_if_unwritable(&path);
        Ok(TempName {
            path,
            unique: if unique != 0 { unique } else { num },
        })
    }

    fn warn_if_unwritable(&self, path: &str) {
        let Ok(full) = self.paths.full_name(path, false) else {
            return;
        };
        if let Some(dir) = full.long_name.parent() {
            if !self.native.is_dir_writable(dir) {
                tracing::warn!(
                    path,
                    dir = %dir.display(),
                    "temp file name points into a directory that does not seem writable; check the configuration"
                );
            }
        }
    }
}
