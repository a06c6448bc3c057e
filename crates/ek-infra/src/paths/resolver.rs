//! Drive-letter path resolver.
//!
//! Each configured drive letter is rooted at a native directory. Path
//! components are matched case-insensitively against the directory
//! entries, either by their real name or by their 8.3 short name.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ek_core::config::KernelConfig;
use ek_core::error::{KernelError, KernelResult};
use ek_core::ports::{DeviceAlias, DosFullName, PathResolverPort};

use super::short_name::short_name;

/// Reserved device names and the native file backing them, if any.
const DEVICES: [(&str, Option<&str>); 12] = [
    ("NUL", Some("/dev/null")),
    ("CON", Some("/dev/tty")),
    ("AUX", None),
    ("PRN", None),
    ("COM1", None),
    ("COM2", None),
    ("COM3", None),
    ("COM4", None),
    ("LPT1", None),
    ("LPT2", None),
    ("LPT3", None),
    ("CLOCK$", None),
];

/// First drive letter treated as a fixed disk; `A:` and `B:` are floppies.
const FIRST_FIXED_DRIVE: char = 'C';

#[derive(Debug, Clone)]
pub struct DosPathResolver {
    drives: BTreeMap<char, PathBuf>,
    current_drive: char,
    /// Components of the current directory on `current_drive`.
    current_dir: Vec<String>,
    temp_dir: String,
    search_path: Vec<String>,
}

/// Drive letter and normalized components of an emulated path.
struct DosPath {
    drive: char,
    components: Vec<String>,
}

impl DosPathResolver {
    pub fn new(config: &KernelConfig) -> Self {
        let drives = config
            .drives
            .iter()
            .filter_map(|(letter, root)| {
                let letter = letter.chars().next()?.to_ascii_uppercase();
                letter.is_ascii_alphabetic().then(|| (letter, root.clone()))
            })
            .collect();
        Self {
            drives,
            current_drive: FIRST_FIXED_DRIVE,
            current_dir: Vec::new(),
            temp_dir: config.paths.temp_dir.clone(),
            search_path: config.paths.search_path.clone(),
        }
    }

    /// Use `dir` (an absolute emulated directory) as the current directory.
    pub fn with_current_dir(mut self, dir: &str) -> KernelResult<Self> {
        let parsed = self.parse(dir)?;
        self.current_drive = parsed.drive;
        self.current_dir = parsed.components;
        Ok(self)
    }

    pub fn drive_root(&self, drive: char) -> Option<&Path> {
        self.drives
            .get(&drive.to_ascii_uppercase())
            .map(PathBuf::as_path)
    }

    fn parse(&self, raw: &str) -> KernelResult<DosPath> {
        if raw.is_empty() {
            return Err(KernelError::NotFound);
        }
        let raw = raw.replace('/', "\\");
        let (drive, rest) = match raw.as_bytes() {
            [letter, b':', ..] if letter.is_ascii_alphabetic() => {
                (char::from(*letter).to_ascii_uppercase(), &raw[2..])
            }
            _ => (self.current_drive, raw.as_str()),
        };

        let mut components = if rest.starts_with('\\') || drive != self.current_drive {
            Vec::new()
        } else {
            self.current_dir.clone()
        };
        for part in rest.split('\\') {
            match part {
                "" | "." => {}
                ".." => {
                    components.pop();
                }
                name if name.contains(['*', '?', '<', '>', '|', '"']) => {
                    return Err(KernelError::InvalidParameter);
                }
                name => components.push(name.to_string()),
            }
        }
        Ok(DosPath { drive, components })
    }

    /// Entry of `dir` matching `name` by real or short name, ignoring case.
    fn find_entry(dir: &Path, name: &str) -> Option<String> {
        let entries: Vec<String> = fs::read_dir(dir)
            .ok()?
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        if entries.iter().any(|entry| entry == name) {
            return Some(name.to_string());
        }
        let upper = name.to_ascii_uppercase();
        entries
            .into_iter()
            .find(|entry| entry.eq_ignore_ascii_case(name) || short_name(entry) == upper)
    }

    fn drive_of(&self, dos_path: &str) -> char {
        match dos_path.as_bytes() {
            [letter, b':', ..] if letter.is_ascii_alphabetic() => {
                char::from(*letter).to_ascii_uppercase()
            }
            _ => self.current_drive,
        }
    }
}

impl PathResolverPort for DosPathResolver {
    fn full_name(&self, raw: &str, must_exist: bool) -> KernelResult<DosFullName> {
        let parsed = self.parse(raw)?;
        let Some(root) = self.drives.get(&parsed.drive) else {
            tracing::debug!(raw, drive = %parsed.drive, "no such drive");
            return Err(KernelError::NotFound);
        };

        let mut long_name = root.clone();
        let mut short_name_buf = format!("{}:", parsed.drive);
        let count = parsed.components.len();
        for (position, component) in parsed.components.iter().enumerate() {
            let last = position + 1 == count;
            let actual = match Self::find_entry(&long_name, component) {
                Some(actual) => actual,
                None if last && !must_exist => component.clone(),
                None => {
                    tracing::trace!(raw, missing = %component, "path component not found");
                    return Err(KernelError::NotFound);
                }
            };
            short_name_buf.push('\\');
            short_name_buf.push_str(&short_name(&actual));
            long_name.push(actual);
        }
        if count == 0 {
            short_name_buf.push('\\');
        }

        tracing::trace!(raw, long = %long_name.display(), short = %short_name_buf, "resolved");
        Ok(DosFullName {
            long_name,
            short_name: short_name_buf,
        })
    }

    fn device_name(&self, raw: &str) -> Option<DeviceAlias> {
        let trimmed = raw.trim_end_matches(':');
        let last = trimmed.rsplit(['\\', '/']).next().unwrap_or(trimmed);
        let last = match last.as_bytes() {
            [letter, b':', ..] if letter.is_ascii_alphabetic() => &last[2..],
            _ => last,
        };
        let base = last.split('.').next().unwrap_or(last).trim_end();

        DEVICES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(base))
            .map(|(name, target)| DeviceAlias {
                name: (*name).to_string(),
                target: target.map(PathBuf::from),
            })
    }

    fn temp_path(&self) -> String {
        self.temp_dir.trim_end_matches('\\').to_string()
    }

    fn search_path(&self, name: &str) -> Option<DosFullName> {
        if name.contains(['\\', '/', ':']) {
            return self.full_name(name, true).ok();
        }
        let current = format!("{}:\\{}", self.current_drive, self.current_dir.join("\\"));
        std::iter::once(current.as_str())
            .chain(self.search_path.iter().map(String::as_str))
            .find_map(|dir| {
                let candidate = format!("{}\\{}", dir.trim_end_matches('\\'), name);
                self.full_name(&candidate, true).ok()
            })
    }

    fn is_fixed_disk(&self, dos_path: &str) -> bool {
        let drive = self.drive_of(dos_path);
        drive >= FIRST_FIXED_DRIVE && self.drives.contains_key(&drive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn drive_c() -> (TempDir, DosPathResolver) {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("Windows").join("System")).unwrap();
        fs::write(root.path().join("Windows").join("win.ini"), b"[windows]\n").unwrap();
        fs::write(root.path().join("ReadMe.txt"), b"hi").unwrap();
        fs::write(root.path().join("LongFileName.html"), b"<p>").unwrap();
        let config = KernelConfig::with_system_defaults(root.path().to_path_buf());
        let resolver = DosPathResolver::new(&config);
        (root, resolver)
    }

    #[test]
    fn test_full_name_matches_case_insensitively() {
        let (root, resolver) = drive_c();

        let full = resolver.full_name("C:\\README.TXT", true).unwrap();

        assert_eq!(full.long_name, root.path().join("ReadMe.txt"));
        assert_eq!(full.short_name, "C:\\README.TXT");
    }

    #[test]
    fn test_full_name_normalizes_dots_and_slashes() {
        let (root, resolver) = drive_c();

        let full = resolver
            .full_name("c:/windows/system/../WIN.INI", true)
            .unwrap();

        assert_eq!(full.long_name, root.path().join("Windows").join("win.ini"));
        assert_eq!(full.short_name, "C:\\WINDOWS\\WIN.INI");
    }

    #[test]
    fn test_short_names_resolve_to_long_entries() {
        let (root, resolver) = drive_c();
        let short = short_name("LongFileName.html");

        let full = resolver.full_name(&format!("C:\\{short}"), true).unwrap();

        assert_eq!(full.long_name, root.path().join("LongFileName.html"));
        assert_eq!(full.short_name, format!("C:\\{short}"));
    }

    #[test]
    fn test_missing_components() {
        let (root, resolver) = drive_c();

        assert_eq!(
            resolver.full_name("C:\\NEW.TXT", true),
            Err(KernelError::NotFound)
        );
        assert_eq!(
            resolver.full_name("C:\\NOWHERE\\NEW.TXT", false),
            Err(KernelError::NotFound)
        );
        let created = resolver.full_name("C:\\New.txt", false).unwrap();
        assert_eq!(created.long_name, root.path().join("New.txt"));
        assert_eq!(created.short_name, "C:\\NEW.TXT");
    }

    #[test]
    fn test_unknown_drive_and_wildcards() {
        let (_root, resolver) = drive_c();

        assert_eq!(resolver.full_name("Q:\\X", false), Err(KernelError::NotFound));
        assert_eq!(
            resolver.full_name("C:\\*.TXT", false),
            Err(KernelError::InvalidParameter)
        );
        assert_eq!(resolver.full_name("", false), Err(KernelError::NotFound));
    }

    #[test]
    fn test_relative_names_use_current_dir() {
        let (root, resolver) = drive_c();
        let resolver = resolver.with_current_dir("C:\\WINDOWS").unwrap();

        let full = resolver.full_name("win.ini", true).unwrap();

        assert_eq!(full.long_name, root.path().join("Windows").join("win.ini"));
        assert_eq!(
            resolver.full_name("\\readme.txt", true).unwrap().short_name,
            "C:\\README.TXT"
        );
    }

    #[test]
    fn test_device_names() {
        let (_root, resolver) = drive_c();

        let nul = resolver.device_name("C:\\TEMP\\nul.txt").unwrap();
        assert_eq!(nul.name, "NUL");
        assert_eq!(nul.target, Some(PathBuf::from("/dev/null")));

        let com = resolver.device_name("COM1:").unwrap();
        assert_eq!(com.name, "COM1");
        assert_eq!(com.target, None);

        assert!(resolver.device_name("C:\\NULL.TXT").is_none());
        assert!(resolver.device_name("C:\\CONFIG.SYS").is_none());
    }

    #[test]
    fn test_search_path_walks_configured_dirs() {
        let (root, resolver) = drive_c();

        let found = resolver.search_path("WIN.INI").unwrap();
        assert_eq!(found.long_name, root.path().join("Windows").join("win.ini"));

        let here = resolver.search_path("readme.txt").unwrap();
        assert_eq!(here.short_name, "C:\\README.TXT");

        assert!(resolver.search_path("MISSING.DLL").is_none());
    }

    #[test]
    fn test_temp_path_and_fixed_disks() {
        let (_root, resolver) = drive_c();

        assert_eq!(resolver.temp_path(), "C:\\TEMP");
        assert!(resolver.is_fixed_disk("C:\\WINDOWS"));
        assert!(resolver.is_fixed_disk("relative.txt"));
        assert!(!resolver.is_fixed_disk("A:\\DISK1"));
        assert!(!resolver.is_fixed_disk("D:\\NOT\\MAPPED"));
    }
}
