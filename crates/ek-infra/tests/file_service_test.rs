//! File service against the real file system.

use std::fs;
use std::sync::Arc;

use ek_core::config::KernelConfig;
use ek_core::error::KernelError;
use ek_core::file::{
    FileAttributes, FileSystem, FileType, OfStruct, OpenFileFlags, OpenFileOutcome, SeekOrigin,
};
use ek_core::handle::HandleTable;
use ek_core::ports::{ClockPort, NativeAccess, NativeOpenOptions};
use ek_infra::{DosPathResolver, StdNativeFs};
use tempfile::TempDir;

struct FixedClock(i64);

impl ClockPort for FixedClock {
    fn now_secs(&self) -> i64 {
        self.0
    }
}

struct Drive {
    root: TempDir,
    fs: FileSystem,
    table: HandleTable,
}

fn drive_c(now: i64) -> Drive {
    let root = TempDir::new().unwrap();
    fs::create_dir(root.path().join("TEMP")).unwrap();
    fs::create_dir_all(root.path().join("WINDOWS")).unwrap();
    fs::write(root.path().join("WINDOWS").join("WIN.INI"), b"[windows]\r\n").unwrap();

    let config = KernelConfig::with_system_defaults(root.path().to_path_buf());
    let fs = FileSystem::new(
        Arc::new(DosPathResolver::new(&config)),
        Arc::new(StdNativeFs::new()),
        Arc::new(FixedClock(now)),
        &config.files,
    );
    Drive {
        root,
        fs,
        table: HandleTable::default(),
    }
}

#[test]
fn test_write_seek_read_round_trip() {
    let mut d = drive_c(0);
    let handle = d.fs.create(&mut d.table, "C:\\DATA.BIN", 0o666, false).unwrap();

    assert_eq!(d.fs.write(&d.table, handle, b"emulated bytes").unwrap(), 14);
    assert_eq!(d.fs.seek(&d.table, handle, 9, SeekOrigin::Begin).unwrap(), 9);
    let mut buf = [0u8; 16];
    let count = d.fs.read(&d.table, handle, &mut buf).unwrap();

    assert_eq!(&buf[..count], b"bytes");
    assert_eq!(d.fs.file_size(&d.table, handle).unwrap(), 14);
    assert_eq!(d.fs.file_type(&d.table, handle).unwrap(), FileType::Disk);
    d.fs.close(&mut d.table, handle).unwrap();
    assert_eq!(fs::read(d.root.path().join("DATA.BIN")).unwrap(), b"emulated bytes");
}

#[test]
fn test_duplicates_share_position_and_survive_first_close() {
    let mut d = drive_c(0);
    let first = d.fs.create(&mut d.table, "C:\\SHARED.TXT", 0o666, false).unwrap();
    let second = d.fs.dup(&mut d.table, first).unwrap();

    d.fs.write(&d.table, first, b"abc").unwrap();
    assert_eq!(d.fs.seek(&d.table, second, 0, SeekOrigin::Current).unwrap(), 3);

    d.fs.close(&mut d.table, first).unwrap();
    d.fs.write(&d.table, second, b"def").unwrap();
    d.fs.close(&mut d.table, second).unwrap();

    assert_eq!(
        d.fs.read(&d.table, second, &mut [0u8; 1]),
        Err(KernelError::InvalidHandle)
    );
    assert_eq!(fs::read(d.root.path().join("SHARED.TXT")).unwrap(), b"abcdef");
}

#[test]
fn test_set_end_of_file_truncates() {
    let mut d = drive_c(0);
    let handle = d.fs.create(&mut d.table, "C:\\CUT.TXT", 0o666, false).unwrap();
    d.fs.write(&d.table, handle, b"0123456789").unwrap();
    d.fs.seek(&d.table, handle, -6, SeekOrigin::End).unwrap();

    d.fs.set_end_of_file(&d.table, handle).unwrap();

    assert_eq!(d.fs.file_size(&d.table, handle).unwrap(), 4);
    assert_eq!(
        d.fs.seek(&d.table, handle, -1, SeekOrigin::Begin),
        Err(KernelError::InvalidParameter)
    );
}

#[test]
fn test_exclusive_create_reports_exists() {
    let mut d = drive_c(0);

    assert_eq!(
        d.fs.create(&mut d.table, "C:\\WINDOWS\\WIN.INI", 0o666, true),
        Err(KernelError::Exists)
    );
    assert!(d.table.is_empty());
}

#[test]
fn test_create_truncates_existing_file() {
    let mut d = drive_c(0);
    let existing = d.root.path().join("WINDOWS").join("WIN.INI");

    let handle = d
        .fs
        .create(&mut d.table, r"C:\WINDOWS\WIN.INI", 0o666, false)
        .unwrap();

    assert_eq!(d.fs.file_size(&d.table, handle).unwrap(), 0);
    d.fs.close(&mut d.table, handle).unwrap();
    assert_eq!(fs::metadata(existing).unwrap().len(), 0);
}

#[test]
fn test_directories_cannot_be_opened() {
    let mut d = drive_c(0);

    assert_eq!(
        d.fs.open(&mut d.table, "C:\\WINDOWS", &NativeOpenOptions::open(NativeAccess::Read)),
        Err(KernelError::AccessDenied)
    );
    assert!(d.table.is_empty());
}

#[test]
fn test_null_device_opens_as_character_device() {
    let mut d = drive_c(0);

    let handle = d
        .fs
        .open(&mut d.table, "C:\\ANY\\NUL", &NativeOpenOptions::open(NativeAccess::Write))
        .unwrap();

    assert_eq!(d.fs.file_type(&d.table, handle).unwrap(), FileType::Char);
    assert_eq!(d.fs.write(&d.table, handle, b"discarded").unwrap(), 9);
    assert_eq!(
        d.fs.create(&mut d.table, "NUL", 0o666, false),
        Err(KernelError::AccessDenied)
    );
    assert_eq!(d.fs.delete("COM1"), Err(KernelError::NotFound));
}

#[test]
fn test_temp_name_searches_from_clock() {
    let mut d = drive_c(0x5000_00ff);
    fs::write(d.root.path().join("TEMP").join("~tst00ff.tmp"), b"").unwrap();

    let temp = d.fs.generate_temp_name(&mut d.table, None, "tst", 0).unwrap();

    assert_eq!(temp.path, "C:\\TEMP\\~tst0100.tmp");
    assert_eq!(temp.unique, 0x100);
    assert!(d.root.path().join("TEMP").join("~tst0100.tmp").exists());
    assert!(d.table.is_empty());
}

#[test]
fn test_successive_temp_names_are_distinct_files() {
    let mut d = drive_c(0x1234_0042);

    let first = d.fs.generate_temp_name(&mut d.table, None, "tst", 0).unwrap();
    let second = d.fs.generate_temp_name(&mut d.table, None, "tst", 0).unwrap();

    assert_ne!(first.path, second.path);
    assert_eq!(first.unique, 0x42);
    assert_eq!(second.unique, 0x43);
    let temp = d.root.path().join("TEMP");
    assert!(temp.join("~tst0042.tmp").exists());
    assert!(temp.join("~tst0043.tmp").exists());
}

#[test]
fn test_temp_name_skips_zero() {
    let mut d = drive_c(0x5_0000);

    let temp = d.fs.generate_temp_name(&mut d.table, None, "abc", 0).unwrap();

    assert_eq!(temp.unique, 1);
    assert_eq!(temp.path, "C:\\TEMP\\~abc0001.tmp");
    assert!(!d.root.path().join("TEMP").join("~abc0000.tmp").exists());
    assert!(d.root.path().join("TEMP").join("~abc0001.tmp").exists());
}

#[test]
fn test_copy_preserves_content_and_read_only_flag() {
    let mut d = drive_c(0);
    let source = d.root.path().join("SOURCE.DAT");
    let payload: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
    fs::write(&source, &payload).unwrap();
    let mut permissions = fs::metadata(&source).unwrap().permissions();
    permissions.set_readonly(true);
    fs::set_permissions(&source, permissions).unwrap();

    d.fs.copy(&mut d.table, "C:\\SOURCE.DAT", "C:\\COPY.DAT", true).unwrap();

    assert_eq!(fs::read(d.root.path().join("COPY.DAT")).unwrap(), payload);
    assert!(d
        .fs
        .attributes("C:\\COPY.DAT")
        .unwrap()
        .contains(FileAttributes::READONLY));
    assert_eq!(
        d.fs.copy(&mut d.table, "C:\\SOURCE.DAT", "C:\\COPY.DAT", true),
        Err(KernelError::Exists)
    );
    assert!(d.table.is_empty());
}

#[test]
fn test_move_and_delete() {
    let mut d = drive_c(0);
    fs::write(d.root.path().join("OLD.TXT"), b"x").unwrap();

    d.fs.move_file("C:\\old.txt", "C:\\NEW.TXT").unwrap();
    assert!(!d.root.path().join("OLD.TXT").exists());
    assert!(d.root.path().join("NEW.TXT").exists());

    d.fs.delete("C:\\NEW.TXT").unwrap();
    assert_eq!(d.fs.delete("C:\\NEW.TXT"), Err(KernelError::NotFound));
    assert_eq!(d.fs.stat("C:\\NEW.TXT"), Err(KernelError::NotFound));
}

#[test]
fn test_open_file_searches_and_verifies() {
    let mut d = drive_c(0);
    let mut ofs = OfStruct::default();

    let outcome = d
        .fs
        .open_file(&mut d.table, "WIN.INI", &mut ofs, OpenFileFlags::empty())
        .unwrap();
    let OpenFileOutcome::Opened(handle) = outcome else {
        panic!("expected an open handle, got {outcome:?}");
    };
    assert_eq!(ofs.path_name, "C:\\WINDOWS\\WIN.INI");
    d.fs.close(&mut d.table, handle).unwrap();

    let reopened = d
        .fs
        .open_file(
            &mut d.table,
            "",
            &mut ofs,
            OpenFileFlags::REOPEN | OpenFileFlags::VERIFY | OpenFileFlags::EXIST,
        )
        .unwrap();
    assert!(matches!(reopened, OpenFileOutcome::Exists(_)));

    let mut missing = OfStruct::default();
    assert_eq!(
        d.fs
            .open_file(&mut d.table, "NOPE.INI", &mut missing, OpenFileFlags::empty()),
        Err(KernelError::NotFound)
    );
    assert_eq!(missing.error_code, KernelError::NotFound.code());
    assert!(d.table.is_empty());
}
