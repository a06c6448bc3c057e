use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::*;
use crate::config::FilesConfig;
use crate::error::KernelError;
use crate::handle::{HandleTable, ObjectKind};
use crate::ports::{
    DeviceAlias, DosFullName, MockClock, MockNativeDescriptor, MockNativeFs, MockPathResolver,
    NativeAccess, NativeFileType, NativeOpenOptions, NativeStat,
};

fn full(raw: &str) -> DosFullName {
    DosFullName {
        long_name: PathBuf::from(format!("/native/{}", raw.replace(':', "").replace('\\', "/"))),
        short_name: raw.to_uppercase(),
    }
}

fn stat(file_type: NativeFileType) -> NativeStat {
    NativeStat {
        file_type,
        readonly: false,
        size: 0,
        nlink: 1,
        ino: 42,
        mtime: 1_700_000_000,
        atime: 1_700_000_000,
    }
}

fn resolver() -> MockPathResolver {
    let mut paths = MockPathResolver::new();
    paths.expect_device_name().returning(|_| None);
    paths.expect_full_name().returning(|raw, _| Ok(full(raw)));
    paths.expect_temp_path().returning(|| "C:\\TEMP".to_string());
    paths
}

/// Descriptor of the given type whose closes are counted.
fn descriptor(file_type: NativeFileType, closes: &Arc<AtomicUsize>) -> MockNativeDescriptor {
    let mut native = MockNativeDescriptor::new();
    native.expect_metadata().returning(move || Ok(stat(file_type)));
    let closes = Arc::clone(closes);
    native.expect_close().returning(move || {
        closes.fetch_add(1, Ordering::SeqCst);
    });
    native
}

fn service(paths: MockPathResolver, native: MockNativeFs, fail_read_only: bool) -> FileSystem {
    service_at(paths, native, fail_read_only, 0x1234_0010)
}

fn service_at(
    paths: MockPathResolver,
    native: MockNativeFs,
    fail_read_only: bool,
    now: i64,
) -> FileSystem {
    let mut clock = MockClock::new();
    clock.expect_now_secs().return_const(now);
    FileSystem::new(
        Arc::new(paths),
        Arc::new(native),
        Arc::new(clock),
        &FilesConfig {
            fail_read_only,
            ..FilesConfig::default()
        },
    )
}

#[test]
fn test_read_write_open_falls_back_to_read_only() {
    let closes = Arc::new(AtomicUsize::new(0));
    let mut native = MockNativeFs::new();
    native
        .expect_open()
        .withf(|_, options| options.access == NativeAccess::ReadWrite)
        .times(1)
        .returning(|_, _| Err(io::Error::from(io::ErrorKind::PermissionDenied)));
    let fallback = Arc::clone(&closes);
    native
        .expect_open()
        .withf(|_, options| options.access == NativeAccess::Read)
        .times(1)
        .returning(move |_, _| Ok(Box::new(descriptor(NativeFileType::Regular, &fallback))));
    let fs = service(resolver(), native, false);
    let mut table = HandleTable::default();

    let handle = fs
        .open(&mut table, "C:\\DATA.TXT", &NativeOpenOptions::open(NativeAccess::ReadWrite))
        .unwrap();

    assert!(table.lookup(handle, Some(ObjectKind::File)).is_ok());
    assert_eq!(
        fs.native_path(&table, handle).unwrap(),
        Some(PathBuf::from("/native/C/DATA.TXT"))
    );
    table.close(handle).unwrap();
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_fail_read_only_disables_fallback() {
    let mut native = MockNativeFs::new();
    native
        .expect_open()
        .times(1)
        .returning(|_, _| Err(io::Error::from(io::ErrorKind::PermissionDenied)));
    let fs = service(resolver(), native, true);
    let mut table = HandleTable::default();

    let result = fs.open(&mut table, "C:\\DATA.TXT", &NativeOpenOptions::open(NativeAccess::ReadWrite));

    assert_eq!(result, Err(KernelError::AccessDenied));
    assert!(table.is_empty());
}

#[test]
fn test_open_rejects_directory_and_closes_it() {
    let closes = Arc::new(AtomicUsize::new(0));
    let opened = Arc::clone(&closes);
    let mut native = MockNativeFs::new();
    native
        .expect_open()
        .returning(move |_, _| Ok(Box::new(descriptor(NativeFileType::Directory, &opened))));
    let fs = service(resolver(), native, false);
    let mut table = HandleTable::default();

    let result = fs.open(&mut table, "C:\\WINDOWS", &NativeOpenOptions::open(NativeAccess::Read));

    assert_eq!(result, Err(KernelError::AccessDenied));
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(table.is_empty());
}

#[test]
fn test_device_names() {
    let mut paths = MockPathResolver::new();
    paths.expect_device_name().returning(|raw| {
        Some(DeviceAlias {
            name: raw.to_uppercase(),
            target: None,
        })
    });
    let mut native = MockNativeFs::new();
    native.expect_open().never();
    native.expect_unlink().never();
    let fs = service(paths, native, false);
    let mut table = HandleTable::default();

    assert_eq!(
        fs.open(&mut table, "COM1", &NativeOpenOptions::open(NativeAccess::Read)),
        Err(KernelError::NotFound)
    );
    assert_eq!(
        fs.create(&mut table, "COM1", 0o666, false),
        Err(KernelError::AccessDenied)
    );
    assert_eq!(fs.delete("COM1"), Err(KernelError::NotFound));
}

#[test]
fn test_seek_before_start_is_invalid_parameter() {
    let closes = Arc::new(AtomicUsize::new(0));
    let mut native = descriptor(NativeFileType::Regular, &closes);
    native.expect_seek().never();
    let fs = service(resolver(), MockNativeFs::new(), false);
    let mut table = HandleTable::default();
    let handle = table
        .allocate(FileObject::new(Box::new(native), None, FileType::Disk))
        .unwrap();

    assert_eq!(
        fs.seek(&table, handle, -1, SeekOrigin::Begin),
        Err(KernelError::InvalidParameter)
    );
}

#[test]
fn test_dup_keeps_descriptor_until_last_close() {
    let closes = Arc::new(AtomicUsize::new(0));
    let fs = service(resolver(), MockNativeFs::new(), false);
    let mut table = HandleTable::default();
    let handle = table
        .allocate(FileObject::new(
            Box::new(descriptor(NativeFileType::Regular, &closes)),
            None,
            FileType::Disk,
        ))
        .unwrap();

    let duplicate = fs.dup(&mut table, handle).unwrap();
    assert_ne!(duplicate, handle);
    fs.set_file_type(&table, handle, FileType::Pipe).unwrap();
    assert_eq!(fs.file_type(&table, duplicate), Ok(FileType::Pipe));

    fs.close(&mut table, handle).unwrap();
    assert_eq!(closes.load(Ordering::SeqCst), 0);
    fs.close(&mut table, duplicate).unwrap();
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(fs.file_type(&table, duplicate), Err(KernelError::InvalidHandle));
}

#[test]
fn test_temp_name_skips_existing_files() {
    let closes = Arc::new(AtomicUsize::new(0));
    let created = Arc::clone(&closes);
    let attempts = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&attempts);
    let mut native = MockNativeFs::new();
    native
        .expect_open()
        .withf(|_, options| options.exclusive && options.create)
        .returning(move |path, _| {
            let mut seen = seen.lock().unwrap();
            seen.push(path.to_path_buf());
            if seen.len() == 1 {
                Err(io::Error::from(io::ErrorKind::AlreadyExists))
            } else {
                Ok(Box::new(descriptor(NativeFileType::Regular, &created)))
            }
        });
    native.expect_is_dir_writable().return_const(true);
    let fs = service(resolver(), native, false);
    let mut table = HandleTable::default();

    let name = fs
        .generate_temp_name(&mut table, None, "abcdef", 0)
        .unwrap();

    assert_eq!(name.path, "C:\\TEMP\\~abc0011.tmp");
    assert_eq!(name.unique, 0x11);
    assert_eq!(
        *attempts.lock().unwrap(),
        vec![
            PathBuf::from("/native/C/TEMP/~abc0010.tmp"),
            PathBuf::from("/native/C/TEMP/~abc0011.tmp"),
        ]
    );
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(table.is_empty());
}

/// Native fs that creates each path once and refuses it afterwards.
fn exclusive_fs(created: &Arc<Mutex<Vec<PathBuf>>>) -> MockNativeFs {
    let closes = Arc::new(AtomicUsize::new(0));
    let created = Arc::clone(created);
    let mut native = MockNativeFs::new();
    native.expect_open().returning(move |path, options| {
        assert!(options.exclusive && options.create);
        let mut created = created.lock().unwrap();
        if created.iter().any(|existing| existing == path) {
            return Err(io::Error::from(io::ErrorKind::AlreadyExists));
        }
        created.push(path.to_path_buf());
        Ok(Box::new(descriptor(NativeFileType::Regular, &closes)))
    });
    native.expect_is_dir_writable().return_const(true);
    native
}

#[test]
fn test_temp_name_never_uses_zero() {
    let created = Arc::new(Mutex::new(Vec::new()));
    let fs = service_at(resolver(), exclusive_fs(&created), false, 0x5_0000);
    let mut table = HandleTable::default();

    let name = fs.generate_temp_name(&mut table, None, "abc", 0).unwrap();

    assert_eq!(name.path, r"C:\TEMP\~abc0001.tmp");
    assert_eq!(name.unique, 1);
    assert_eq!(
        *created.lock().unwrap(),
        vec![PathBuf::from("/native/C/TEMP/~abc0001.tmp")]
    );
}

#[test]
fn test_temp_name_wraps_from_ffff_to_one() {
    let created = Arc::new(Mutex::new(vec![PathBuf::from(
        "/native/C/TEMP/~abcffff.tmp",
    )]));
    let fs = service_at(resolver(), exclusive_fs(&created), false, 0xffff);
    let mut table = HandleTable::default();

    let name = fs.generate_temp_name(&mut table, None, "abc", 0).unwrap();

    assert_eq!(name.path, r"C:\TEMP\~abc0001.tmp");
    assert_eq!(name.unique, 1);
}

#[test]
fn test_successive_temp_names_differ() {
    let created = Arc::new(Mutex::new(Vec::new()));
    let fs = service(resolver(), exclusive_fs(&created), false);
    let mut table = HandleTable::default();

    let first = fs.generate_temp_name(&mut table, None, "abc", 0).unwrap();
    let second = fs.generate_temp_name(&mut table, None, "abc", 0).unwrap();

    assert_ne!(first.path, second.path);
    assert_eq!(first.unique, 0x10);
    assert_eq!(second.unique, 0x11);
    assert_eq!(created.lock().unwrap().len(), 2);
    assert!(table.is_empty());
}

#[test]
fn test_temp_name_with_seed_creates_nothing() {
    let mut native = MockNativeFs::new();
    native.expect_open().never();
    native.expect_is_dir_writable().return_const(false);
    let fs = service(resolver(), native, false);
    let mut table = HandleTable::default();

    let name = fs
        .generate_temp_name(&mut table, Some("D:\\WORK\\"), "x", 0x1_2345)
        .unwrap();

    assert_eq!(name.path, "D:\\WORK\\~x2345.tmp");
    assert_eq!(name.unique, 0x1_2345);
}

#[test]
fn test_temp_name_gives_up_on_other_errors() {
    let mut native = MockNativeFs::new();
    native
        .expect_open()
        .times(1)
        .returning(|_, _| Err(io::Error::from(io::ErrorKind::PermissionDenied)));
    let fs = service(resolver(), native, false);
    let mut table = HandleTable::default();

    assert_eq!(
        fs.generate_temp_name(&mut table, None, "abc", 0),
        Err(KernelError::AccessDenied)
    );
}

#[test]
fn test_copy_closes_source_when_destination_exists() {
    let closes = Arc::new(AtomicUsize::new(0));
    let opened = Arc::clone(&closes);
    let mut native = MockNativeFs::new();
    native
        .expect_open()
        .withf(|_, options| !options.create)
        .returning(move |_, _| Ok(Box::new(descriptor(NativeFileType::Regular, &opened))));
    native
        .expect_open()
        .withf(|_, options| options.create && options.exclusive)
        .returning(|_, _| Err(io::Error::from(io::ErrorKind::AlreadyExists)));
    let fs = service(resolver(), native, false);
    let mut table = HandleTable::default();

    assert_eq!(
        fs.copy(&mut table, "C:\\A.TXT", "C:\\B.TXT", true),
        Err(KernelError::Exists)
    );
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(table.is_empty());
}

#[test]
fn test_copy_retries_partial_writes() {
    let closes = Arc::new(AtomicUsize::new(0));
    let written = Arc::new(Mutex::new(Vec::new()));

    let source_closes = Arc::clone(&closes);
    let dest_closes = Arc::clone(&closes);
    let sink = Arc::clone(&written);
    let mut native = MockNativeFs::new();
    native
        .expect_open()
        .withf(|_, options| !options.create)
        .returning(move |_, _| {
            let mut source = descriptor(NativeFileType::Regular, &source_closes);
            let mut served = false;
            source.expect_read().returning(move |buf: &mut [u8]| {
                if served {
                    return Ok(0);
                }
                served = true;
                buf[..5].copy_from_slice(b"hello");
                Ok(5)
            });
            Ok(Box::new(source))
        });
    native
        .expect_open()
        .withf(|_, options| options.create && !options.exclusive && options.mode == 0o666)
        .returning(move |_, _| {
            let mut dest = descriptor(NativeFileType::Regular, &dest_closes);
            let sink = Arc::clone(&sink);
            dest.expect_write().returning(move |data: &[u8]| {
                let take = data.len().min(2);
                sink.lock().unwrap().extend_from_slice(&data[..take]);
                Ok(take)
            });
            Ok(Box::new(dest))
        });
    let fs = service(resolver(), native, false);
    let mut table = HandleTable::default();

    fs.copy(&mut table, "C:\\A.TXT", "C:\\B.TXT", false).unwrap();

    assert_eq!(written.lock().unwrap().as_slice(), b"hello");
    assert_eq!(closes.load(Ordering::SeqCst), 2);
    assert!(table.is_empty());
}

#[test]
fn test_open_file_parse_fills_struct_only() {
    let mut paths = resolver();
    paths.expect_is_fixed_disk().return_const(true);
    let mut native = MockNativeFs::new();
    native.expect_open().never();
    let fs = service(paths, native, false);
    let mut table = HandleTable::default();
    let mut ofs = OfStruct::default();

    let outcome = fs
        .open_file(&mut table, "c:\\autoexec.bat", &mut ofs, OpenFileFlags::PARSE)
        .unwrap();

    assert_eq!(outcome, OpenFileOutcome::Parsed);
    assert_eq!(ofs.path_name, "C:\\AUTOEXEC.BAT");
    assert!(ofs.fixed_disk);
}

#[test]
fn test_open_file_not_found_sets_error_code() {
    let mut paths = resolver();
    paths.expect_search_path().returning(|_| None);
    let fs = service(paths, MockNativeFs::new(), false);
    let mut table = HandleTable::default();
    let mut ofs = OfStruct::default();

    let result = fs.open_file(&mut table, "MISSING.DLL", &mut ofs, OpenFileFlags::empty());

    assert_eq!(result, Err(KernelError::NotFound));
    assert_eq!(ofs.error_code, crate::error::codes::ER_FILE_NOT_FOUND);
}

#[test]
fn test_open_file_exist_closes_and_reverify() {
    let closes = Arc::new(AtomicUsize::new(0));
    let opened = Arc::clone(&closes);
    let mut paths = resolver();
    paths.expect_search_path().returning(|name| Some(full(name)));
    let mut native = MockNativeFs::new();
    native
        .expect_open()
        .returning(move |_, _| Ok(Box::new(descriptor(NativeFileType::Regular, &opened))));
    let fs = service(paths, native, false);
    let mut table = HandleTable::default();
    let mut ofs = OfStruct::default();

    let outcome = fs
        .open_file(&mut table, "C:\\WIN.INI", &mut ofs, OpenFileFlags::EXIST)
        .unwrap();
    assert!(matches!(outcome, OpenFileOutcome::Exists(_)));
    assert!(table.is_empty());
    assert_eq!(ofs.path_name, "C:\\WIN.INI");
    let stamp = ofs.reserved;
    assert_ne!(stamp, DosDateTime::default());

    let reopened = fs
        .open_file(
            &mut table,
            "ignored",
            &mut ofs,
            OpenFileFlags::REOPEN | OpenFileFlags::VERIFY,
        )
        .unwrap();
    assert!(matches!(reopened, OpenFileOutcome::Opened(_)));

    ofs.reserved = DosDateTime::default();
    let stale = fs.open_file(
        &mut table,
        "ignored",
        &mut ofs,
        OpenFileFlags::REOPEN | OpenFileFlags::VERIFY,
    );
    assert_eq!(stale, Err(KernelError::NotFound));
    assert_eq!(ofs.error_code, crate::error::codes::ER_FILE_NOT_FOUND);
    assert_eq!(closes.load(Ordering::SeqCst), 2);
    assert_eq!(table.live_handles().len(), 1);
}
