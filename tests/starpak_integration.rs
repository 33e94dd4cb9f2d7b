//! Starpak resolution through the loader
//!
//! Paths stored in an archive's path blocks are resolved by file name against the
//! configured starpak directory.

mod common;

use common::{starpak_bytes, PakBuilder};
use rpak_rs::{PakLoaderBuilder, RpakError, Variant};
use tempfile::TempDir;

fn apex_pak() -> PakBuilder {
    PakBuilder::new(Variant::Apex)
        .starpak("paks\\Win64\\common.starpak")
        .full_starpak("paks/Win64/common.opt.starpak")
        .slot(0, 8, 8)
        .section(0, 8, vec![0; 8])
}

#[test]
fn test_open_starpaks_from_separate_directory() {
    let pak_dir = TempDir::new().unwrap();
    let stream_dir = TempDir::new().unwrap();
    apex_pak().write(pak_dir.path(), "common");
    std::fs::write(
        stream_dir.path().join("common.starpak"),
        starpak_bytes(&[(0x1000, b"streamed"), (0x2000, b"mips")]),
    )
    .unwrap();
    std::fs::write(
        stream_dir.path().join("common.opt.starpak"),
        starpak_bytes(&[(0x1000, b"full quality")]),
    )
    .unwrap();

    let loader = PakLoaderBuilder::new()
        .variant(Variant::Apex)
        .pak_dir(pak_dir.path())
        .starpak_dir(stream_dir.path())
        .build()
        .unwrap();
    let pak = loader.load("common").unwrap();
    let store = loader.open_starpaks(&pak).unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(store.optional_len(), 1);
    assert_eq!(store.full_len(), 1);
    assert_eq!(store.read(0, 0x1000).unwrap(), b"streamed");
    assert_eq!(store.read(0, 0x2000).unwrap(), b"mips");
    assert_eq!(store.read_full(0, 0x1000).unwrap(), b"full quality");

    assert!(matches!(
        store.read(0, 0x3000),
        Err(RpakError::StarpakEntryNotFound { index: 0, offset: 0x3000 })
    ));
    assert!(matches!(
        store.read(1, 0x1000),
        Err(RpakError::StarpakIndexOutOfBounds(1))
    ));
}

#[test]
fn test_missing_starpak_reports_path() {
    let pak_dir = TempDir::new().unwrap();
    apex_pak().write(pak_dir.path(), "common");

    let loader = PakLoaderBuilder::new()
        .variant(Variant::Apex)
        .pak_dir(pak_dir.path())
        .build()
        .unwrap();
    let pak = loader.load("common").unwrap();
    match loader.open_starpaks(&pak) {
        Err(RpakError::FileIo { path, .. }) => assert!(path.ends_with("common.starpak")),
        other => panic!("unexpected result: {:?}", other.map(|store| store.len())),
    }
}

#[test]
fn test_corrupt_starpak_rejected() {
    let pak_dir = TempDir::new().unwrap();
    apex_pak().write(pak_dir.path(), "common");
    let mut bytes = starpak_bytes(&[(0x10, b"x")]);
    bytes[0] = b'X';
    std::fs::write(pak_dir.path().join("common.starpak"), bytes).unwrap();

    let loader = PakLoaderBuilder::new()
        .variant(Variant::Apex)
        .pak_dir(pak_dir.path())
        .build()
        .unwrap();
    let pak = loader.load("common").unwrap();
    assert!(matches!(
        loader.open_starpaks(&pak),
        Err(RpakError::InvalidStarpak(_))
    ));
}
