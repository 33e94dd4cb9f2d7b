//! Dump session integration tests
//!
//! One Apex archive with a datatable, a texture, a material that resolves the
//! texture, a material with a missing texture, and two assets nothing can view.

mod common;

use common::{put_str, put_u16, put_u32, put_u64, PakBuilder};
use rpak_rs::core::descriptors::{AssetDescriptor, AssetType, SectionReference};
use rpak_rs::{AssetHasher, MemoryReader, PakLoader, PakLoaderBuilder, RPakFile, Variant, Xxh3Hasher};
use serde_json::Value;

const TEXTURE_HASH: u64 = 0x7000_0000_0000_0001;
const WALL_HASH: u64 = 0x6000_0000_0000_0001;
const BROKEN_HASH: u64 = 0x6000_0000_0000_0002;
const MISSING_TEXTURE: u64 = 0x9999;

fn r(offset: u32) -> SectionReference {
    SectionReference::new(0, offset)
}

fn datatable_hash() -> u64 {
    Xxh3Hasher.hash_name(b"datatable/weapons.rpak")
}

fn fixture() -> Vec<u8> {
    let mut meta = vec![0u8; 1024];

    // Datatable at 0: two columns, two rows of 16 bytes
    put_u32(&mut meta, 0, 2);
    put_u32(&mut meta, 4, 2);
    put_u32(&mut meta, 32, 16);
    put_u32(&mut meta, 72, 4);
    put_u32(&mut meta, 76, 0);
    put_u32(&mut meta, 88, 1);
    put_u32(&mut meta, 92, 8);
    put_u32(&mut meta, 136, 5);
    put_u32(&mut meta, 152, (-1i32) as u32);
    put_str(&mut meta, 256, "name");
    put_str(&mut meta, 264, "count");
    put_str(&mut meta, 280, "weapons/r101");
    put_str(&mut meta, 300, "say \"hi\"");

    // Texture at 320
    put_u16(&mut meta, 320 + 16, 4);
    put_u16(&mut meta, 320 + 18, 4);
    put_u32(&mut meta, 320 + 24, 16);
    put_str(&mut meta, 400, "texture/albedo");
    put_str(&mut meta, 440, "material/wall");
    put_str(&mut meta, 460, "material/broken");

    // Material at 512 with two texture slots
    put_u64(&mut meta, 512 + 40, 0xabc);
    put_u64(&mut meta, 640, TEXTURE_HASH);
    put_u64(&mut meta, 648, 0);

    // Material at 768 whose only texture is absent
    put_u64(&mut meta, 896, MISSING_TEXTURE);

    let pixels: Vec<u8> = (0..16).collect();

    let mut texture = AssetDescriptor::new(TEXTURE_HASH, AssetType::TEXTURE, r(320));
    texture.data = SectionReference::new(1, 0);

    PakBuilder::new(Variant::Apex)
        .slot(0, 8, 1024)
        .slot(1, 16, 16)
        .section(0, 8, meta)
        .section(1, 16, pixels)
        // Datatable pointers
        .pointer(r(8), r(64))
        .pointer(r(16), r(128))
        .pointer(r(64), r(256))
        .pointer(r(80), r(264))
        .pointer(r(128), r(280))
        .pointer(r(144), r(300))
        // Texture name
        .pointer(r(320 + 8), r(400))
        // Material names and texture lists
        .pointer(r(512 + 24), r(440))
        .pointer(r(512 + 96), r(640))
        .pointer(r(512 + 104), r(656))
        .pointer(r(768 + 24), r(460))
        .pointer(r(768 + 96), r(896))
        .pointer(r(768 + 104), r(904))
        .asset(AssetDescriptor::new(datatable_hash(), AssetType::DATATABLE, r(0)))
        .asset(AssetDescriptor::new(WALL_HASH, AssetType::MATERIAL, r(512)))
        .asset(texture)
        .asset(AssetDescriptor::new(BROKEN_HASH, AssetType::MATERIAL, r(768)))
        .asset(AssetDescriptor::new(0x51, AssetType::from_tag(b"zzzz"), r(0)))
        .asset(AssetDescriptor::new(
            0x52,
            AssetType::SHADER,
            SectionReference::new(7, 0),
        ))
        .build()
}

fn load(loader: &PakLoader) -> RPakFile {
    loader
        .load_from("dump", Box::new(MemoryReader::from_bytes("dump.rpak", fixture())))
        .unwrap()
}

fn apex_loader() -> PakLoader {
    let mut loader = PakLoaderBuilder::new().variant(Variant::Apex).build().unwrap();
    loader.names_mut().add("datatable/weapons.rpak");
    loader
}

#[test]
fn test_dump_outputs_and_skips() {
    let mut loader = apex_loader();
    let pak = load(&loader);
    let report = loader.dump(&pak).unwrap();

    let files: Vec<&str> = report
        .dumped
        .iter()
        .map(|dumped| dumped.file_name.as_str())
        .collect();
    assert_eq!(
        files,
        [
            "datatable/weapons.rpak.csv",
            "texture/albedo.bin",
            "material/wall.json"
        ]
    );

    let reasons: Vec<(usize, &str)> = report
        .skipped
        .iter()
        .map(|skipped| (skipped.index, skipped.reason.as_str()))
        .collect();
    assert_eq!(reasons.len(), 3);
    assert_eq!(reasons[0], (4, "no registered view"));
    assert_eq!(reasons[1], (5, "invalid metadata reference"));
    assert_eq!(reasons[2].0, 3);
    assert!(reasons[2].1.contains("0000000000009999"));
    assert_eq!(report.skipped[2].asset_type, "matl");
}

#[test]
fn test_datatable_csv() {
    let mut loader = apex_loader();
    let pak = load(&loader);
    let report = loader.dump(&pak).unwrap();

    let csv = rpak_rs::SiblingSource::open(&report.dumped, datatable_hash()).unwrap();
    assert_eq!(
        String::from_utf8(csv.output.bytes.clone()).unwrap(),
        "\"name\",\"count\"\n\"weapons/r101\",\"5\"\n\"say \"\"hi\"\"\",\"-1\"\n"
    );
}

#[test]
fn test_material_resolves_dumped_texture() {
    let mut loader = apex_loader();
    let pak = load(&loader);
    let report = loader.dump(&pak).unwrap();

    let material = rpak_rs::SiblingSource::open(&report.dumped, WALL_HASH).unwrap();
    let json: Value = serde_json::from_slice(&material.output.bytes).unwrap();
    assert_eq!(json["name"], "material/wall");
    assert_eq!(json["unknown1"], "abc");
    assert_eq!(json["textures"][0], "texture/albedo.bin");
    assert!(json["textures"][1].is_null());
    assert!(json.get("width").is_none());

    let texture = rpak_rs::SiblingSource::open(&report.dumped, TEXTURE_HASH).unwrap();
    assert_eq!(texture.output.bytes, (0..16).collect::<Vec<u8>>());
}

#[test]
fn test_dump_discovers_names() {
    let mut loader = apex_loader();
    let pak = load(&loader);
    let report = loader.dump(&pak).unwrap();

    // Two datatable strings, the texture name and the material name
    assert_eq!(report.discovered_names, 4);
    let names = loader.names();
    assert!(names.contains(names.hash_of("weapons/r101")));
    assert!(names.contains(names.hash_of("say \"hi\"")));
    assert!(names.contains(names.hash_of("texture/albedo")));
    assert!(!names.contains(names.hash_of("material/broken")));

    // A second run finds nothing new
    let again = loader.dump(&pak).unwrap();
    assert_eq!(again.discovered_names, 0);
}

#[test]
fn test_summaries_use_known_names() {
    let loader = apex_loader();
    let pak = load(&loader);
    let summaries = loader.summaries(&pak);

    assert_eq!(summaries.len(), 6);
    assert_eq!(summaries[0].name, "datatable/weapons.rpak");
    assert_eq!(summaries[1].name, "material/wall");
    assert!(summaries[2].has_data);
    assert_eq!(summaries[4].asset_type, "zzzz");
    assert!(!summaries[4].registered);
    assert_eq!(summaries[5].name, "0000000000000052");

    let json = serde_json::to_string(&summaries).unwrap();
    assert!(json.contains("\"texture/albedo\""));
}
