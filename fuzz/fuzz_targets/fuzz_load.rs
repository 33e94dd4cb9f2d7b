#![no_main]
use libfuzzer_sys::fuzz_target;
use rpak_rs::{ArchiveParser, DirectoryOpener, MemoryReader, Variant};

// Arbitrary bytes as a base archive; linked archives resolve against an empty directory

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let variant = if data[0] & 1 == 0 {
        Variant::Titanfall2
    } else {
        Variant::Apex
    };
    let opener = DirectoryOpener::new("/nonexistent", variant);
    let parser = ArchiveParser::new(variant, &opener);
    let reader = MemoryReader::from_bytes("fuzz.rpak", data[1..].to_vec());

    if let Ok(pak) = parser.load_from("fuzz", Box::new(reader)) {
        for index in 0..pak.num_assets() {
            let _ = pak.asset_parts(index);
        }
    }
});
