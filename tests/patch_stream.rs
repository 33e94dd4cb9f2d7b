//! Patch stream decoding over chained sources
//!
//! Drives the decoder through the public API with hand-assembled programs whose
//! runs cross the boundary between a base file and a linked file.

mod common;

use common::{passthrough_patch_block, RawTables};
use rpak_rs::core::chain::{ByteSource, ChainedReader};
use rpak_rs::core::patch::{
    DecodeTable, PatchDecoder, PatchProgram, LENGTH_INDEX_BITS, OPCODE_INDEX_BITS,
};
use rpak_rs::{MemoryReader, RpakError};

/// Ten base bytes `0..10`, then five linked bytes `100..105` behind a four-byte header
fn chained_source() -> ChainedReader {
    let base = MemoryReader::from_bytes("base", (0u8..10).collect());
    let mut linked = vec![0xFF; 4];
    linked.extend(100u8..105);

    let mut chain = ChainedReader::new(Box::new(base)).unwrap();
    chain
        .push(Box::new(MemoryReader::from_bytes("linked", linked)), Some(4))
        .unwrap();
    chain
}

/// Even indices decode to Read, odd ones to Replace; runs carry two value bits
fn read_or_replace(bitstream: Vec<u8>, literals: Vec<u8>) -> PatchProgram {
    let mut opcodes = DecodeTable::uniform(OPCODE_INDEX_BITS, 0, 1);
    for index in (1..64).step_by(2) {
        opcodes.symbols[index] = 3;
    }
    let lengths = DecodeTable::uniform(LENGTH_INDEX_BITS, 2, 0);
    PatchProgram::new(opcodes, lengths, bitstream, literals).unwrap()
}

#[test]
fn test_chain_skips_linked_header() {
    let mut chain = chained_source();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.remaining(), 15);

    let bytes = chain.read_vec(15).unwrap();
    assert_eq!(&bytes[..10], &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    assert_eq!(&bytes[10..], &[100, 101, 102, 103, 104]);
}

#[test]
fn test_passthrough_spans_files() {
    let mut decoder = PatchDecoder::new(chained_source(), 16);
    let mut buffer = [0u8; 4];
    decoder.read_data(&mut buffer, 8).unwrap();
    assert_eq!(buffer, [8, 9, 100, 101]);
}

#[test]
fn test_passthrough_past_end() {
    let mut decoder = PatchDecoder::new(chained_source(), 16);
    let mut buffer = [0u8; 16];
    assert!(matches!(
        decoder.read_data(&mut buffer, 0),
        Err(RpakError::ReadPastEnd { requested: 16, available: 15 })
    ));
}

#[test]
fn test_replace_across_file_boundary() {
    // Replace 4 (bit 1, value 00), then Read 7 (bit 0, value 11)
    let program = read_or_replace(vec![0b0011_0001], vec![0xA0, 0xA1, 0xA2, 0xA3]);
    let mut decoder = PatchDecoder::new(chained_source(), 8);
    decoder.install(program);

    let mut buffer = [0u8; 15];
    decoder.read_data(&mut buffer, 0).unwrap();
    assert_eq!(
        buffer,
        [0, 1, 2, 3, 4, 5, 6, 7, 0xA0, 0xA1, 0xA2, 0xA3, 102, 103, 104]
    );
    assert_eq!(decoder.into_inner().remaining(), 0);
}

#[test]
fn test_program_from_raw_block_passes_through() {
    let program = PatchProgram::from_block(&passthrough_patch_block(1), &RawTables).unwrap();
    let mut decoder = PatchDecoder::new(chained_source(), 3);
    decoder.install(program);

    let bytes = decoder.read_vec(15).unwrap();
    assert_eq!(&bytes[..10], &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    assert_eq!(&bytes[10..], &[100, 101, 102, 103, 104]);
}

#[test]
fn test_program_installed_late_takes_over() {
    let mut decoder = PatchDecoder::new(chained_source(), 4);
    let mut head = [0u8; 4];
    decoder.read_data(&mut head, 0).unwrap();
    assert!(!decoder.has_program());

    let mut next = [0u8; 1];
    assert!(matches!(
        decoder.read_data(&mut next, 0),
        Err(RpakError::PatchProgramMissing)
    ));

    decoder.install(read_or_replace(vec![0b0000_0110], Vec::new()));
    decoder.read_data(&mut next, 0).unwrap();
    assert_eq!(next, [4]);
}
