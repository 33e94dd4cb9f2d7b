#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rpak_rs::core::chain::{ByteSource, ChainedReader};
use rpak_rs::core::patch::{
    DecodeTable, PatchDecoder, PatchProgram, LENGTH_INDEX_BITS, OPCODE_INDEX_BITS,
};
use rpak_rs::MemoryReader;

#[derive(Arbitrary, Debug)]
struct Input {
    opcode_symbols: Vec<u8>,
    length_symbols: Vec<u8>,
    bitstream: Vec<u8>,
    literals: Vec<u8>,
    source: Vec<u8>,
    initial_run: u16,
    reads: Vec<u16>,
}

fn table(index_bits: u32, raw: &[u8], max_symbol: u8) -> DecodeTable {
    let len = 1usize << index_bits;
    let symbols = (0..len)
        .map(|i| raw.get(i).copied().unwrap_or(0) % (max_symbol + 1))
        .collect();
    let code_bits = (0..len)
        .map(|i| raw.get(len + i).copied().unwrap_or(1) % (index_bits as u8 + 1))
        .collect();
    DecodeTable::new(symbols, code_bits)
}

fuzz_target!(|input: Input| {
    let opcodes = table(OPCODE_INDEX_BITS, &input.opcode_symbols, 7);
    let lengths = table(LENGTH_INDEX_BITS, &input.length_symbols, 24);
    let Ok(program) = PatchProgram::new(opcodes, lengths, input.bitstream, input.literals) else {
        return;
    };

    let source = MemoryReader::from_bytes("fuzz", input.source);
    let Ok(chain) = ChainedReader::new(Box::new(source)) else {
        return;
    };
    let mut decoder = PatchDecoder::new(chain, input.initial_run as u64);
    decoder.install(program);

    for len in input.reads.iter().take(64) {
        let mut buffer = vec![0u8; *len as usize % 4096];
        if decoder.read_data(&mut buffer, 0).is_err() {
            break;
        }
    }
});
