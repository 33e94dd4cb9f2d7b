//! Benchmarks for the byte source stack and full archive loads

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rpak_rs::core::chain::{ByteSource, ChainedReader};
use rpak_rs::core::descriptors::{SectionDescriptor, SlotDescriptor};
use rpak_rs::core::patch::{
    DecodeTable, PatchDecoder, PatchProgram, LENGTH_INDEX_BITS, OPCODE_INDEX_BITS,
};
use rpak_rs::{ArchiveHeader, MemoryReader, PakLoader, Variant};

fn chain_of(files: usize, file_size: usize) -> ChainedReader {
    let reader = |i: usize| {
        Box::new(MemoryReader::from_bytes(
            format!("bench{}", i),
            vec![i as u8; file_size],
        ))
    };
    let mut chain = ChainedReader::new(reader(0)).unwrap();
    for i in 1..files {
        chain.push(reader(i), None).unwrap();
    }
    chain
}

/// Archive with `count` sections of `size` bytes in one slot
fn archive(count: usize, size: usize) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&SlotDescriptor::new(0, 16, (count * size) as u64).to_bytes());
    for _ in 0..count {
        body.extend_from_slice(&SectionDescriptor::new(0, 16, size as u32).to_bytes());
    }
    body.extend((0..count * size).map(|i| i as u8));

    let mut header = ArchiveHeader::new(Variant::Titanfall2);
    header.num_slot_descriptors = 1;
    header.num_sections = count as u16;
    header.decompressed_size = (Variant::Titanfall2.header_size() + body.len()) as u64;
    header.compressed_size = header.decompressed_size;

    let mut file = header.to_bytes();
    file.extend(body);
    file
}

fn benchmark_chained_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("chained_read");
    let total = 4 * 1024 * 1024;

    for files in [1usize, 4, 64].iter() {
        group.throughput(Throughput::Bytes(total as u64));
        group.bench_with_input(BenchmarkId::from_parameter(files), files, |b, &files| {
            let mut buffer = vec![0u8; 4096];
            b.iter(|| {
                let mut chain = chain_of(files, total / files);
                for _ in 0..total / buffer.len() {
                    chain.read_data(&mut buffer, 0).unwrap();
                }
                black_box(buffer[0]);
            });
        });
    }

    group.finish();
}

fn benchmark_patch_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("patch_decode");
    let total = 1024 * 1024;

    // Value bits per run: short runs stress instruction decoding
    for value_bits in [2u8, 8, 16].iter() {
        group.throughput(Throughput::Bytes(total as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(value_bits),
            value_bits,
            |b, &value_bits| {
                b.iter(|| {
                    let opcodes = DecodeTable::uniform(OPCODE_INDEX_BITS, 0, 1);
                    let lengths = DecodeTable::uniform(LENGTH_INDEX_BITS, value_bits, 0);
                    let program =
                        PatchProgram::new(opcodes, lengths, vec![0; 8], Vec::new()).unwrap();
                    let mut decoder = PatchDecoder::new(chain_of(1, total), 0);
                    decoder.install(program);

                    let mut buffer = vec![0u8; 4096];
                    for _ in 0..total / buffer.len() {
                        decoder.read_data(&mut buffer, 0).unwrap();
                    }
                    black_box(buffer[0]);
                });
            },
        );
    }

    group.finish();
}

fn benchmark_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_archive");
    let loader = PakLoader::new(".").unwrap();

    for count in [16usize, 256, 1024].iter() {
        let bytes = archive(*count, 4096);
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &bytes, |b, bytes| {
            b.iter(|| {
                let reader = MemoryReader::from_bytes("bench.rpak", bytes.clone());
                let pak = loader.load_from("bench", Box::new(reader)).unwrap();
                black_box(pak.sections().len());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_chained_read,
    benchmark_patch_decode,
    benchmark_load
);
criterion_main!(benches);
