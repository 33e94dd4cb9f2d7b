//! Bulk decompression adapter
//!
//! The decompression algorithm itself is external. [`CompressedFileReader`] drives a
//! [`BulkDecompressor`] through two ring buffers: compressed input is streamed from disk
//! into a 16 MiB ring in 512 KiB chunks, and output lands in a 4 MiB ring that
//! `read_data` drains.

use crate::error::{RpakError, Result};
use crate::header::{ArchiveHeader, Variant};
use crate::io::DecompressedReader;
use std::io::Read;
use std::sync::Arc;
use tracing::trace;

/// Size of the compressed input ring
pub const INPUT_RING_SIZE: usize = 0x100_0000;

/// Size of the decompressed output ring
pub const OUTPUT_RING_SIZE: usize = 0x40_0000;

/// Granularity of input refills
pub const INPUT_CHUNK_SIZE: usize = 512 * 1024;

/// Call contract of the bulk decompression algorithm
///
/// Positions are absolute stream offsets. Input byte `i` lives at
/// `input[i & input_mask]`; output byte `o` is written to `output[o % output.len()]`.
pub trait BulkDecompressor {
    /// Prepare a new stream from the first input window
    ///
    /// Returns the decompressed size (header included) declared by the stream.
    fn setup(
        &mut self,
        first_input: &[u8],
        input_mask: u64,
        compressed_size: u64,
        start_offset: u64,
        header_size: u64,
    ) -> Result<u64>;

    /// Decompress until `target_offset` output bytes exist or `bytes_available` input
    /// bytes are exhausted
    fn decompress(
        &mut self,
        input: &[u8],
        bytes_available: u64,
        output: &mut [u8],
        target_offset: u64,
    ) -> Result<()>;

    /// Absolute input position consumed so far
    fn input_consumed(&self) -> u64;

    /// Absolute output position produced so far, header included
    fn total_decompressed(&self) -> u64;
}

/// Produces a fresh decompressor for every compressed file opened
pub type DecompressorFactory = Arc<dyn Fn() -> Box<dyn BulkDecompressor> + Send + Sync>;

/// Identity codec for archives whose body is stored verbatim behind the compressed flag
#[derive(Debug, Default)]
pub struct StoredDecompressor {
    input_mask: u64,
    compressed_size: u64,
    consumed: u64,
    total: u64,
}

impl StoredDecompressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory() -> DecompressorFactory {
        Arc::new(|| Box::new(StoredDecompressor::new()) as Box<dyn BulkDecompressor>)
    }
}

impl BulkDecompressor for StoredDecompressor {
    fn setup(
        &mut self,
        first_input: &[u8],
        input_mask: u64,
        compressed_size: u64,
        start_offset: u64,
        header_size: u64,
    ) -> Result<u64> {
        if (first_input.len() as u64) < header_size.min(compressed_size) {
            return Err(RpakError::Decompression(
                "first input window shorter than header".into(),
            ));
        }
        self.input_mask = input_mask;
        self.compressed_size = compressed_size;
        self.consumed = start_offset + header_size;
        self.total = header_size;
        Ok(compressed_size)
    }

    fn decompress(
        &mut self,
        input: &[u8],
        bytes_available: u64,
        output: &mut [u8],
        target_offset: u64,
    ) -> Result<()> {
        let available = bytes_available.min(self.compressed_size);
        while self.total < target_offset && self.consumed < available {
            let out = (self.total % output.len() as u64) as usize;
            output[out] = input[(self.consumed & self.input_mask) as usize];
            self.total += 1;
            self.consumed += 1;
        }
        Ok(())
    }

    fn input_consumed(&self) -> u64 {
        self.consumed
    }

    fn total_decompressed(&self) -> u64 {
        self.total
    }
}

/// [`DecompressedReader`] over a bulk-compressed archive
pub struct CompressedFileReader<R> {
    name: String,
    inner: R,
    decompressor: Box<dyn BulkDecompressor>,
    input: Vec<u8>,
    output: Vec<u8>,
    compressed_size: u64,
    decompressed_size: u64,
    /// Compressed bytes read from `inner`
    bytes_read: u64,
    /// Decompressed bytes handed out (or skipped) by `read_data`
    bytes_processed: u64,
    /// Decompressed bytes currently produced
    total_decompressed: u64,
}

impl<R: Read> CompressedFileReader<R> {
    /// Read the header, prime the input ring and decompress the first window
    pub fn new(
        name: impl Into<String>,
        mut inner: R,
        mut decompressor: Box<dyn BulkDecompressor>,
        variant: Variant,
    ) -> Result<Self> {
        let name = name.into();
        let header_size = variant.header_size();

        let mut input = vec![0u8; INPUT_RING_SIZE];
        inner
            .read_exact(&mut input[..header_size])
            .map_err(|e| RpakError::file_io(&name, e))?;
        let header = ArchiveHeader::from_bytes(&input[..header_size], variant)?;

        let first_window = (header.compressed_size as usize).min(INPUT_RING_SIZE);
        if first_window < header_size {
            return Err(RpakError::Decompression(format!(
                "{}: compressed size 0x{:x} smaller than header",
                name, header.compressed_size
            )));
        }
        inner
            .read_exact(&mut input[header_size..first_window])
            .map_err(|e| RpakError::file_io(&name, e))?;

        let declared = decompressor.setup(
            &input[..first_window],
            (INPUT_RING_SIZE - 1) as u64,
            header.compressed_size,
            0,
            header_size as u64,
        )?;
        if declared != header.decompressed_size {
            return Err(RpakError::DecompressedSizeMismatch {
                header: header.decompressed_size,
                data: declared,
            });
        }

        let mut output = vec![0u8; OUTPUT_RING_SIZE];
        output[..header_size].copy_from_slice(&input[..header_size]);

        let mut reader = CompressedFileReader {
            name,
            inner,
            decompressor,
            input,
            output,
            compressed_size: header.compressed_size,
            decompressed_size: header.decompressed_size,
            bytes_read: first_window as u64,
            bytes_processed: 0,
            total_decompressed: header_size as u64,
        };
        if reader.total_decompressed < reader.decompressed_size {
            reader.decompress_next()?;
        }
        Ok(reader)
    }

    fn decompress_next(&mut self) -> Result<()> {
        if self.total_decompressed >= self.decompressed_size {
            return Err(RpakError::Decompression(format!(
                "{}: cannot decompress next block, whole file already decompressed",
                self.name
            )));
        }

        let chunks_before = self.decompressor.input_consumed() / INPUT_CHUNK_SIZE as u64;
        let target = (self.bytes_processed + OUTPUT_RING_SIZE as u64).min(self.decompressed_size);
        self.decompressor
            .decompress(&self.input, self.bytes_read, &mut self.output, target)?;
        let chunks_after = self.decompressor.input_consumed() / INPUT_CHUNK_SIZE as u64;

        for _ in chunks_before..chunks_after {
            let to_read = (INPUT_CHUNK_SIZE as u64).min(self.compressed_size - self.bytes_read);
            if to_read == 0 {
                break;
            }
            let start = (self.bytes_read % INPUT_RING_SIZE as u64) as usize;
            self.inner
                .read_exact(&mut self.input[start..start + to_read as usize])
                .map_err(|e| RpakError::file_io(&self.name, e))?;
            self.bytes_read += to_read;
        }

        let produced = self.decompressor.total_decompressed();
        if produced <= self.total_decompressed {
            return Err(RpakError::Decompression(format!(
                "{}: decompressor made no progress at 0x{:x}",
                self.name, produced
            )));
        }
        trace!(
            "{}: decompressed 0x{:x}..0x{:x}",
            self.name,
            self.total_decompressed,
            produced
        );
        self.total_decompressed = produced;
        Ok(())
    }
}

impl<R: Read> DecompressedReader for CompressedFileReader<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.decompressed_size
    }

    fn read_data(&mut self, buffer: &mut [u8], skip: u64) -> Result<()> {
        let mut skipped = 0u64;
        let mut copied = 0usize;

        while skipped != skip || copied != buffer.len() {
            if self.bytes_processed == self.total_decompressed {
                self.decompress_next()?;
            }

            let ring_offset = (self.bytes_processed % OUTPUT_RING_SIZE as u64) as usize;
            let contiguous = (self.total_decompressed - self.bytes_processed)
                .min((OUTPUT_RING_SIZE - ring_offset) as u64);

            if skipped != skip {
                let step = contiguous.min(skip - skipped);
                skipped += step;
                self.bytes_processed += step;
            } else {
                let step = (contiguous as usize).min(buffer.len() - copied);
                buffer[copied..copied + step]
                    .copy_from_slice(&self.output[ring_offset..ring_offset + step]);
                copied += step;
                self.bytes_processed += step as u64;
            }
        }

        Ok(())
    }
}
