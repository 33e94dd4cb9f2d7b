//! Continuous byte source spanning a base archive and its linked archives

use crate::error::{RpakError, Result};
use crate::io::DecompressedReader;
use tracing::trace;

/// Something that yields a forward-only stream of bytes with skip support
///
/// Implemented by the chained source itself and by the patch decoder wrapping it, so
/// the structural parser does not care which one it reads from.
pub trait ByteSource {
    /// Discard `skip` bytes, then fill `buffer`
    fn read_data(&mut self, buffer: &mut [u8], skip: u64) -> Result<()>;

    /// Discard `count` bytes
    fn discard(&mut self, count: u64) -> Result<()> {
        self.read_data(&mut [], count)
    }

    /// Read exactly `len` bytes into a new buffer
    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|_| RpakError::BufferAllocation(len as u64))?;
        buffer.resize(len, 0);
        self.read_data(&mut buffer, 0)?;
        Ok(buffer)
    }

    fn read_u16(&mut self) -> Result<u16> {
        let mut bytes = [0u8; 2];
        self.read_data(&mut bytes, 0)?;
        Ok(u16::from_le_bytes(bytes))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut bytes = [0u8; 4];
        self.read_data(&mut bytes, 0)?;
        Ok(u32::from_le_bytes(bytes))
    }
}

struct ChainEntry {
    reader: Box<dyn DecompressedReader>,
    remaining: u64,
}

/// Concatenation of several [`DecompressedReader`]s
pub struct ChainedReader {
    entries: Vec<ChainEntry>,
    current: usize,
}

impl ChainedReader {
    pub fn new(base: Box<dyn DecompressedReader>) -> Result<Self> {
        let mut chain = ChainedReader {
            entries: Vec::new(),
            current: 0,
        };
        chain.push(base, None)?;
        Ok(chain)
    }

    /// Append a reader; when `skip_header` is given, that many bytes are consumed from
    /// the reader up front and excluded from the chain
    pub fn push(
        &mut self,
        mut reader: Box<dyn DecompressedReader>,
        skip_header: Option<usize>,
    ) -> Result<()> {
        let mut remaining = reader.size();
        if let Some(header_size) = skip_header {
            reader.read_data(&mut [], header_size as u64)?;
            remaining = remaining.saturating_sub(header_size as u64);
        }

        trace!("Pushing file {} with size 0x{:x}", reader.name(), remaining);
        self.entries.push(ChainEntry { reader, remaining });
        Ok(())
    }

    /// Number of readers in the chain
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes left across the current and all following readers
    pub fn remaining(&self) -> u64 {
        self.entries[self.current..]
            .iter()
            .map(|entry| entry.remaining)
            .sum()
    }

    fn goto_next(&mut self, requested: u64) -> Result<()> {
        if self.current + 1 >= self.entries.len() {
            return Err(RpakError::ReadPastEnd {
                requested,
                available: 0,
            });
        }
        self.current += 1;
        Ok(())
    }

    fn check_available(&self, requested: u64) -> Result<()> {
        let available = self.remaining();
        if requested > available {
            return Err(RpakError::ReadPastEnd {
                requested,
                available,
            });
        }
        Ok(())
    }
}

impl ByteSource for ChainedReader {
    fn read_data(&mut self, buffer: &mut [u8], skip: u64) -> Result<()> {
        let requested = skip
            .checked_add(buffer.len() as u64)
            .ok_or(RpakError::ReadPastEnd {
                requested: u64::MAX,
                available: self.remaining(),
            })?;
        self.check_available(requested)?;

        let mut skipped = 0u64;
        while skipped != skip {
            if self.entries[self.current].remaining == 0 {
                self.goto_next(skip - skipped)?;
            }
            let entry = &mut self.entries[self.current];
            let step = entry.remaining.min(skip - skipped);
            entry.reader.read_data(&mut [], step)?;
            entry.remaining -= step;
            skipped += step;
            trace!(
                "Skipped 0x{:x} bytes from {}, now at 0x{:x}",
                step,
                entry.reader.name(),
                entry.reader.size() - entry.remaining
            );
        }

        let mut read = 0usize;
        while read != buffer.len() {
            if self.entries[self.current].remaining == 0 {
                self.goto_next((buffer.len() - read) as u64)?;
            }
            let entry = &mut self.entries[self.current];
            let step = (entry.remaining as usize).min(buffer.len() - read);
            entry.reader.read_data(&mut buffer[read..read + step], 0)?;
            entry.remaining -= step as u64;
            read += step;
            trace!(
                "Read 0x{:x} bytes from {}, now at 0x{:x}",
                step,
                entry.reader.name(),
                entry.reader.size() - entry.remaining
            );
        }

        Ok(())
    }
}
