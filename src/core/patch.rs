//! Differential patch stream decoder
//!
//! A patched archive is reconstructed from the base archive plus its linked archives by
//! running every byte through a small opcode machine. The opcode program is read from
//! the patch data block near the end of the archive headers: two prefix-code tables
//! (built by an external [`PatchTableBuilder`]), a bitstream of opcodes and run lengths,
//! and a pool of literal bytes used by insert/replace operations.
//!
//! Until a program is installed the decoder behaves as a plain `Read` of the initial
//! run length, which is how unpatched archives are loaded.

use crate::bytes::{le_u64, le_u64_padded};
use crate::chain::ByteSource;
use crate::error::{RpakError, Result};
use tracing::trace;

/// Index bits of the opcode table
pub const OPCODE_INDEX_BITS: u32 = 6;

/// Index bits of the run length table
pub const LENGTH_INDEX_BITS: u32 = 8;

/// Symbols the opcode table may decode to
pub const OPCODE_SYMBOLS: [u8; 7] = [0, 1, 2, 3, 4, 5, 6];

/// Symbols the run length table may decode to
pub const LENGTH_SYMBOLS: [u8; 32] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
    25, 26, 27, 28, 29, 30, 31,
];

/// Fixed run lengths of opcode ids 4, 5 and 6
const SPECIAL_RUN_LENGTHS: [u64; 3] = [3, 7, 6];

/// Low 24 bits of the program header word locate the literal pool
const LITERAL_OFFSET_BITS: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOpcode {
    /// Copy bytes from the underlying source
    Read,
    /// Drop the whole run from the underlying source
    Skip,
    /// Emit literal bytes; the source does not advance
    Insert,
    /// Emit literal bytes in place of source bytes
    Replace,
    /// Replace one byte, then continue as `Read`
    ReplaceOneThenRead,
    /// Replace two bytes, then continue as `Read`
    ReplaceTwoThenRead,
}

impl PatchOpcode {
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(PatchOpcode::Read),
            1 => Ok(PatchOpcode::Skip),
            2 => Ok(PatchOpcode::Insert),
            3 => Ok(PatchOpcode::Replace),
            4 | 5 => Ok(PatchOpcode::ReplaceOneThenRead),
            6 => Ok(PatchOpcode::ReplaceTwoThenRead),
            other => Err(RpakError::InvalidPatchOpcode(other)),
        }
    }
}

/// Prefix-code lookup table: entry `i` gives the symbol for index `i` and the number
/// of bits its code occupies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeTable {
    pub symbols: Vec<u8>,
    pub code_bits: Vec<u8>,
}

impl DecodeTable {
    pub fn new(symbols: Vec<u8>, code_bits: Vec<u8>) -> Self {
        DecodeTable { symbols, code_bits }
    }

    /// Table where every index maps to the same entry
    pub fn uniform(index_bits: u32, symbol: u8, code_bits: u8) -> Self {
        let len = 1usize << index_bits;
        DecodeTable {
            symbols: vec![symbol; len],
            code_bits: vec![code_bits; len],
        }
    }

    fn check(&self, index_bits: u32, what: &str) -> Result<()> {
        let len = 1usize << index_bits;
        if self.symbols.len() != len || self.code_bits.len() != len {
            return Err(RpakError::InvalidPatchData(format!(
                "{} table has {}/{} entries, expected {}",
                what,
                self.symbols.len(),
                self.code_bits.len(),
                len
            )));
        }
        Ok(())
    }
}

/// External constructor of the prefix-code tables stored in a patch data block
pub trait PatchTableBuilder {
    /// Build a table with `2^index_bits` entries from the start of `input`
    ///
    /// Returns the table and the number of input bytes it was encoded in.
    fn build(&self, input: &[u8], index_bits: u32, symbols: &[u8]) -> Result<(DecodeTable, usize)>;
}

/// Little-endian bit reader that refills 64-bit words lazily
#[derive(Debug, Clone)]
struct BitReader {
    register: u64,
    /// Byte offset of the next refill word
    cursor: usize,
    /// Bits consumed from the register since the last refill
    debt: u32,
}

impl BitReader {
    fn refill(&mut self, data: &[u8]) -> Result<()> {
        if self.debt > 64 {
            return Err(RpakError::InvalidPatchData(format!(
                "bit debt {} exceeds register width",
                self.debt
            )));
        }
        if self.debt > 0 {
            self.register |= le_u64_padded(data, self.cursor) << (64 - self.debt);
        }
        self.cursor += (self.debt >> 3) as usize;
        self.debt &= 7;
        Ok(())
    }

    fn consume(&mut self, bits: u32) {
        self.register = self.register.checked_shr(bits).unwrap_or(0);
        self.debt += bits;
    }
}

/// Decode program read from an archive's patch data block
#[derive(Debug, Clone)]
pub struct PatchProgram {
    opcodes: DecodeTable,
    lengths: DecodeTable,
    bitstream: Vec<u8>,
    literals: Vec<u8>,
    bits: BitReader,
    literal_cursor: usize,
}

impl PatchProgram {
    /// Build a program from raw tables, an opcode bitstream starting at bit 0 and a
    /// literal pool
    pub fn new(
        opcodes: DecodeTable,
        lengths: DecodeTable,
        bitstream: Vec<u8>,
        literals: Vec<u8>,
    ) -> Result<Self> {
        let register = le_u64_padded(&bitstream, 0);
        Self::with_state(opcodes, lengths, bitstream, literals, register, 8, 0)
    }

    /// Parse a patch data block
    pub fn from_block(block: &[u8], builder: &dyn PatchTableBuilder) -> Result<Self> {
        let (opcodes, opcode_len) = builder.build(block, OPCODE_INDEX_BITS, &OPCODE_SYMBOLS)?;
        let rest = block.get(opcode_len..).ok_or_else(|| {
            RpakError::InvalidPatchData("opcode table overruns patch block".into())
        })?;
        let (lengths, length_len) = builder.build(rest, LENGTH_INDEX_BITS, &LENGTH_SYMBOLS)?;

        let start = opcode_len + length_len;
        if start + 8 > block.len() {
            return Err(RpakError::InvalidPatchData(format!(
                "program header at 0x{:x} overruns patch block of 0x{:x} bytes",
                start,
                block.len()
            )));
        }

        let word = le_u64(block, start);
        let literal_start = start + (word & ((1 << LITERAL_OFFSET_BITS) - 1)) as usize;
        if literal_start > block.len() {
            return Err(RpakError::InvalidPatchData(format!(
                "literal pool at 0x{:x} outside patch block",
                literal_start
            )));
        }

        Self::with_state(
            opcodes,
            lengths,
            block[start..].to_vec(),
            block[literal_start..].to_vec(),
            word >> LITERAL_OFFSET_BITS,
            8,
            LITERAL_OFFSET_BITS,
        )
    }

    fn with_state(
        opcodes: DecodeTable,
        lengths: DecodeTable,
        bitstream: Vec<u8>,
        literals: Vec<u8>,
        register: u64,
        cursor: usize,
        debt: u32,
    ) -> Result<Self> {
        opcodes.check(OPCODE_INDEX_BITS, "opcode")?;
        lengths.check(LENGTH_INDEX_BITS, "length")?;
        if let Some(bits) = lengths.symbols.iter().find(|bits| **bits >= 64) {
            return Err(RpakError::InvalidPatchData(format!(
                "run length of {} value bits",
                bits
            )));
        }

        Ok(PatchProgram {
            opcodes,
            lengths,
            bitstream,
            literals,
            bits: BitReader {
                register,
                cursor,
                debt,
            },
            literal_cursor: 0,
        })
    }

    /// Decode the next instruction: its opcode and run length
    fn next_instruction(&mut self) -> Result<(PatchOpcode, u64)> {
        self.bits.refill(&self.bitstream)?;

        let index = (self.bits.register & 0x3F) as usize;
        let id = self.opcodes.symbols[index];
        self.bits.consume(self.opcodes.code_bits[index] as u32);
        let opcode = PatchOpcode::from_id(id)?;

        let run = if id >= 4 {
            SPECIAL_RUN_LENGTHS[(id - 4) as usize]
        } else {
            let index = (self.bits.register & 0xFF) as usize;
            let value_bits = self.lengths.symbols[index] as u32;
            let skip_bits = self.lengths.code_bits[index] as u32;

            let value = self.bits.register.checked_shr(skip_bits).unwrap_or(0);
            let mask = (1u64 << value_bits) - 1;
            self.bits.register = value.checked_shr(value_bits).unwrap_or(0);
            self.bits.debt += value_bits + skip_bits;
            (1u64 << value_bits) + (value & mask)
        };

        Ok((opcode, run))
    }

    fn take_literals(&mut self, count: usize) -> Result<&[u8]> {
        let start = self.literal_cursor;
        let end = start + count;
        if end > self.literals.len() {
            return Err(RpakError::InvalidPatchData(format!(
                "literal pool exhausted at 0x{:x}",
                start
            )));
        }
        self.literal_cursor = end;
        Ok(&self.literals[start..end])
    }
}

/// [`ByteSource`] that reconstructs patched archive content from an underlying source
pub struct PatchDecoder<S> {
    source: S,
    run: u64,
    opcode: PatchOpcode,
    program: Option<PatchProgram>,
}

impl<S: ByteSource> PatchDecoder<S> {
    /// Decoder that reads `initial_run` bytes verbatim before consulting a program
    pub fn new(source: S, initial_run: u64) -> Self {
        PatchDecoder {
            source,
            run: initial_run,
            opcode: PatchOpcode::Read,
            program: None,
        }
    }

    /// Install the decode program; takes effect when the current run ends
    pub fn install(&mut self, program: PatchProgram) {
        self.program = Some(program);
    }

    pub fn has_program(&self) -> bool {
        self.program.is_some()
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    fn advance(&mut self) -> Result<()> {
        let program = self.program.as_mut().ok_or(RpakError::PatchProgramMissing)?;
        let (opcode, run) = program.next_instruction()?;
        trace!("Patch instruction {:?} for 0x{:x} bytes", opcode, run);
        self.opcode = opcode;
        self.run = run;
        Ok(())
    }

    fn literals(&mut self, count: usize) -> Result<&[u8]> {
        self.program
            .as_mut()
            .ok_or(RpakError::PatchProgramMissing)?
            .take_literals(count)
    }

    fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        let count = (self.run.min(out.len() as u64)) as usize;
        self.source.read_data(&mut out[..count], 0)?;
        self.run -= count as u64;
        Ok(count)
    }

    /// Execute the current opcode into a non-empty `out`, returning bytes produced
    fn step(&mut self, out: &mut [u8]) -> Result<usize> {
        match self.opcode {
            PatchOpcode::Read => self.read(out),
            PatchOpcode::Skip => {
                trace!("Skipping 0x{:x} bytes", self.run);
                self.source.discard(self.run)?;
                self.run = 0;
                Ok(0)
            }
            PatchOpcode::Insert => {
                let count = (self.run.min(out.len() as u64)) as usize;
                out[..count].copy_from_slice(self.literals(count)?);
                self.run -= count as u64;
                Ok(count)
            }
            PatchOpcode::Replace => {
                let count = (self.run.min(out.len() as u64)) as usize;
                out[..count].copy_from_slice(self.literals(count)?);
                self.source.discard(count as u64)?;
                self.run -= count as u64;
                Ok(count)
            }
            PatchOpcode::ReplaceOneThenRead => {
                out[0] = self.literals(1)?[0];
                self.source.discard(1)?;
                self.opcode = PatchOpcode::Read;
                let read = if out.len() > 1 { self.read(&mut out[1..])? } else { 0 };
                Ok(1 + read)
            }
            PatchOpcode::ReplaceTwoThenRead => {
                if out.len() == 1 {
                    out[0] = self.literals(1)?[0];
                    self.source.discard(1)?;
                    self.opcode = PatchOpcode::ReplaceOneThenRead;
                    return Ok(1);
                }
                out[..2].copy_from_slice(self.literals(2)?);
                self.source.discard(2)?;
                self.opcode = PatchOpcode::Read;
                let read = if out.len() > 2 { self.read(&mut out[2..])? } else { 0 };
                Ok(2 + read)
            }
        }
    }
}

impl<S: ByteSource> ByteSource for PatchDecoder<S> {
    fn read_data(&mut self, buffer: &mut [u8], skip: u64) -> Result<()> {
        let mut remaining_skip = skip;
        if remaining_skip > 0 {
            let mut scratch = vec![0u8; remaining_skip.min(0x10000) as usize];
            while remaining_skip > 0 {
                let count = remaining_skip.min(scratch.len() as u64) as usize;
                self.fill(&mut scratch[..count])?;
                remaining_skip -= count as u64;
            }
        }
        self.fill(buffer)
    }
}

impl<S: ByteSource> PatchDecoder<S> {
    fn fill(&mut self, buffer: &mut [u8]) -> Result<()> {
        let mut produced = 0;
        while produced != buffer.len() {
            if self.run > 0 {
                produced += self.step(&mut buffer[produced..])?;
            } else {
                self.advance()?;
            }
        }
        Ok(())
    }
}
