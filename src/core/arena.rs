//! Arena pools holding loaded section data
//!
//! Each archive owns up to four pools. Sections are byte ranges inside them and every
//! resolved reference is an [`ArenaAddress`] (pool + offset) rather than a pointer.

use crate::allocator::{ArenaLayout, SectionRegion};
use crate::bytes::le_u64;
use crate::descriptors::SectionReference;
use crate::error::{RpakError, Result};
use crate::header::NUM_SLOTS;
use serde::{Deserialize, Serialize};
use std::fmt;

const POOL_SHIFT: u32 = 48;
const OFFSET_MASK: u64 = (1 << POOL_SHIFT) - 1;

/// Location inside the arena, stored in place of relocated references
///
/// Encoded as `((pool + 1) << 48) | offset` so that zero stays a null value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArenaAddress(u64);

impl ArenaAddress {
    pub fn new(pool: usize, offset: u64) -> Self {
        ArenaAddress((((pool as u64) + 1) << POOL_SHIFT) | (offset & OFFSET_MASK))
    }

    /// Decode a stored address; `None` for null or foreign values
    pub fn from_raw(raw: u64) -> Option<Self> {
        let pool = raw >> POOL_SHIFT;
        if pool == 0 || pool > NUM_SLOTS as u64 {
            return None;
        }
        Some(ArenaAddress(raw))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn pool(&self) -> usize {
        ((self.0 >> POOL_SHIFT) - 1) as usize
    }

    pub fn offset(&self) -> u64 {
        self.0 & OFFSET_MASK
    }

    pub fn add(&self, delta: u64) -> Self {
        ArenaAddress::new(self.pool(), self.offset().saturating_add(delta).min(OFFSET_MASK))
    }
}

impl fmt::Debug for ArenaAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArenaAddress({}:0x{:x})", self.pool(), self.offset())
    }
}

/// One pool's bytes, starting at an address aligned to the pool's alignment
#[derive(Debug, Default)]
struct AlignedPool {
    buffer: Vec<u8>,
    base: usize,
    len: usize,
}

impl AlignedPool {
    /// Zeroed pool of `size` bytes whose first byte is `alignment`-aligned
    fn allocate(pool: usize, size: u64, alignment: u64) -> Result<Self> {
        let failed = || RpakError::PoolAllocation { pool, size };
        let len = usize::try_from(size).map_err(|_| failed())?;
        let alignment = usize::try_from(alignment).map_err(|_| failed())?.max(1);
        let padded = len.checked_add(alignment - 1).ok_or_else(failed)?;

        let mut buffer = Vec::new();
        buffer.try_reserve_exact(padded).map_err(|_| failed())?;
        buffer.resize(padded, 0);

        // The buffer never grows again, so its address is stable
        let base = buffer.as_ptr().align_offset(alignment);
        if base >= alignment {
            return Err(failed());
        }
        Ok(AlignedPool { buffer, base, len })
    }

    fn as_slice(&self) -> &[u8] {
        &self.buffer[self.base..self.base + self.len]
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buffer[self.base..self.base + self.len]
    }
}

/// Memory pools of one loaded archive
#[derive(Debug, Default)]
pub struct Arena {
    pools: [AlignedPool; NUM_SLOTS],
    sections: Vec<SectionRegion>,
}

impl Arena {
    /// Allocate zeroed pools sized and aligned by `layout`
    pub fn new(layout: &ArenaLayout) -> Result<Self> {
        let mut arena = Arena::default();
        for (pool, extent) in layout.pools().iter().enumerate() {
            if extent.size == 0 {
                continue;
            }
            arena.pools[pool] = AlignedPool::allocate(pool, extent.size, extent.alignment)?;
        }
        arena.sections = layout.sections().to_vec();
        Ok(arena)
    }

    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }

    pub fn pool(&self, pool: usize) -> &[u8] {
        self.pools[pool].as_slice()
    }

    pub fn section_region(&self, section: usize) -> Option<SectionRegion> {
        self.sections.get(section).copied()
    }

    pub fn section(&self, section: usize) -> &[u8] {
        let region = self.sections[section];
        &self.pools[region.pool].as_slice()[region.offset as usize..region.end() as usize]
    }

    pub fn section_mut(&mut self, section: usize) -> &mut [u8] {
        let region = self.sections[section];
        &mut self.pools[region.pool].as_mut_slice()[region.offset as usize..region.end() as usize]
    }

    /// Whether `reference` names an existing section and an offset inside it
    pub fn is_valid(&self, reference: SectionReference) -> bool {
        self.sections
            .get(reference.section as usize)
            .map_or(false, |region| (reference.offset as u64) < region.size)
    }

    /// Arena address of a valid reference
    pub fn address_of(&self, reference: SectionReference) -> Option<ArenaAddress> {
        if !self.is_valid(reference) {
            return None;
        }
        let region = self.sections[reference.section as usize];
        Some(ArenaAddress::new(region.pool, region.offset + reference.offset as u64))
    }

    /// `len` bytes at `address`
    pub fn bytes(&self, address: ArenaAddress, len: usize) -> Result<&[u8]> {
        let pool = self.pools[address.pool()].as_slice();
        let start = address.offset() as usize;
        start
            .checked_add(len)
            .filter(|end| *end <= pool.len())
            .map(|end| &pool[start..end])
            .ok_or(RpakError::MetadataOutOfBounds {
                offset: start,
                len,
                available: pool.len().saturating_sub(start),
            })
    }

    pub fn bytes_mut(&mut self, address: ArenaAddress, len: usize) -> Result<&mut [u8]> {
        let pool = self.pools[address.pool()].as_mut_slice();
        let start = address.offset() as usize;
        let available = pool.len().saturating_sub(start);
        if len > available {
            return Err(RpakError::MetadataOutOfBounds {
                offset: start,
                len,
                available,
            });
        }
        Ok(&mut pool[start..start + len])
    }

    /// Follow a relocated pointer stored at `address`
    pub fn read_pointer(&self, address: ArenaAddress) -> Result<Option<ArenaAddress>> {
        let raw = le_u64(self.bytes(address, 8)?, 0);
        Ok(ArenaAddress::from_raw(raw))
    }

    /// NUL-terminated string starting at `address`
    pub fn c_str(&self, address: ArenaAddress) -> Result<String> {
        let pool = self.pools[address.pool()].as_slice();
        let start = address.offset() as usize;
        let tail = pool.get(start..).ok_or(RpakError::MetadataOutOfBounds {
            offset: start,
            len: 1,
            available: 0,
        })?;
        let len = tail.iter().position(|b| *b == 0).unwrap_or(tail.len());
        Ok(String::from_utf8_lossy(&tail[..len]).into_owned())
    }
}
