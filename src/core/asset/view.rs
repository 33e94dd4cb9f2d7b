//! Bounded, borrowed access to resolved asset memory

use crate::arena::{Arena, ArenaAddress};
use crate::bytes::{le_u16, le_u32, le_u64};
use crate::error::Result;

/// A position inside a loaded archive's arena
///
/// Every access is bounds-checked against the owning pool; views cannot outlive
/// the archive they were created from.
#[derive(Clone, Copy)]
pub struct ArenaView<'a> {
    arena: &'a Arena,
    address: ArenaAddress,
}

impl<'a> ArenaView<'a> {
    pub fn new(arena: &'a Arena, address: ArenaAddress) -> Self {
        ArenaView { arena, address }
    }

    pub fn address(&self) -> ArenaAddress {
        self.address
    }

    /// View `offset` bytes further on
    pub fn at(&self, offset: u64) -> ArenaView<'a> {
        ArenaView::new(self.arena, self.address.add(offset))
    }

    pub fn bytes(&self, offset: u64, len: usize) -> Result<&'a [u8]> {
        self.arena.bytes(self.address.add(offset), len)
    }

    pub fn u8_at(&self, offset: u64) -> Result<u8> {
        Ok(self.bytes(offset, 1)?[0])
    }

    pub fn u16_at(&self, offset: u64) -> Result<u16> {
        Ok(le_u16(self.bytes(offset, 2)?, 0))
    }

    pub fn u32_at(&self, offset: u64) -> Result<u32> {
        Ok(le_u32(self.bytes(offset, 4)?, 0))
    }

    pub fn i32_at(&self, offset: u64) -> Result<i32> {
        Ok(self.u32_at(offset)? as i32)
    }

    pub fn f32_at(&self, offset: u64) -> Result<f32> {
        Ok(f32::from_bits(self.u32_at(offset)?))
    }

    pub fn u64_at(&self, offset: u64) -> Result<u64> {
        Ok(le_u64(self.bytes(offset, 8)?, 0))
    }

    /// Follow the relocated pointer stored at `offset`
    pub fn pointer_at(&self, offset: u64) -> Result<Option<ArenaView<'a>>> {
        Ok(self
            .arena
            .read_pointer(self.address.add(offset))?
            .map(|address| ArenaView::new(self.arena, address)))
    }

    /// NUL-terminated string starting here
    pub fn c_str(&self) -> Result<String> {
        self.arena.c_str(self.address)
    }

    /// String behind the pointer stored at `offset`, if the pointer is set
    pub fn string_at(&self, offset: u64) -> Result<Option<String>> {
        match self.pointer_at(offset)? {
            Some(target) => Ok(Some(target.c_str()?)),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for ArenaView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArenaView")
            .field("address", &self.address)
            .finish()
    }
}
