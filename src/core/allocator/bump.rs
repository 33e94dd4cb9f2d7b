//! Bump allocation within an extent
//!
//! Slot descriptors are packed into their pool and sections into their slot
//! descriptor's extent with the same rule: advance a cursor to the requested
//! alignment, hand out the offset, move past the allocation.

use super::align_up;

/// A contiguous byte range handing out aligned offsets from its start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BumpRegion {
    /// First byte of the extent
    pub start: u64,
    /// Number of bytes the extent covers
    pub length: u64,
    cursor: u64,
    max_alignment: u64,
}

impl BumpRegion {
    pub fn new(start: u64, length: u64) -> Self {
        BumpRegion {
            start,
            length,
            cursor: start,
            max_alignment: 1,
        }
    }

    /// Extent covering a whole pool, which grows with its slot descriptors
    pub fn unbounded() -> Self {
        BumpRegion::new(0, u64::MAX)
    }

    fn end(&self) -> u64 {
        self.start.saturating_add(self.length)
    }

    /// Reserve `size` bytes at the next `alignment` boundary
    ///
    /// Returns the offset, or `Err(end)` with the would-be end offset when the
    /// extent is exceeded.
    pub fn allocate(&mut self, size: u64, alignment: u64) -> std::result::Result<u64, u64> {
        if self.cursor.checked_add(alignment - 1).is_none() {
            return Err(u64::MAX);
        }
        let offset = align_up(self.cursor, alignment);
        let end = offset.checked_add(size).ok_or(u64::MAX)?;
        if end > self.end() {
            return Err(end);
        }

        self.cursor = end;
        self.max_alignment = self.max_alignment.max(alignment);
        Ok(offset)
    }

    /// End of the last allocation
    pub fn used(&self) -> u64 {
        self.cursor
    }

    /// Largest alignment requested so far
    pub fn max_alignment(&self) -> u64 {
        self.max_alignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_packing() {
        let mut region = BumpRegion::unbounded();
        assert_eq!(region.allocate(3, 1), Ok(0));
        assert_eq!(region.allocate(8, 8), Ok(8));
        assert_eq!(region.allocate(1, 4), Ok(16));
        assert_eq!(region.used(), 17);
        assert_eq!(region.max_alignment(), 8);
    }

    #[test]
    fn test_bounded_overflow() {
        let mut region = BumpRegion::new(0x100, 0x20);
        assert_eq!(region.allocate(0x10, 0x10), Ok(0x100));
        assert_eq!(region.allocate(0x11, 1), Err(0x121));
        // A failed allocation leaves the cursor untouched
        assert_eq!(region.allocate(0x10, 1), Ok(0x110));
        assert_eq!(region.used(), region.start + region.length);
    }

    #[test]
    fn test_extent_ending_at_address_space_limit() {
        let mut region = BumpRegion::new(u64::MAX - 4, 0x10);
        assert_eq!(region.allocate(4, 1), Ok(u64::MAX - 4));
        assert_eq!(region.allocate(1, 8), Err(u64::MAX));
    }
}
