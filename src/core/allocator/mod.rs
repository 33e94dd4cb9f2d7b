//! Arena layout planning
//!
//! Computes where every slot descriptor and section lands in the four arena pools:
//! - Slot descriptors are packed per pool in descriptor order; a pool's alignment is
//!   the largest alignment of its members
//! - Sections are packed inside their slot descriptor's reservation, in section order

pub mod bump;

use crate::descriptors::{SectionDescriptor, SlotDescriptor};
use crate::error::{RpakError, Result};
use crate::header::NUM_SLOTS;
use bump::BumpRegion;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Round `value` up to a multiple of the power-of-two `alignment`
#[inline]
pub fn align_up(value: u64, alignment: u64) -> u64 {
    (value + alignment - 1) & !(alignment - 1)
}

/// Validate a stored alignment; zero is treated as byte alignment
fn checked_alignment(what: &'static str, index: usize, alignment: u32) -> Result<u64> {
    match alignment {
        0 => Ok(1),
        a if a.is_power_of_two() => Ok(a as u64),
        _ => Err(RpakError::InvalidAlignment {
            what,
            index,
            alignment,
        }),
    }
}

/// Size and alignment of one arena pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolExtent {
    pub size: u64,
    pub alignment: u64,
}

/// Where one slot descriptor's reservation lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRegion {
    pub pool: usize,
    pub offset: u64,
    pub size: u64,
}

/// Where one section lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRegion {
    pub pool: usize,
    pub offset: u64,
    pub size: u64,
}

impl SectionRegion {
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Planned placement of all slots and sections of one archive
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArenaLayout {
    pools: [PoolExtent; NUM_SLOTS],
    slots: Vec<SlotRegion>,
    sections: Vec<SectionRegion>,
}

impl ArenaLayout {
    /// Pack slot descriptors into their pools
    pub fn plan_slots(descriptors: &[SlotDescriptor]) -> Result<Self> {
        let mut pools = [BumpRegion::unbounded(); NUM_SLOTS];
        let mut slots = Vec::with_capacity(descriptors.len());

        debug!("====== Slot Descriptors ======");
        for (index, descriptor) in descriptors.iter().enumerate() {
            let alignment = checked_alignment("slot descriptor", index, descriptor.alignment)?;
            let pool = descriptor.pool();
            let offset = pools[pool]
                .allocate(descriptor.size, alignment)
                .map_err(|end| RpakError::SectionOverflow {
                    section: index,
                    end,
                    limit: u64::MAX,
                })?;

            debug!(
                "{}: SlotNum: {}, Alignment: 0x{:x}, Size: 0x{:x}, Offset: 0x{:x}",
                index, pool, alignment, descriptor.size, offset
            );
            slots.push(SlotRegion {
                pool,
                offset,
                size: descriptor.size,
            });
        }

        let mut extents = [PoolExtent::default(); NUM_SLOTS];
        debug!("====== Slot Totals ======");
        for (pool, region) in pools.iter().enumerate() {
            extents[pool] = PoolExtent {
                size: region.used(),
                alignment: region.max_alignment(),
            };
            debug!(
                "{}: Size: 0x{:x}, Alignment: 0x{:x}",
                pool,
                region.used(),
                region.max_alignment()
            );
        }

        Ok(ArenaLayout {
            pools: extents,
            slots,
            sections: Vec::new(),
        })
    }

    /// Pack sections inside their slot descriptor's reservation
    pub fn place_sections(&mut self, descriptors: &[SectionDescriptor]) -> Result<()> {
        let mut regions: Vec<BumpRegion> = self
            .slots
            .iter()
            .map(|slot| BumpRegion::new(slot.offset, slot.size))
            .collect();

        debug!("====== Section Descriptors ======");
        let mut sections = Vec::with_capacity(descriptors.len());
        for (index, descriptor) in descriptors.iter().enumerate() {
            let slot_index = descriptor.slot_descriptor as usize;
            let slot = *self
                .slots
                .get(slot_index)
                .ok_or(RpakError::InvalidSlotDescriptor {
                    index: descriptor.slot_descriptor,
                    count: self.slots.len(),
                })?;
            let alignment = checked_alignment("section", index, descriptor.alignment)?;

            let region = &mut regions[slot_index];
            let offset = region
                .allocate(descriptor.size as u64, alignment)
                .map_err(|end| RpakError::SectionOverflow {
                    section: index,
                    end,
                    limit: slot.offset.saturating_add(slot.size),
                })?;

            debug!(
                "{}: SlotDescIdx: {}, Alignment: 0x{:x}, Size: 0x{:x}, Offset: 0x{:x}",
                index, slot_index, alignment, descriptor.size, offset
            );
            sections.push(SectionRegion {
                pool: slot.pool,
                offset,
                size: descriptor.size as u64,
            });
        }

        self.sections = sections;
        Ok(())
    }

    pub fn pools(&self) -> &[PoolExtent; NUM_SLOTS] {
        &self.pools
    }

    pub fn slots(&self) -> &[SlotRegion] {
        &self.slots
    }

    pub fn sections(&self) -> &[SectionRegion] {
        &self.sections
    }
}
