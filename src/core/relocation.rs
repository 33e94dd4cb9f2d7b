//! Relocation resolver
//!
//! Every relocation entry points at eight bytes inside a loaded section that hold a
//! `(section, offset)` reference. Resolution replaces those bytes with the
//! [`ArenaAddress`](crate::arena::ArenaAddress) the reference designates.

use crate::arena::Arena;
use crate::descriptors::SectionReference;
use crate::error::{RpakError, Result};
use tracing::{debug, trace};

/// Rewrite every relocated reference in `arena`
///
/// Must run after all sections are loaded; a second run over the same data would
/// read already-resolved addresses and reject them.
pub fn apply_relocations(arena: &mut Arena, relocations: &[SectionReference]) -> Result<()> {
    debug!("Applying {} relocations", relocations.len());

    for (index, location) in relocations.iter().enumerate() {
        let out_of_bounds = || RpakError::RelocationOutOfBounds {
            index,
            section: location.section,
            offset: location.offset,
        };
        let address = arena.address_of(*location).ok_or_else(out_of_bounds)?;
        let slot = arena
            .bytes(address, SectionReference::SIZE)
            .map_err(|_| out_of_bounds())?;

        let target = SectionReference::from_bytes(slot);
        let resolved =
            arena
                .address_of(target)
                .ok_or(RpakError::RelocationTargetOutOfBounds {
                    index,
                    section: target.section,
                    offset: target.offset,
                })?;

        trace!(
            "{}: {}:0x{:x} -> {}:0x{:x} = {:?}",
            index,
            location.section,
            location.offset,
            target.section,
            target.offset,
            resolved
        );
        arena
            .bytes_mut(address, SectionReference::SIZE)?
            .copy_from_slice(&resolved.raw().to_le_bytes());
    }

    Ok(())
}
