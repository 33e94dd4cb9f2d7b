//! Fixed-size table records: slots, sections, references and asset descriptors

use crate::bytes::{le_u16, le_u32, le_u64, put_u16, put_u32, put_u64};
use crate::header::{Variant, NUM_SLOTS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserves a sub-region of one of the arena pools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotDescriptor {
    /// Pool selector; only the low bits are meaningful
    pub slot: u32,
    pub alignment: u32,
    pub size: u64,
}

impl SlotDescriptor {
    pub const SIZE: usize = 16;

    pub fn new(slot: u32, alignment: u32, size: u64) -> Self {
        SlotDescriptor {
            slot,
            alignment,
            size,
        }
    }

    /// Arena pool this descriptor reserves space in
    pub fn pool(&self) -> usize {
        (self.slot as usize) & (NUM_SLOTS - 1)
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        SlotDescriptor {
            slot: le_u32(bytes, 0),
            alignment: le_u32(bytes, 4),
            size: le_u64(bytes, 8),
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        put_u32(&mut bytes, 0, self.slot);
        put_u32(&mut bytes, 4, self.alignment);
        put_u64(&mut bytes, 8, self.size);
        bytes
    }
}

/// A contiguous region of asset data placed inside a slot descriptor's reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionDescriptor {
    pub slot_descriptor: u32,
    pub alignment: u32,
    pub size: u32,
}

impl SectionDescriptor {
    pub const SIZE: usize = 12;

    pub fn new(slot_descriptor: u32, alignment: u32, size: u32) -> Self {
        SectionDescriptor {
            slot_descriptor,
            alignment,
            size,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        SectionDescriptor {
            slot_descriptor: le_u32(bytes, 0),
            alignment: le_u32(bytes, 4),
            size: le_u32(bytes, 8),
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        put_u32(&mut bytes, 0, self.slot_descriptor);
        put_u32(&mut bytes, 4, self.alignment);
        put_u32(&mut bytes, 8, self.size);
        bytes
    }
}

/// `(section, offset)` pair, the format's only addressing primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SectionReference {
    pub section: u32,
    pub offset: u32,
}

impl SectionReference {
    pub const SIZE: usize = 8;

    pub fn new(section: u32, offset: u32) -> Self {
        SectionReference { section, offset }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        SectionReference {
            section: le_u32(bytes, 0),
            offset: le_u32(bytes, 4),
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        put_u32(&mut bytes, 0, self.section);
        put_u32(&mut bytes, 4, self.offset);
        bytes
    }
}

/// Four-character asset type tag, stored as a little-endian u32
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetType(pub u32);

impl AssetType {
    pub const PATCH: AssetType = AssetType::from_tag(b"Ptch");
    pub const TEXTURE: AssetType = AssetType::from_tag(b"txtr");
    pub const SHADER: AssetType = AssetType::from_tag(b"shdr");
    pub const MATERIAL: AssetType = AssetType::from_tag(b"matl");
    pub const DATATABLE: AssetType = AssetType::from_tag(b"dtbl");
    pub const SHADER_SET: AssetType = AssetType::from_tag(b"shds");
    pub const LCD_SCREEN_EFFECT: AssetType = AssetType::from_tag(b"rlcd");
    pub const RSON: AssetType = AssetType::from_tag(b"rson");
    pub const UI_IMAGE_ATLAS: AssetType = AssetType::from_tag(b"uimg");
    pub const PARTICLE_SCRIPT: AssetType = AssetType::from_tag(b"rpsk");
    pub const ANIMATION_RECORDING: AssetType = AssetType::from_tag(b"anir");
    pub const UI: AssetType = AssetType::from_tag(b"ui\0\0");
    pub const UI_FONT_ATLAS: AssetType = AssetType::from_tag(b"font");

    pub const fn from_tag(tag: &[u8; 4]) -> Self {
        AssetType(u32::from_le_bytes(*tag))
    }

    pub fn tag(&self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.tag().iter().take_while(|b| **b != 0) {
            if byte.is_ascii_graphic() {
                write!(f, "{}", *byte as char)?;
            } else {
                write!(f, "\\x{:02x}", byte)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetType({})", self)
    }
}

impl From<&[u8; 4]> for AssetType {
    fn from(tag: &[u8; 4]) -> Self {
        AssetType::from_tag(tag)
    }
}

/// One entry of the asset table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// Content hash of the asset's logical name
    pub hash: u64,
    pub metadata: SectionReference,
    /// Bulk payload; an invalid reference means the asset has none
    pub data: SectionReference,
    /// Sections that must be loaded before the asset can be interpreted
    pub num_required_sections: u16,
    pub extra_index: u32,
    pub extra_start_index: u32,
    pub extra_count: u32,
    pub metadata_size: u32,
    pub metadata_alignment: u32,
    pub asset_type: AssetType,
}

impl AssetDescriptor {
    pub fn new(hash: u64, asset_type: AssetType, metadata: SectionReference) -> Self {
        AssetDescriptor {
            hash,
            metadata,
            data: SectionReference::new(u32::MAX, 0),
            num_required_sections: 0,
            extra_index: 0,
            extra_start_index: 0,
            extra_count: 0,
            metadata_size: 0,
            metadata_alignment: 8,
            asset_type,
        }
    }

    /// Offset of the fields following the variant-sized unknown block
    fn tail_offset(variant: Variant) -> usize {
        match variant {
            Variant::Titanfall2 => 40,
            Variant::Apex => 48,
        }
    }

    pub fn from_bytes(bytes: &[u8], variant: Variant) -> Self {
        let tail = Self::tail_offset(variant);
        AssetDescriptor {
            hash: le_u64(bytes, 0),
            metadata: SectionReference::from_bytes(&bytes[16..24]),
            data: SectionReference::from_bytes(&bytes[24..32]),
            num_required_sections: le_u16(bytes, tail),
            extra_index: le_u32(bytes, tail + 8),
            extra_start_index: le_u32(bytes, tail + 12),
            extra_count: le_u32(bytes, tail + 16),
            metadata_size: le_u32(bytes, tail + 20),
            metadata_alignment: le_u32(bytes, tail + 24),
            asset_type: AssetType(le_u32(bytes, tail + 28)),
        }
    }

    pub fn to_bytes(&self, variant: Variant) -> Vec<u8> {
        let tail = Self::tail_offset(variant);
        let mut bytes = vec![0u8; variant.asset_descriptor_size()];
        put_u64(&mut bytes, 0, self.hash);
        bytes[16..24].copy_from_slice(&self.metadata.to_bytes());
        bytes[24..32].copy_from_slice(&self.data.to_bytes());
        put_u16(&mut bytes, tail, self.num_required_sections);
        put_u32(&mut bytes, tail + 8, self.extra_index);
        put_u32(&mut bytes, tail + 12, self.extra_start_index);
        put_u32(&mut bytes, tail + 16, self.extra_count);
        put_u32(&mut bytes, tail + 20, self.metadata_size);
        put_u32(&mut bytes, tail + 24, self.metadata_alignment);
        put_u32(&mut bytes, tail + 28, self.asset_type.0);
        bytes
    }
}

/// Split a table blob into fixed-size records
pub(crate) fn parse_records<T>(bytes: &[u8], record_size: usize, parse: impl Fn(&[u8]) -> T) -> Vec<T> {
    bytes.chunks_exact(record_size).map(parse).collect()
}
