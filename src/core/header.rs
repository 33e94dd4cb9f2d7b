use crate::bytes::{le_u16, le_u32, le_u64, put_u16, put_u32, put_u64};
use crate::error::{RpakError, Result};
use serde::{Deserialize, Serialize};

/// "RPak" read as a little-endian u32
pub const RPAK_SIGNATURE: u32 = 0x6B61_5052;

/// Flag bit set when the archive body is bulk compressed
pub const FLAG_COMPRESSED: u16 = 0x100;

/// Number of memory pools selectable by a slot descriptor
pub const NUM_SLOTS: usize = 4;

/// Size of one linked pak size record
pub const LINKED_PAK_SIZE_LEN: usize = 16;

/// Game generation an archive was built for
///
/// The two generations share the overall layout but differ in header and asset
/// descriptor sizes, and Apex carries a second starpak path block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Titanfall 2, format version 7
    #[default]
    Titanfall2,
    /// Apex Legends, format version 8
    Apex,
}

/// Byte offsets of the header fields for one variant
struct HeaderLayout {
    size: usize,
    compressed_size: usize,
    decompressed_size: usize,
    starpak_block_size: usize,
    full_starpak_block_size: Option<usize>,
    num_slot_descriptors: usize,
    num_sections: usize,
    num_links: usize,
    num_relocations: usize,
    num_assets: usize,
    extra_counts: usize,
}

const TITANFALL2_LAYOUT: HeaderLayout = HeaderLayout {
    size: 0x58,
    compressed_size: 24,
    decompressed_size: 40,
    starpak_block_size: 56,
    full_starpak_block_size: None,
    num_slot_descriptors: 58,
    num_sections: 60,
    num_links: 62,
    num_relocations: 64,
    num_assets: 68,
    extra_counts: 72,
};

const APEX_LAYOUT: HeaderLayout = HeaderLayout {
    size: 0x80,
    compressed_size: 24,
    decompressed_size: 48,
    starpak_block_size: 72,
    full_starpak_block_size: Some(74),
    num_slot_descriptors: 76,
    num_sections: 78,
    num_links: 80,
    num_relocations: 84,
    num_assets: 88,
    extra_counts: 92,
};

impl Variant {
    fn layout(self) -> &'static HeaderLayout {
        match self {
            Variant::Titanfall2 => &TITANFALL2_LAYOUT,
            Variant::Apex => &APEX_LAYOUT,
        }
    }

    /// Size of the outer header in bytes
    pub fn header_size(self) -> usize {
        self.layout().size
    }

    /// The only format version accepted for this variant
    pub fn expected_version(self) -> u16 {
        match self {
            Variant::Titanfall2 => 7,
            Variant::Apex => 8,
        }
    }

    /// Size of one asset descriptor record
    pub fn asset_descriptor_size(self) -> usize {
        match self {
            Variant::Titanfall2 => 72,
            Variant::Apex => 80,
        }
    }
}

/// RPak outer header
///
/// Holds the table counts that drive the rest of the structural parse. Bytes the
/// loader does not interpret are kept in `raw` so the header re-serializes exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHeader {
    pub variant: Variant,
    pub signature: u32,
    pub version: u16,
    pub flags: u16,
    pub compressed_size: u64,
    pub decompressed_size: u64,
    pub starpak_block_size: u16,
    /// Apex only; always zero for Titanfall 2
    pub full_starpak_block_size: u16,
    pub num_slot_descriptors: u16,
    pub num_sections: u16,
    pub num_links: u16,
    pub num_relocations: u32,
    pub num_assets: u32,
    pub num_extra_8: u32,
    pub num_extra_4a: u32,
    pub num_extra_4b: u32,
    pub num_extra_1: u32,
    raw: Vec<u8>,
}

impl ArchiveHeader {
    /// Create an empty header for the given variant
    pub fn new(variant: Variant) -> Self {
        ArchiveHeader {
            variant,
            signature: RPAK_SIGNATURE,
            version: variant.expected_version(),
            flags: 0,
            compressed_size: 0,
            decompressed_size: variant.header_size() as u64,
            starpak_block_size: 0,
            full_starpak_block_size: 0,
            num_slot_descriptors: 0,
            num_sections: 0,
            num_links: 0,
            num_relocations: 0,
            num_assets: 0,
            num_extra_8: 0,
            num_extra_4a: 0,
            num_extra_4b: 0,
            num_extra_1: 0,
            raw: vec![0; variant.header_size()],
        }
    }

    /// Validate signature and version
    pub fn validate(&self) -> Result<()> {
        if self.signature != RPAK_SIGNATURE {
            return Err(RpakError::InvalidSignature(self.signature));
        }

        let expected = self.variant.expected_version();
        if self.version != expected {
            return Err(RpakError::UnsupportedVersion {
                found: self.version,
                expected,
            });
        }

        Ok(())
    }

    /// Whether the body is bulk compressed
    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }

    /// Size of the trailing extra header block
    pub fn extra_header_size(&self) -> u64 {
        self.num_extra_8 as u64 * 8
            + self.num_extra_4a as u64 * 4
            + self.num_extra_4b as u64 * 4
            + self.num_extra_1 as u64
    }

    /// Serialize header to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let layout = self.variant.layout();
        let mut bytes = self.raw.clone();
        bytes.resize(layout.size, 0);

        put_u32(&mut bytes, 0, self.signature);
        put_u16(&mut bytes, 4, self.version);
        put_u16(&mut bytes, 6, self.flags);
        put_u64(&mut bytes, layout.compressed_size, self.compressed_size);
        put_u64(&mut bytes, layout.decompressed_size, self.decompressed_size);
        put_u16(&mut bytes, layout.starpak_block_size, self.starpak_block_size);
        if let Some(offset) = layout.full_starpak_block_size {
            put_u16(&mut bytes, offset, self.full_starpak_block_size);
        }
        put_u16(&mut bytes, layout.num_slot_descriptors, self.num_slot_descriptors);
        put_u16(&mut bytes, layout.num_sections, self.num_sections);
        put_u16(&mut bytes, layout.num_links, self.num_links);
        put_u32(&mut bytes, layout.num_relocations, self.num_relocations);
        put_u32(&mut bytes, layout.num_assets, self.num_assets);
        put_u32(&mut bytes, layout.extra_counts, self.num_extra_8);
        put_u32(&mut bytes, layout.extra_counts + 4, self.num_extra_4a);
        put_u32(&mut bytes, layout.extra_counts + 8, self.num_extra_4b);
        put_u32(&mut bytes, layout.extra_counts + 12, self.num_extra_1);

        bytes
    }

    /// Deserialize header from bytes and validate it
    pub fn from_bytes(bytes: &[u8], variant: Variant) -> Result<Self> {
        let layout = variant.layout();
        if bytes.len() < layout.size {
            return Err(RpakError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Insufficient bytes for header",
            )));
        }

        let header = ArchiveHeader {
            variant,
            signature: le_u32(bytes, 0),
            version: le_u16(bytes, 4),
            flags: le_u16(bytes, 6),
            compressed_size: le_u64(bytes, layout.compressed_size),
            decompressed_size: le_u64(bytes, layout.decompressed_size),
            starpak_block_size: le_u16(bytes, layout.starpak_block_size),
            full_starpak_block_size: layout
                .full_starpak_block_size
                .map(|offset| le_u16(bytes, offset))
                .unwrap_or(0),
            num_slot_descriptors: le_u16(bytes, layout.num_slot_descriptors),
            num_sections: le_u16(bytes, layout.num_sections),
            num_links: le_u16(bytes, layout.num_links),
            num_relocations: le_u32(bytes, layout.num_relocations),
            num_assets: le_u32(bytes, layout.num_assets),
            num_extra_8: le_u32(bytes, layout.extra_counts),
            num_extra_4a: le_u32(bytes, layout.extra_counts + 4),
            num_extra_4b: le_u32(bytes, layout.extra_counts + 8),
            num_extra_1: le_u32(bytes, layout.extra_counts + 12),
            raw: bytes[..layout.size].to_vec(),
        };

        header.validate()?;

        Ok(header)
    }
}

/// On-disk and decompressed size of one linked pak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinkedPakSize {
    pub size_on_disk: u64,
    pub decompressed_size: u64,
}

impl LinkedPakSize {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        LinkedPakSize {
            size_on_disk: le_u64(bytes, 0),
            decompressed_size: le_u64(bytes, 8),
        }
    }
}
