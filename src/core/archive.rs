//! Structural parse of one archive and its linked revisions
//!
//! Reads the header, then everything else through the patch decoder:
//! - link table (linked archives are appended to the byte source)
//! - starpak path blocks
//! - slot, section, relocation and asset tables, extra header
//! - patch data block (installs the decode program)
//! - section payloads, starting at the rotation offset
//!
//! Relocations are resolved once every section is in place.

use crate::allocator::ArenaLayout;
use crate::arena::Arena;
use crate::asset::{display_name, Asset, AssetParts, AssetRegistry, ArenaView};
use crate::chain::{ByteSource, ChainedReader};
use crate::descriptors::{
    parse_records, AssetDescriptor, AssetType, SectionDescriptor, SectionReference, SlotDescriptor,
};
use crate::error::{RpakError, Result};
use crate::header::{ArchiveHeader, LinkedPakSize, Variant, LINKED_PAK_SIZE_LEN};
use crate::io::{ArchiveOpener, DecompressedReader};
use crate::names::{hash_to_string, KnownAssets};
use crate::patch::{PatchDecoder, PatchProgram, PatchTableBuilder};
use crate::relocation::apply_relocations;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const HOTSWAP_MARKER: &str = "_hotswap.starpak";

/// Split a NUL-separated path block; an empty entry ends it
fn parse_path_block(block: &[u8]) -> Result<Vec<String>> {
    let mut paths = Vec::new();
    for entry in block.split(|b| *b == 0) {
        if entry.is_empty() {
            break;
        }
        let path = String::from_utf8_lossy(entry).into_owned();
        if path.contains(HOTSWAP_MARKER) {
            return Err(RpakError::HotswapStarpak(path));
        }
        debug!("Starpak: {}", path);
        paths.push(path);
    }
    Ok(paths)
}

fn read_table<T>(
    source: &mut impl ByteSource,
    count: usize,
    record_size: usize,
    parse: impl Fn(&[u8]) -> T,
) -> Result<Vec<T>> {
    let bytes = source.read_vec(count * record_size)?;
    Ok(parse_records(&bytes, record_size, parse))
}

/// Everything needed to parse archives besides the bytes themselves
#[derive(Clone, Copy)]
pub struct ArchiveParser<'e> {
    pub variant: Variant,
    pub opener: &'e dyn ArchiveOpener,
    /// Required only for archives with linked revisions
    pub table_builder: Option<&'e dyn PatchTableBuilder>,
}

impl<'e> ArchiveParser<'e> {
    pub fn new(variant: Variant, opener: &'e dyn ArchiveOpener) -> Self {
        ArchiveParser {
            variant,
            opener,
            table_builder: None,
        }
    }

    pub fn with_table_builder(mut self, builder: &'e dyn PatchTableBuilder) -> Self {
        self.table_builder = Some(builder);
        self
    }

    /// Open revision 0 of `name` and parse it
    pub fn load(&self, name: &str) -> Result<RPakFile> {
        let base = self.opener.open(name, 0)?;
        self.load_from(name, base)
    }

    /// Parse an already opened base archive; linked revisions still come from the opener
    pub fn load_from(&self, name: &str, base: Box<dyn DecompressedReader>) -> Result<RPakFile> {
        info!("Loading {} ({} bytes)", base.name(), base.size());
        let header_size = self.variant.header_size();

        let mut chain = ChainedReader::new(base)?;
        let header = ArchiveHeader::from_bytes(&chain.read_vec(header_size)?, self.variant)?;
        debug!(
            "Header: version {}, flags 0x{:x}, compressed 0x{:x}, decompressed 0x{:x}",
            header.version, header.flags, header.compressed_size, header.decompressed_size
        );
        debug!(
            "Header: {} slots, {} sections, {} links, {} relocations, {} assets",
            header.num_slot_descriptors,
            header.num_sections,
            header.num_links,
            header.num_relocations,
            header.num_assets
        );

        let num_links = header.num_links as usize;
        let table_builder = match (num_links, self.table_builder) {
            (0, _) => None,
            (_, Some(builder)) => Some(builder),
            (_, None) => return Err(RpakError::PatchTablesUnavailable(header.num_links)),
        };

        let mut initial_run = header.decompressed_size.saturating_sub(header_size as u64);
        if num_links == 0 {
            initial_run += 1;
        }
        let mut decoder = PatchDecoder::new(chain, initial_run);

        let mut patch_block_size = 0;
        let mut starting_section = 0;
        let mut linked_sizes = Vec::new();
        let mut linked_numbers = Vec::new();
        if num_links > 0 {
            patch_block_size = decoder.read_u32()?;
            starting_section = decoder.read_u32()?;
            linked_sizes = read_table(&mut decoder, num_links, LINKED_PAK_SIZE_LEN, LinkedPakSize::from_bytes)?;
            for _ in 0..num_links {
                linked_numbers.push(decoder.read_u16()?);
            }

            for (number, size) in linked_numbers.iter().zip(&linked_sizes) {
                debug!(
                    "Linked pak {}: 0x{:x} on disk, 0x{:x} decompressed",
                    number, size.size_on_disk, size.decompressed_size
                );
                let reader = self.opener.open(name, *number)?;
                decoder.source_mut().push(reader, Some(header_size))?;
            }
        }

        let starpak_paths =
            parse_path_block(&decoder.read_vec(header.starpak_block_size as usize)?)?;
        let full_starpak_paths =
            parse_path_block(&decoder.read_vec(header.full_starpak_block_size as usize)?)?;

        if header.num_slot_descriptors == 0 {
            return Err(RpakError::EmptyTable("slot descriptors"));
        }
        let slots = read_table(
            &mut decoder,
            header.num_slot_descriptors as usize,
            SlotDescriptor::SIZE,
            SlotDescriptor::from_bytes,
        )?;
        let mut layout = ArenaLayout::plan_slots(&slots)?;

        let sections = read_table(
            &mut decoder,
            header.num_sections as usize,
            SectionDescriptor::SIZE,
            SectionDescriptor::from_bytes,
        )?;
        layout.place_sections(&sections)?;
        let mut arena = Arena::new(&layout)?;

        let relocations = read_table(
            &mut decoder,
            header.num_relocations as usize,
            SectionReference::SIZE,
            SectionReference::from_bytes,
        )?;

        let variant = self.variant;
        let assets = read_table(
            &mut decoder,
            header.num_assets as usize,
            variant.asset_descriptor_size(),
            |bytes| AssetDescriptor::from_bytes(bytes, variant),
        )?;
        let mut totals: BTreeMap<AssetType, usize> = BTreeMap::new();
        for asset in &assets {
            *totals.entry(asset.asset_type).or_default() += 1;
        }
        for (asset_type, count) in &totals {
            info!("{}: {} assets", asset_type, count);
        }

        let extra_header = decoder.read_vec(header.extra_header_size() as usize)?;

        if let Some(builder) = table_builder {
            let block = decoder.read_vec(patch_block_size as usize)?;
            decoder.install(PatchProgram::from_block(&block, builder)?);
        }

        let num_sections = sections.len();
        if num_sections > 0 && starting_section as usize >= num_sections {
            return Err(RpakError::InvalidSectionRotation {
                offset: starting_section,
                count: num_sections,
            });
        }
        for i in 0..num_sections {
            let mut section = i + starting_section as usize;
            if section >= num_sections {
                section -= num_sections;
            }
            if sections[section].size == 0 {
                continue;
            }
            debug!("Reading section {} (0x{:x} bytes)", section, sections[section].size);
            decoder.read_data(arena.section_mut(section), 0)?;
        }

        apply_relocations(&mut arena, &relocations)?;
        debug!("{} bytes left in input", decoder.into_inner().remaining());

        Ok(RPakFile {
            name: name.to_string(),
            header,
            linked_sizes,
            linked_numbers,
            starpak_paths,
            full_starpak_paths,
            slots,
            sections,
            relocations,
            assets,
            extra_header,
            starting_section,
            arena,
        })
    }
}

/// Listing entry for one asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSummary {
    pub index: usize,
    pub hash: String,
    pub asset_type: String,
    pub name: String,
    pub metadata_size: u32,
    pub has_data: bool,
    /// Whether a view is registered for the type
    pub registered: bool,
}

/// A fully loaded archive
///
/// Owns the arena; asset views borrow from it.
#[derive(Debug)]
pub struct RPakFile {
    name: String,
    header: ArchiveHeader,
    linked_sizes: Vec<LinkedPakSize>,
    linked_numbers: Vec<u16>,
    starpak_paths: Vec<String>,
    full_starpak_paths: Vec<String>,
    slots: Vec<SlotDescriptor>,
    sections: Vec<SectionDescriptor>,
    relocations: Vec<SectionReference>,
    assets: Vec<AssetDescriptor>,
    extra_header: Vec<u8>,
    starting_section: u32,
    arena: Arena,
}

impl RPakFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    pub fn variant(&self) -> Variant {
        self.header.variant
    }

    pub fn linked_sizes(&self) -> &[LinkedPakSize] {
        &self.linked_sizes
    }

    /// Revision numbers of the linked archives, in load order
    pub fn linked_numbers(&self) -> &[u16] {
        &self.linked_numbers
    }

    pub fn starpak_paths(&self) -> &[String] {
        &self.starpak_paths
    }

    pub fn full_starpak_paths(&self) -> &[String] {
        &self.full_starpak_paths
    }

    pub fn slots(&self) -> &[SlotDescriptor] {
        &self.slots
    }

    pub fn sections(&self) -> &[SectionDescriptor] {
        &self.sections
    }

    pub fn relocations(&self) -> &[SectionReference] {
        &self.relocations
    }

    pub fn extra_header(&self) -> &[u8] {
        &self.extra_header
    }

    pub fn starting_section(&self) -> u32 {
        self.starting_section
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Resolved bytes of section `index`
    pub fn section_data(&self, index: usize) -> Option<&[u8]> {
        (index < self.arena.num_sections()).then(|| self.arena.section(index))
    }

    pub fn assets(&self) -> &[AssetDescriptor] {
        &self.assets
    }

    pub fn num_assets(&self) -> usize {
        self.assets.len()
    }

    /// Resolved metadata and data views of asset `index`
    pub fn asset_parts(&self, index: usize) -> Option<AssetParts<'_>> {
        let descriptor = self.assets.get(index)?;
        let Some(metadata) = self.arena.address_of(descriptor.metadata) else {
            warn!(
                "Asset {} has invalid metadata reference {}:0x{:x}",
                hash_to_string(descriptor.hash),
                descriptor.metadata.section,
                descriptor.metadata.offset
            );
            return None;
        };
        let data = self
            .arena
            .address_of(descriptor.data)
            .map(|address| ArenaView::new(&self.arena, address));

        Some(AssetParts {
            descriptor,
            metadata: ArenaView::new(&self.arena, metadata),
            data,
            variant: self.variant(),
        })
    }

    /// Typed view of asset `index`; `None` for unregistered types
    pub fn get_asset(&self, index: usize, registry: &AssetRegistry) -> Option<Box<dyn Asset + '_>> {
        let parts = self.asset_parts(index)?;
        let asset = registry.create(parts);
        if asset.is_none() {
            warn!(
                "No registered view for asset {} of type {}",
                hash_to_string(parts.descriptor.hash),
                parts.descriptor.asset_type
            );
        }
        asset
    }

    /// Index of the asset with content hash `hash`
    pub fn find_asset(&self, hash: u64) -> Option<usize> {
        self.assets.iter().position(|asset| asset.hash == hash)
    }

    pub fn summaries(&self, registry: &AssetRegistry, names: &KnownAssets) -> Vec<AssetSummary> {
        self.assets
            .iter()
            .enumerate()
            .map(|(index, descriptor)| {
                let name = match self.asset_parts(index).and_then(|parts| registry.create(parts)) {
                    Some(asset) => display_name(asset.as_ref(), names),
                    None => names
                        .name_of(descriptor.hash)
                        .map(str::to_string)
                        .unwrap_or_else(|| hash_to_string(descriptor.hash)),
                };
                AssetSummary {
                    index,
                    hash: hash_to_string(descriptor.hash),
                    asset_type: descriptor.asset_type.to_string(),
                    name,
                    metadata_size: descriptor.metadata_size,
                    has_data: self.arena.is_valid(descriptor.data),
                    registered: registry.contains(descriptor.asset_type),
                }
            })
            .collect()
    }
}
