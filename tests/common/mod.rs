//! Shared fixtures for integration tests
//!
//! `PakBuilder` lays out archive bytes in the order the parser reads them.

#![allow(dead_code)]

use rpak_rs::core::descriptors::{
    AssetDescriptor, SectionDescriptor, SectionReference, SlotDescriptor,
};
use rpak_rs::core::header::{ArchiveHeader, Variant, FLAG_COMPRESSED};
use rpak_rs::core::patch::{DecodeTable, PatchTableBuilder};
use rpak_rs::Result;
use std::path::{Path, PathBuf};

/// Builds archive files section by section
#[derive(Debug, Clone)]
pub struct PakBuilder {
    pub variant: Variant,
    pub starpaks: Vec<String>,
    pub full_starpaks: Vec<String>,
    pub slots: Vec<SlotDescriptor>,
    pub sections: Vec<SectionDescriptor>,
    pub payloads: Vec<Vec<u8>>,
    pub relocations: Vec<SectionReference>,
    pub assets: Vec<AssetDescriptor>,
    pub extra: Vec<u8>,
    pub compressed: bool,
}

impl PakBuilder {
    pub fn new(variant: Variant) -> Self {
        PakBuilder {
            variant,
            starpaks: Vec::new(),
            full_starpaks: Vec::new(),
            slots: Vec::new(),
            sections: Vec::new(),
            payloads: Vec::new(),
            relocations: Vec::new(),
            assets: Vec::new(),
            extra: Vec::new(),
            compressed: false,
        }
    }

    pub fn starpak(mut self, path: &str) -> Self {
        self.starpaks.push(path.to_string());
        self
    }

    pub fn full_starpak(mut self, path: &str) -> Self {
        self.full_starpaks.push(path.to_string());
        self
    }

    pub fn slot(mut self, slot: u32, alignment: u32, size: u64) -> Self {
        self.slots.push(SlotDescriptor::new(slot, alignment, size));
        self
    }

    /// Section whose size is the payload length
    pub fn section(mut self, slot_descriptor: u32, alignment: u32, payload: Vec<u8>) -> Self {
        self.sections.push(SectionDescriptor::new(
            slot_descriptor,
            alignment,
            payload.len() as u32,
        ));
        self.payloads.push(payload);
        self
    }

    /// Store `target` at `at` and register a relocation for it
    pub fn pointer(mut self, at: SectionReference, target: SectionReference) -> Self {
        let offset = at.offset as usize;
        self.payloads[at.section as usize][offset..offset + 8].copy_from_slice(&target.to_bytes());
        self.relocations.push(at);
        self
    }

    /// Write raw bytes into a section payload
    pub fn patch_bytes(mut self, section: u32, offset: usize, bytes: &[u8]) -> Self {
        self.payloads[section as usize][offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn asset(mut self, descriptor: AssetDescriptor) -> Self {
        self.assets.push(descriptor);
        self
    }

    pub fn extra(mut self, extra: Vec<u8>) -> Self {
        self.extra = extra;
        self
    }

    pub fn compressed(mut self) -> Self {
        self.compressed = true;
        self
    }

    pub fn header(&self, num_links: u16, total_len: u64) -> ArchiveHeader {
        let mut header = ArchiveHeader::new(self.variant);
        if self.compressed {
            header.flags |= FLAG_COMPRESSED;
        }
        header.compressed_size = total_len;
        header.decompressed_size = total_len;
        header.starpak_block_size = path_block(&self.starpaks).len() as u16;
        if self.variant == Variant::Apex {
            header.full_starpak_block_size = path_block(&self.full_starpaks).len() as u16;
        }
        header.num_slot_descriptors = self.slots.len() as u16;
        header.num_sections = self.sections.len() as u16;
        header.num_links = num_links;
        header.num_relocations = self.relocations.len() as u32;
        header.num_assets = self.assets.len() as u32;
        header.num_extra_1 = self.extra.len() as u32;
        header
    }

    /// Everything between the link table and the section payloads
    fn tables(&self) -> Vec<u8> {
        let mut body = path_block(&self.starpaks);
        if self.variant == Variant::Apex {
            body.extend(path_block(&self.full_starpaks));
        }
        for slot in &self.slots {
            body.extend_from_slice(&slot.to_bytes());
        }
        for section in &self.sections {
            body.extend_from_slice(&section.to_bytes());
        }
        for relocation in &self.relocations {
            body.extend_from_slice(&relocation.to_bytes());
        }
        for asset in &self.assets {
            body.extend(asset.to_bytes(self.variant));
        }
        body.extend_from_slice(&self.extra);
        body
    }

    /// Standalone archive with its payloads stored inline
    pub fn build(&self) -> Vec<u8> {
        let mut body = self.tables();
        for payload in &self.payloads {
            body.extend_from_slice(payload);
        }

        let total = (self.variant.header_size() + body.len()) as u64;
        let mut file = self.header(0, total).to_bytes();
        file.extend(body);
        file
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(format!("{}.rpak", name));
        std::fs::write(&path, self.build()).unwrap();
        path
    }

    /// Base archive holding the tables and a passthrough patch program, plus one
    /// linked archive holding the payloads in rotated order
    pub fn build_linked(&self, number: u16, starting_section: u32) -> (Vec<u8>, Vec<u8>) {
        let order: Vec<usize> = (0..self.sections.len())
            .map(|i| (i + starting_section as usize) % self.sections.len())
            .collect();
        let mut linked = ArchiveHeader::new(self.variant).to_bytes();
        for index in order {
            linked.extend_from_slice(&self.payloads[index]);
        }

        let patch_block = passthrough_patch_block(4);
        let mut body = Vec::new();
        body.extend_from_slice(&(patch_block.len() as u32).to_le_bytes());
        body.extend_from_slice(&starting_section.to_le_bytes());
        body.extend_from_slice(&(linked.len() as u64).to_le_bytes());
        body.extend_from_slice(&(linked.len() as u64).to_le_bytes());
        body.extend_from_slice(&number.to_le_bytes());
        body.extend(self.tables());
        body.extend(patch_block);

        let total = (self.variant.header_size() + body.len()) as u64;
        let mut base = self.header(1, total).to_bytes();
        base.extend(body);
        (base, linked)
    }
}

/// NUL-separated path block closed by an empty entry
pub fn path_block(paths: &[String]) -> Vec<u8> {
    if paths.is_empty() {
        return Vec::new();
    }
    let mut block = Vec::new();
    for path in paths {
        block.extend_from_slice(path.as_bytes());
        block.push(0);
    }
    block.push(0);
    block
}

/// Patch block whose program only ever reads runs of `2^run_bits` bytes
pub fn passthrough_patch_block(run_bits: u8) -> Vec<u8> {
    let mut block = Vec::new();
    // Opcode table: every index is Read with a one-bit code
    block.extend_from_slice(&[0u8; 64]);
    block.extend_from_slice(&[1u8; 64]);
    // Length table: `run_bits` value bits, no skip bits
    block.extend_from_slice(&[run_bits; 256]);
    block.extend_from_slice(&[0u8; 256]);
    // Program header word; the literal pool starts right after it
    block.extend_from_slice(&8u64.to_le_bytes());
    block
}

/// Table builder reading tables stored verbatim: symbols, then code lengths
pub struct RawTables;

impl PatchTableBuilder for RawTables {
    fn build(&self, input: &[u8], index_bits: u32, _symbols: &[u8]) -> Result<(DecodeTable, usize)> {
        let len = 1usize << index_bits;
        let symbols = input[..len].to_vec();
        let code_bits = input[len..len * 2].to_vec();
        Ok((DecodeTable::new(symbols, code_bits), len * 2))
    }
}

/// Little-endian helpers for laying out metadata
pub fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn put_u64(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

pub fn put_str(buf: &mut [u8], offset: usize, value: &str) {
    buf[offset..offset + value.len()].copy_from_slice(value.as_bytes());
    buf[offset + value.len()] = 0;
}

/// Starpak file with `entries` stored at their offsets
pub fn starpak_bytes(entries: &[(u64, &[u8])]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0x6B50_5253u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());

    let mut table = Vec::new();
    for (offset, data) in entries {
        bytes.resize(*offset as usize, 0);
        bytes.extend_from_slice(data);
        table.extend_from_slice(&offset.to_le_bytes());
        table.extend_from_slice(&(data.len() as u64).to_le_bytes());
    }
    bytes.extend_from_slice(&table);
    bytes.extend_from_slice(&(entries.len() as i64).to_le_bytes());
    bytes
}
