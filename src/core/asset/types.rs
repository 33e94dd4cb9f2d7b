//! Built-in asset types

use super::{
    Asset, AssetParts, AssetRegistry, ArenaView, DumpOutput, Dumpable, PostDumpable,
    SiblingSource,
};
use crate::descriptors::AssetType;
use crate::error::{RpakError, Result};
use crate::header::Variant;
use crate::arena::ArenaAddress;
use crate::names::hash_to_string;
use ahash::AHashSet;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Register every built-in constructor on `registry`
pub fn register_builtin_types(registry: &mut AssetRegistry) {
    registry.register(AssetType::PATCH, patch_manifest);
    registry.register(AssetType::SHADER, shader);
    registry.register(AssetType::TEXTURE, texture);
    registry.register(AssetType::MATERIAL, material);
    registry.register(AssetType::DATATABLE, datatable);
    registry.register(AssetType::RSON, rson_file);
    registry.register(AssetType::UI_IMAGE_ATLAS, ui_image_atlas);
    for raw in [
        AssetType::SHADER_SET,
        AssetType::LCD_SCREEN_EFFECT,
        AssetType::PARTICLE_SCRIPT,
        AssetType::ANIMATION_RECORDING,
        AssetType::UI,
        AssetType::UI_FONT_ATLAS,
    ] {
        registry.register(raw, raw_asset);
    }
}

fn null_pointer(parts: &AssetParts<'_>, field: &'static str) -> RpakError {
    RpakError::NullPointer {
        hash: parts.descriptor.hash,
        field,
    }
}

fn pretty_json(value: &Value) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Asset with no interpretation beyond the common fields
pub struct RawAsset<'a> {
    parts: AssetParts<'a>,
}

impl Asset for RawAsset<'_> {
    fn parts(&self) -> &AssetParts<'_> {
        &self.parts
    }
}

pub fn raw_asset<'a>(parts: AssetParts<'a>) -> Box<dyn Asset + 'a> {
    Box::new(RawAsset { parts })
}

/// `Ptch`: which revision of each pak the patch set loads
///
/// Metadata: `u32 unknown, u32 count, char** names, u8* numbers`.
pub struct PatchManifest<'a> {
    parts: AssetParts<'a>,
}

impl PatchManifest<'_> {
    /// Pak name → revision number
    pub fn pak_map(&self) -> Result<BTreeMap<String, u8>> {
        let metadata = self.parts.metadata;
        let count = metadata.u32_at(4)?;
        let mut map = BTreeMap::new();
        if count == 0 {
            return Ok(map);
        }

        let names = metadata
            .pointer_at(8)?
            .ok_or_else(|| null_pointer(&self.parts, "pak names"))?;
        let numbers = metadata
            .pointer_at(16)?
            .ok_or_else(|| null_pointer(&self.parts, "pak numbers"))?;

        for index in 0..count as u64 {
            let name = names
                .string_at(index * 8)?
                .ok_or_else(|| null_pointer(&self.parts, "pak name"))?;
            map.insert(name, numbers.u8_at(index)?);
        }
        Ok(map)
    }
}

impl Asset for PatchManifest<'_> {
    fn parts(&self) -> &AssetParts<'_> {
        &self.parts
    }

    fn as_dumpable(&self) -> Option<&dyn Dumpable> {
        Some(self)
    }
}

impl Dumpable for PatchManifest<'_> {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn dump(&self) -> Result<DumpOutput> {
        let map = self.pak_map()?;
        let value = serde_json::to_value(&map)?;
        Ok(DumpOutput {
            bytes: pretty_json(&value)?,
            names: BTreeSet::new(),
        })
    }
}

pub fn patch_manifest<'a>(parts: AssetParts<'a>) -> Box<dyn Asset + 'a> {
    Box::new(PatchManifest { parts })
}

/// `shdr`: carries only its name
pub struct Shader<'a> {
    parts: AssetParts<'a>,
}

impl Asset for Shader<'_> {
    fn parts(&self) -> &AssetParts<'_> {
        &self.parts
    }

    fn embedded_name(&self) -> Result<Option<String>> {
        self.parts.metadata.string_at(0)
    }
}

pub fn shader<'a>(parts: AssetParts<'a>) -> Box<dyn Asset + 'a> {
    Box::new(Shader { parts })
}

/// `txtr`
///
/// The dump is the raw mip chain exactly as stored; no transcoding is done.
pub struct Texture<'a> {
    parts: AssetParts<'a>,
}

impl Texture<'_> {
    pub fn width(&self) -> Result<u16> {
        self.parts.metadata.u16_at(16)
    }

    pub fn height(&self) -> Result<u16> {
        self.parts.metadata.u16_at(18)
    }

    pub fn format(&self) -> Result<u16> {
        self.parts.metadata.u16_at(22)
    }

    /// Size of the mip chain in the data region
    pub fn data_size(&self) -> Result<u32> {
        self.parts.metadata.u32_at(24)
    }
}

impl Asset for Texture<'_> {
    fn parts(&self) -> &AssetParts<'_> {
        &self.parts
    }

    fn embedded_name(&self) -> Result<Option<String>> {
        self.parts.metadata.string_at(8)
    }

    fn as_dumpable(&self) -> Option<&dyn Dumpable> {
        self.parts.data.map(|_| self as &dyn Dumpable)
    }
}

impl Dumpable for Texture<'_> {
    fn extension(&self) -> &'static str {
        "bin"
    }

    fn dump(&self) -> Result<DumpOutput> {
        let data = self
            .parts
            .data
            .ok_or_else(|| null_pointer(&self.parts, "texture data"))?;
        let bytes = data.bytes(0, self.data_size()? as usize)?.to_vec();
        debug!(
            "Texture {:016x}: {}x{} format {} ({} bytes)",
            self.parts.descriptor.hash,
            self.width()?,
            self.height()?,
            self.format()?,
            bytes.len()
        );

        let names = self.embedded_name()?.into_iter().collect();
        Ok(DumpOutput { bytes, names })
    }
}

pub fn texture<'a>(parts: AssetParts<'a>) -> Box<dyn Asset + 'a> {
    Box::new(Texture { parts })
}

/// Offsets of the Apex material fields following the name
mod material_layout {
    pub const NAME: u64 = 24;
    pub const SURFACE_PROP: u64 = 32;
    pub const UNKNOWN1: u64 = 40;
    pub const LINKED_MATERIALS: [(&str, u64); 5] = [
        ("shadow_material", 48),
        ("prepass_material", 56),
        ("vsm_material", 64),
        ("tightshadow_material", 72),
        ("colpass_material", 80),
    ];
    pub const SHADER_SET: u64 = 88;
    pub const TEXTURE_HASHES: u64 = 96;
    pub const TEXTURE_HASHES_END: u64 = 104;
    pub const WIDTH: u64 = 114;
    pub const HEIGHT: u64 = 116;
}

/// `matl`
///
/// Titanfall 2 materials only expose their name. Apex materials also reference
/// textures by hash, so their dump waits until the textures have been dumped.
pub struct Material<'a> {
    parts: AssetParts<'a>,
}

impl Material<'_> {
    /// Hashes between the texture list pointer and its end pointer
    pub fn texture_hashes(&self) -> Result<Vec<u64>> {
        let metadata = self.parts.metadata;
        let start = match metadata.pointer_at(material_layout::TEXTURE_HASHES)? {
            Some(start) => start,
            None => return Ok(Vec::new()),
        };
        let end = metadata
            .pointer_at(material_layout::TEXTURE_HASHES_END)?
            .ok_or_else(|| null_pointer(&self.parts, "texture list end"))?;

        let (from, to) = (start.address(), end.address());
        if from.pool() != to.pool() || to.offset() < from.offset() {
            return Err(RpakError::MetadataOutOfBounds {
                offset: from.offset() as usize,
                len: 0,
                available: 0,
            });
        }

        (0..(to.offset() - from.offset()) / 8)
            .map(|index| start.u64_at(index * 8))
            .collect()
    }

    fn apex_fields(&self, info: &mut Map<String, Value>) -> Result<()> {
        let metadata = self.parts.metadata;
        if let Some(surface_prop) = metadata.string_at(material_layout::SURFACE_PROP)? {
            info.insert("surface_prop".into(), json!(surface_prop));
        }
        info.insert(
            "unknown1".into(),
            json!(format!("{:x}", metadata.u64_at(material_layout::UNKNOWN1)?)),
        );
        for (key, offset) in material_layout::LINKED_MATERIALS {
            let hash = metadata.u64_at(offset)?;
            if hash != 0 {
                info.insert(key.into(), json!(hash_to_string(hash)));
            }
        }
        let shader_set = metadata.u64_at(material_layout::SHADER_SET)?;
        if shader_set != 0 {
            info.insert("shader_set".into(), json!(hash_to_string(shader_set)));
        }
        for (key, offset) in [("width", material_layout::WIDTH), ("height", material_layout::HEIGHT)] {
            let value = metadata.u16_at(offset)?;
            if value != 0 {
                info.insert(key.into(), json!(value));
            }
        }
        Ok(())
    }
}

impl Asset for Material<'_> {
    fn parts(&self) -> &AssetParts<'_> {
        &self.parts
    }

    fn embedded_name(&self) -> Result<Option<String>> {
        self.parts.metadata.string_at(material_layout::NAME)
    }

    fn as_post_dumpable(&self) -> Option<&dyn PostDumpable> {
        Some(self)
    }
}

impl PostDumpable for Material<'_> {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn post_dump(&self, siblings: &dyn SiblingSource) -> Result<DumpOutput> {
        let mut info = Map::new();
        let mut names = BTreeSet::new();
        if let Some(name) = self.embedded_name()? {
            info.insert("name".into(), json!(name));
            names.insert(name);
        }

        if self.parts.variant == Variant::Apex {
            self.apex_fields(&mut info)?;

            let mut textures = Vec::new();
            for hash in self.texture_hashes()? {
                if hash == 0 {
                    textures.push(Value::Null);
                    continue;
                }
                let texture = siblings.open(hash).ok_or(RpakError::MissingDependency {
                    hash: self.parts.descriptor.hash,
                    dependency: hash,
                })?;
                textures.push(json!(texture.file_name));
            }
            if !textures.is_empty() {
                info.insert("textures".into(), Value::Array(textures));
            }
        }

        Ok(DumpOutput {
            bytes: pretty_json(&Value::Object(info))?,
            names,
        })
    }
}

pub fn material<'a>(parts: AssetParts<'a>) -> Box<dyn Asset + 'a> {
    Box::new(Material { parts })
}

/// Cell type of a datatable column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Bool,
    Int,
    Float,
    Vector,
    String,
    Asset,
    AssetNoPrecache,
    Unknown(i32),
}

impl ColumnType {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => ColumnType::Bool,
            1 => ColumnType::Int,
            2 => ColumnType::Float,
            3 => ColumnType::Vector,
            4 => ColumnType::String,
            5 => ColumnType::Asset,
            6 => ColumnType::AssetNoPrecache,
            other => ColumnType::Unknown(other),
        }
    }
}

/// One datatable column header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    /// Offset of the cell inside a row
    pub offset: u32,
}

fn csv_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// `dtbl`: a typed table dumped as CSV
pub struct Datatable<'a> {
    parts: AssetParts<'a>,
}

impl<'a> Datatable<'a> {
    const COLUMN_SIZE: u64 = 16;

    pub fn column_count(&self) -> Result<usize> {
        Ok(self.parts.metadata.i32_at(0)?.max(0) as usize)
    }

    pub fn row_count(&self) -> Result<usize> {
        Ok(self.parts.metadata.i32_at(4)?.max(0) as usize)
    }

    pub fn row_size(&self) -> Result<u32> {
        match self.parts.variant {
            Variant::Titanfall2 => self.parts.metadata.u32_at(24),
            Variant::Apex => self.parts.metadata.u32_at(32),
        }
    }

    pub fn columns(&self) -> Result<Vec<Column>> {
        let count = self.column_count()?;
        if count == 0 {
            return Ok(Vec::new());
        }
        let table = self
            .parts
            .metadata
            .pointer_at(8)?
            .ok_or_else(|| null_pointer(&self.parts, "columns"))?;

        (0..count as u64)
            .map(|index| {
                let column = table.at(index * Self::COLUMN_SIZE);
                Ok(Column {
                    name: column.string_at(0)?.unwrap_or_default(),
                    column_type: ColumnType::from_raw(column.i32_at(8)?),
                    offset: column.u32_at(12)?,
                })
            })
            .collect()
    }

    fn cell(&self, cell: ArenaView<'a>, column_type: ColumnType, names: &mut BTreeSet<String>) -> Result<String> {
        Ok(match column_type {
            ColumnType::Bool => (cell.u8_at(0)? != 0).to_string(),
            ColumnType::Int => cell.i32_at(0)?.to_string(),
            ColumnType::Float => cell.f32_at(0)?.to_string(),
            ColumnType::Vector => "VECTOR".to_string(),
            ColumnType::String | ColumnType::Asset | ColumnType::AssetNoPrecache => {
                let value = cell.string_at(0)?.unwrap_or_default();
                names.insert(value.clone());
                value
            }
            ColumnType::Unknown(_) => "UNKNOWN".to_string(),
        })
    }
}

impl Asset for Datatable<'_> {
    fn parts(&self) -> &AssetParts<'_> {
        &self.parts
    }

    fn as_dumpable(&self) -> Option<&dyn Dumpable> {
        Some(self)
    }
}

impl Dumpable for Datatable<'_> {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn dump(&self) -> Result<DumpOutput> {
        let columns = self.columns()?;
        let mut csv = String::new();
        let mut names = BTreeSet::new();

        let header: Vec<String> = columns.iter().map(|column| csv_quote(&column.name)).collect();
        csv.push_str(&header.join(","));
        csv.push('\n');

        let rows = self.row_count()?;
        if rows > 0 && !columns.is_empty() {
            let row_data = self
                .parts
                .metadata
                .pointer_at(16)?
                .ok_or_else(|| null_pointer(&self.parts, "row data"))?;
            let row_size = self.row_size()? as u64;

            for row in 0..rows as u64 {
                let mut cells = Vec::with_capacity(columns.len());
                for column in &columns {
                    let cell = row_data.at(row * row_size + column.offset as u64);
                    cells.push(csv_quote(&self.cell(cell, column.column_type, &mut names)?));
                }
                csv.push_str(&cells.join(","));
                csv.push('\n');
            }
        }

        debug!(
            "Datatable {:016x}: {} columns, {} rows",
            self.parts.descriptor.hash,
            columns.len(),
            rows
        );
        names.remove("");
        Ok(DumpOutput {
            bytes: csv.into_bytes(),
            names,
        })
    }
}

pub fn datatable<'a>(parts: AssetParts<'a>) -> Box<dyn Asset + 'a> {
    Box::new(Datatable { parts })
}

/// RSON value descriptors and object entries
mod rson_layout {
    pub const STRING: u32 = 0x2;
    pub const OBJECT: u32 = 0x8;
    pub const INTEGER: u32 = 0x20;
    pub const STRING_LIST: u32 = 0x1002;
    pub const OBJECT_LIST: u32 = 0x1008;

    /// `u32 type, u32 count, 8-byte data`
    pub const TYPE: u64 = 0;
    pub const COUNT: u64 = 4;
    pub const DATA: u64 = 8;

    /// `char* key, descriptor value, entry* next`
    pub const KEY: u64 = 0;
    pub const VALUE: u64 = 8;
    pub const NEXT: u64 = 24;

    pub const MAX_DEPTH: usize = 64;
}

/// Walks one RSON document
struct RsonParser {
    hash: u64,
    strings: BTreeSet<String>,
    /// Object entries on the current path
    open_entries: AHashSet<ArenaAddress>,
}

impl RsonParser {
    fn malformed(&self, reason: &'static str) -> RpakError {
        RpakError::InvalidAssetData {
            hash: self.hash,
            reason,
        }
    }

    fn null(&self, field: &'static str) -> RpakError {
        RpakError::NullPointer {
            hash: self.hash,
            field,
        }
    }

    fn string(&mut self, value: Option<String>) -> Result<Value> {
        let value = value.ok_or_else(|| self.null("rson string"))?;
        self.strings.insert(value.clone());
        Ok(Value::String(value))
    }

    fn value(&mut self, descriptor: ArenaView<'_>, depth: usize) -> Result<Value> {
        use rson_layout::*;

        if depth > MAX_DEPTH {
            return Err(self.malformed("rson values nested too deeply"));
        }
        let count = descriptor.u32_at(COUNT)? as u64;
        match descriptor.u32_at(TYPE)? {
            STRING => self.string(descriptor.string_at(DATA)?),
            OBJECT => {
                let entry = descriptor
                    .pointer_at(DATA)?
                    .ok_or_else(|| self.null("rson object"))?;
                self.object(entry, depth)
            }
            INTEGER => {
                let value = descriptor.i32_at(DATA)?;
                Ok(json!(value))
            }
            STRING_LIST if count == 0 => Ok(Value::Array(Vec::new())),
            STRING_LIST => {
                let list = descriptor
                    .pointer_at(DATA)?
                    .ok_or_else(|| self.null("rson string list"))?;
                (0..count)
                    .map(|index| self.string(list.string_at(index * 8)?))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
            OBJECT_LIST if count == 0 => Ok(Value::Array(Vec::new())),
            OBJECT_LIST => {
                let list = descriptor
                    .pointer_at(DATA)?
                    .ok_or_else(|| self.null("rson object list"))?;
                let mut values = Vec::new();
                for index in 0..count {
                    if let Some(entry) = list.pointer_at(index * 8)? {
                        values.push(self.object(entry, depth)?);
                    }
                }
                Ok(Value::Array(values))
            }
            other => {
                warn!("No RSON parser for type 0x{:x} in {:016x}", other, self.hash);
                Ok(Value::Null)
            }
        }
    }

    /// Linked list of key/value entries starting at `entry`
    fn object(&mut self, mut entry: ArenaView<'_>, depth: usize) -> Result<Value> {
        use rson_layout::*;

        let mut object = Map::new();
        let mut chain = Vec::new();
        loop {
            if !self.open_entries.insert(entry.address()) {
                return Err(self.malformed("rson object entries form a cycle"));
            }
            chain.push(entry.address());

            let key = entry
                .string_at(KEY)?
                .ok_or_else(|| self.null("rson key"))?;
            let value = self.value(entry.at(VALUE), depth + 1)?;
            object.insert(key, value);

            match entry.pointer_at(NEXT)? {
                Some(next) => entry = next,
                None => break,
            }
        }

        // Shared entries are fine, only loops are rejected
        for address in chain {
            self.open_entries.remove(&address);
        }
        Ok(Value::Object(object))
    }
}

/// `rson`: a JSON-like document stored as linked descriptors
pub struct RsonFile<'a> {
    parts: AssetParts<'a>,
}

impl RsonFile<'_> {
    /// The document as JSON, plus every string value it holds
    pub fn parse(&self) -> Result<(Value, BTreeSet<String>)> {
        let mut parser = RsonParser {
            hash: self.parts.descriptor.hash,
            strings: BTreeSet::new(),
            open_entries: AHashSet::new(),
        };
        let value = parser.value(self.parts.metadata, 0)?;
        Ok((value, parser.strings))
    }
}

impl Asset for RsonFile<'_> {
    fn parts(&self) -> &AssetParts<'_> {
        &self.parts
    }

    fn as_dumpable(&self) -> Option<&dyn Dumpable> {
        Some(self)
    }
}

impl Dumpable for RsonFile<'_> {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn dump(&self) -> Result<DumpOutput> {
        let (value, mut names) = self.parse()?;
        debug!(
            "RSON {:016x}: {} strings",
            self.parts.descriptor.hash,
            names.len()
        );
        names.remove("");
        Ok(DumpOutput {
            bytes: pretty_json(&value)?,
            names,
        })
    }
}

pub fn rson_file<'a>(parts: AssetParts<'a>) -> Box<dyn Asset + 'a> {
    Box::new(RsonFile { parts })
}

/// Offsets of the UI image atlas header and its per-element arrays
mod atlas_layout {
    pub const FULL_WIDTH: u64 = 8;
    pub const FULL_HEIGHT: u64 = 10;
    pub const NUM_ELEMENTS: u64 = 12;
    pub const PIXEL_SIZES: u64 = 24;
    pub const ENTRIES: u64 = 40;
    pub const ELEMENT_STRINGS: u64 = 48;
    pub const TEXTURE_HASH: u64 = 56;

    /// `u16 width, u16 height`
    pub const PIXEL_SIZE_STRIDE: u64 = 4;
    /// `u32 half hash, u16 unknown, u16 name offset`
    pub const ENTRY_STRIDE: u64 = 8;
    /// `f32 u, f32 v, f32 width, f32 height` in the data region
    pub const UV_STRIDE: u64 = 16;
}

/// One image inside an atlas
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtlasElement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub subtexture_hash: String,
    pub width: u16,
    pub height: u16,
    pub u: f32,
    pub v: f32,
    pub u_width: f32,
    pub v_height: f32,
}

/// `uimg`: sub-image rectangles of a UI texture
///
/// Metadata holds sizes and names; the UV rectangles live in the data region.
pub struct UiImageAtlas<'a> {
    parts: AssetParts<'a>,
}

impl UiImageAtlas<'_> {
    pub fn texture_hash(&self) -> Result<u64> {
        self.parts.metadata.u64_at(atlas_layout::TEXTURE_HASH)
    }

    pub fn width(&self) -> Result<u16> {
        self.parts.metadata.u16_at(atlas_layout::FULL_WIDTH)
    }

    pub fn height(&self) -> Result<u16> {
        self.parts.metadata.u16_at(atlas_layout::FULL_HEIGHT)
    }

    pub fn elements(&self) -> Result<Vec<AtlasElement>> {
        use atlas_layout::*;

        let metadata = self.parts.metadata;
        let count = metadata.u16_at(NUM_ELEMENTS)? as u64;
        if count == 0 {
            return Ok(Vec::new());
        }
        let uvs = self
            .parts
            .data
            .ok_or_else(|| null_pointer(&self.parts, "atlas data"))?;
        let sizes = metadata
            .pointer_at(PIXEL_SIZES)?
            .ok_or_else(|| null_pointer(&self.parts, "pixel sizes"))?;
        let entries = metadata
            .pointer_at(ENTRIES)?
            .ok_or_else(|| null_pointer(&self.parts, "atlas entries"))?;
        let strings = metadata.pointer_at(ELEMENT_STRINGS)?;

        (0..count)
            .map(|index| {
                let entry = entries.at(index * ENTRY_STRIDE);
                let size = sizes.at(index * PIXEL_SIZE_STRIDE);
                let uv = uvs.at(index * UV_STRIDE);
                let name = match strings {
                    Some(strings) => Some(strings.at(entry.u16_at(6)? as u64).c_str()?),
                    None => None,
                };
                Ok(AtlasElement {
                    name,
                    subtexture_hash: hash_to_string(entry.u32_at(0)? as u64),
                    width: size.u16_at(0)?,
                    height: size.u16_at(2)?,
                    u: uv.f32_at(0)?,
                    v: uv.f32_at(4)?,
                    u_width: uv.f32_at(8)?,
                    v_height: uv.f32_at(12)?,
                })
            })
            .collect()
    }
}

impl Asset for UiImageAtlas<'_> {
    fn parts(&self) -> &AssetParts<'_> {
        &self.parts
    }

    fn as_dumpable(&self) -> Option<&dyn Dumpable> {
        self.parts.data.map(|_| self as &dyn Dumpable)
    }
}

impl Dumpable for UiImageAtlas<'_> {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn dump(&self) -> Result<DumpOutput> {
        let elements = self.elements()?;
        let names = elements
            .iter()
            .filter_map(|element| element.name.clone())
            .collect();
        let texture_hash = hash_to_string(self.texture_hash()?);
        let (width, height) = (self.width()?, self.height()?);
        let element_values = serde_json::to_value(&elements)?;
        let value = json!({
            "texture_hash": texture_hash,
            "width": width,
            "height": height,
            "elements": element_values,
        });
        debug!(
            "UI image atlas {:016x}: {} elements",
            self.parts.descriptor.hash,
            elements.len()
        );
        Ok(DumpOutput {
            bytes: pretty_json(&value)?,
            names,
        })
    }
}

pub fn ui_image_atlas<'a>(parts: AssetParts<'a>) -> Box<dyn Asset + 'a> {
    Box::new(UiImageAtlas { parts })
}
