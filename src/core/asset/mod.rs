//! Typed asset views and the constructor registry
//!
//! A loaded archive hands each asset descriptor, together with its resolved metadata
//! and optional data region, to the constructor registered for the descriptor's type
//! tag. The resulting [`Asset`] exposes common fields plus optional capabilities:
//! - [`Dumpable`]: produces output on its own
//! - [`PostDumpable`]: produces output once its siblings have been dumped

pub mod types;
pub mod view;

use crate::descriptors::{AssetDescriptor, AssetType};
use crate::error::Result;
use crate::header::Variant;
use crate::names::{hash_to_string, KnownAssets};
use ahash::AHashMap;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::debug;

pub use view::ArenaView;

/// Everything a constructor needs to build a view
#[derive(Debug, Clone, Copy)]
pub struct AssetParts<'a> {
    pub descriptor: &'a AssetDescriptor,
    pub metadata: ArenaView<'a>,
    /// Bulk payload, absent when the descriptor's data reference is invalid
    pub data: Option<ArenaView<'a>>,
    pub variant: Variant,
}

/// Builds a typed view over one asset
pub type AssetConstructor = for<'a> fn(AssetParts<'a>) -> Box<dyn Asset + 'a>;

/// Common interface of every asset view
pub trait Asset {
    fn parts(&self) -> &AssetParts<'_>;

    fn descriptor(&self) -> &AssetDescriptor {
        self.parts().descriptor
    }

    fn asset_type(&self) -> AssetType {
        self.descriptor().asset_type
    }

    fn hash(&self) -> u64 {
        self.descriptor().hash
    }

    fn metadata_size(&self) -> u32 {
        self.descriptor().metadata_size
    }

    /// Raw metadata bytes, `metadata_size` long
    fn metadata(&self) -> Result<&[u8]> {
        self.parts()
            .metadata
            .bytes(0, self.metadata_size() as usize)
    }

    fn data(&self) -> Option<ArenaView<'_>> {
        self.parts().data
    }

    /// Name stored inside the asset itself, if the type carries one
    fn embedded_name(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn as_dumpable(&self) -> Option<&dyn Dumpable> {
        None
    }

    fn as_post_dumpable(&self) -> Option<&dyn PostDumpable> {
        None
    }
}

/// Result of dumping one asset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpOutput {
    pub bytes: Vec<u8>,
    /// Asset names discovered while dumping
    pub names: BTreeSet<String>,
}

/// Asset that can be dumped without looking at other assets
pub trait Dumpable {
    /// File extension of the dumped form, without the dot
    fn extension(&self) -> &'static str;

    fn dump(&self) -> Result<DumpOutput>;
}

/// Asset whose dump needs already-dumped siblings
pub trait PostDumpable {
    fn extension(&self) -> &'static str;

    fn post_dump(&self, siblings: &dyn SiblingSource) -> Result<DumpOutput>;
}

/// One finished dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpedAsset {
    pub hash: u64,
    pub asset_type: AssetType,
    pub file_name: String,
    pub output: DumpOutput,
}

/// Lookup of dumped siblings by content hash
pub trait SiblingSource {
    fn open(&self, hash: u64) -> Option<&DumpedAsset>;
}

/// Name to show for an asset: embedded, then known, then the hash itself
pub fn display_name(asset: &dyn Asset, names: &KnownAssets) -> String {
    if let Ok(Some(name)) = asset.embedded_name() {
        return name;
    }
    match names.name_of(asset.hash()) {
        Some(name) => name.to_string(),
        None => hash_to_string(asset.hash()),
    }
}

/// Type tag → constructor table
#[derive(Clone, Default)]
pub struct AssetRegistry {
    constructors: AHashMap<AssetType, AssetConstructor>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with every built-in type
    pub fn with_builtin_types() -> Self {
        let mut registry = Self::new();
        types::register_builtin_types(&mut registry);
        registry
    }

    /// Register a constructor; an existing registration for the tag wins
    pub fn register(&mut self, asset_type: AssetType, constructor: AssetConstructor) -> bool {
        if self.constructors.contains_key(&asset_type) {
            debug!("Asset type {} already registered", asset_type);
            return false;
        }
        self.constructors.insert(asset_type, constructor);
        true
    }

    /// View `parts` through its type's constructor; `None` for unregistered types
    pub fn create<'a>(&self, parts: AssetParts<'a>) -> Option<Box<dyn Asset + 'a>> {
        self.constructors
            .get(&parts.descriptor.asset_type)
            .map(|constructor| constructor(parts))
    }

    pub fn contains(&self, asset_type: AssetType) -> bool {
        self.constructors.contains_key(&asset_type)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl std::fmt::Debug for AssetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.constructors.keys().collect();
        types.sort();
        f.debug_struct("AssetRegistry").field("types", &types).finish()
    }
}

/// Process-wide registry, seeded with the built-in types on first use
pub fn global_registry() -> &'static RwLock<AssetRegistry> {
    static REGISTRY: OnceLock<RwLock<AssetRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(AssetRegistry::with_builtin_types()))
}

/// Register a constructor on the process-wide registry (first wins)
pub fn register_global(asset_type: AssetType, constructor: AssetConstructor) -> bool {
    global_registry().write().register(asset_type, constructor)
}
