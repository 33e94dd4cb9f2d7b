//! # rpak-rs - Loader for Respawn RPak Asset Archives
//!
//! `rpak-rs` loads the packed asset archives used by Titanfall 2 and Apex Legends into
//! memory and exposes their assets through typed views:
//!
//! - **Patched archives**: linked revisions are chained behind the base file and a
//!   patch stream decoder reconstructs the patched content
//! - **Relocation**: stored `(section, offset)` references become arena addresses
//! - **Asset registry**: type tag → view constructor, extensible at runtime
//! - **Dumping**: in-memory dump of every dumpable asset, with dependency ordering
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rpak_rs::{PakLoader, Result};
//!
//! # fn main() -> Result<()> {
//! let loader = PakLoader::new("paks/Win64")?;
//! let pak = loader.load("common")?;
//!
//! for summary in loader.summaries(&pak) {
//!     println!("{} {} {}", summary.asset_type, summary.hash, summary.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Advanced Usage
//!
//! ```rust,no_run
//! use rpak_rs::{PakLoaderBuilder, Result, Variant};
//!
//! # fn main() -> Result<()> {
//! let mut loader = PakLoaderBuilder::new()
//!     .variant(Variant::Apex)
//!     .pak_dir("paks/Win64")
//!     .known_names("names.txt")
//!     .build()?;
//!
//! let pak = loader.load("common_mp")?;
//! let report = loader.dump(&pak)?;
//! println!("{} dumped, {} skipped", report.dumped.len(), report.skipped.len());
//! # Ok(())
//! # }
//! ```
//!
//! Compressed archives and archives with linked revisions need the engine's bulk
//! decompressor and patch table builder, supplied through
//! [`PakLoaderBuilder::decompressor`] and [`PakLoaderBuilder::table_builder`].

pub mod core;

// Re-export core modules internally so crate:: paths in core still work
#[allow(unused_imports)]
pub(crate) use crate::core::{
    allocator, archive, arena, asset, bytes, chain, compression, config, descriptors, dump,
    error, header, io, names, patch, relocation, starpak,
};

// Re-export core types that users need
pub use crate::core::{
    archive::{ArchiveParser, AssetSummary, RPakFile},
    arena::{Arena, ArenaAddress},
    asset::{
        global_registry, register_global, ArenaView, Asset, AssetConstructor, AssetParts,
        AssetRegistry, DumpOutput, Dumpable, DumpedAsset, PostDumpable, SiblingSource,
    },
    compression::{BulkDecompressor, DecompressorFactory, StoredDecompressor},
    config::LoaderConfig,
    descriptors::{AssetDescriptor, AssetType, SectionReference},
    dump::{DumpReport, DumpSession, SkippedAsset},
    error::{Result, RpakError},
    header::{ArchiveHeader, Variant},
    io::{ArchiveOpener, DecompressedReader, DirectoryOpener, MemoryReader, PlainFileReader},
    names::{AssetHasher, KnownAssets, Xxh3Hasher},
    patch::{DecodeTable, PatchTableBuilder},
    starpak::StarpakStore,
};

use std::path::PathBuf;
use tracing::{debug, info};

/// Loads archives from one game install
///
/// Owns the opener, the optional external decoders, the asset registry and the
/// known-name table.
pub struct PakLoader {
    config: LoaderConfig,
    opener: Box<dyn ArchiveOpener>,
    table_builder: Option<Box<dyn PatchTableBuilder>>,
    registry: AssetRegistry,
    names: KnownAssets,
}

impl PakLoader {
    /// Loader over a directory of uncompressed Titanfall 2 archives
    pub fn new<P: Into<PathBuf>>(pak_dir: P) -> Result<Self> {
        PakLoaderBuilder::new().pak_dir(pak_dir).build()
    }

    /// Loader built from a TOML configuration file
    pub fn from_config_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        PakLoaderBuilder::new()
            .config(LoaderConfig::load(path)?)
            .build()
    }

    /// Load archive `name` together with its linked revisions
    pub fn load(&self, name: &str) -> Result<RPakFile> {
        self.parser().load(name)
    }

    /// Parse an already opened base archive
    pub fn load_from(&self, name: &str, base: Box<dyn DecompressedReader>) -> Result<RPakFile> {
        self.parser().load_from(name, base)
    }

    fn parser(&self) -> ArchiveParser<'_> {
        ArchiveParser {
            variant: self.config.variant,
            opener: self.opener.as_ref(),
            table_builder: self.table_builder.as_deref(),
        }
    }

    /// Map every starpak `pak` references
    pub fn open_starpaks(&self, pak: &RPakFile) -> Result<StarpakStore> {
        StarpakStore::open_all(
            self.config.starpak_dir(),
            pak.starpak_paths(),
            pak.full_starpak_paths(),
        )
    }

    /// Dump every asset of `pak`, adding discovered names to the known-name table
    pub fn dump(&mut self, pak: &RPakFile) -> Result<DumpReport> {
        DumpSession::new(pak, &self.registry).run(&mut self.names)
    }

    pub fn summaries(&self, pak: &RPakFile) -> Vec<AssetSummary> {
        pak.summaries(&self.registry, &self.names)
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut AssetRegistry {
        &mut self.registry
    }

    pub fn names(&self) -> &KnownAssets {
        &self.names
    }

    pub fn names_mut(&mut self) -> &mut KnownAssets {
        &mut self.names
    }
}

impl std::fmt::Debug for PakLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PakLoader")
            .field("config", &self.config)
            .field("table_builder", &self.table_builder.is_some())
            .field("registry", &self.registry)
            .field("names", &self.names)
            .finish()
    }
}

/// Builder for customizing [`PakLoader`] creation
///
/// # Examples
///
/// ```rust,no_run
/// use rpak_rs::{PakLoaderBuilder, StoredDecompressor, Variant};
///
/// # fn main() -> rpak_rs::Result<()> {
/// let loader = PakLoaderBuilder::new()
///     .variant(Variant::Titanfall2)
///     .pak_dir("r2/paks/Win64")
///     .starpak_dir("r2/paks/Win64")
///     .decompressor(StoredDecompressor::factory())
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct PakLoaderBuilder {
    config: LoaderConfig,
    opener: Option<Box<dyn ArchiveOpener>>,
    decompressor: Option<DecompressorFactory>,
    table_builder: Option<Box<dyn PatchTableBuilder>>,
    hasher: Option<Box<dyn AssetHasher>>,
    registry: Option<AssetRegistry>,
}

impl PakLoaderBuilder {
    /// Create a new PakLoaderBuilder with default settings
    pub fn new() -> Self {
        PakLoaderBuilder {
            config: LoaderConfig::default(),
            opener: None,
            decompressor: None,
            table_builder: None,
            hasher: None,
            registry: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn variant(mut self, variant: Variant) -> Self {
        self.config.variant = variant;
        self
    }

    pub fn pak_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.pak_dir = dir.into();
        self
    }

    pub fn starpak_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.starpak_dir = Some(dir.into());
        self
    }

    /// Newline-separated name list loaded at build time
    pub fn known_names<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.known_names = Some(path.into());
        self
    }

    /// Custom archive opener; replaces the directory opener and its decompressor
    pub fn opener(mut self, opener: Box<dyn ArchiveOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    /// Bulk decompressor used for compressed archives
    pub fn decompressor(mut self, factory: DecompressorFactory) -> Self {
        self.decompressor = Some(factory);
        self
    }

    /// Prefix-code table builder used for archives with linked revisions
    pub fn table_builder(mut self, builder: Box<dyn PatchTableBuilder>) -> Self {
        self.table_builder = Some(builder);
        self
    }

    /// Name hash; defaults to [`Xxh3Hasher`]
    pub fn hasher(mut self, hasher: Box<dyn AssetHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Asset registry; defaults to a snapshot of the process-wide registry
    pub fn registry(mut self, registry: AssetRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the PakLoader instance
    pub fn build(self) -> Result<PakLoader> {
        let config = self.config;
        info!(
            "Building loader for {:?} archives in {:?}",
            config.variant, config.pak_dir
        );

        let hasher = self.hasher.unwrap_or_else(|| Box::new(Xxh3Hasher));
        let names = match &config.known_names {
            Some(path) => KnownAssets::load(path, hasher)?,
            None => KnownAssets::new(hasher),
        };

        let opener = match self.opener {
            Some(opener) => opener,
            None => {
                let mut opener = DirectoryOpener::new(&config.pak_dir, config.variant);
                if let Some(factory) = self.decompressor {
                    opener = opener.with_decompressor(factory);
                    debug!("Bulk decompression enabled");
                }
                Box::new(opener)
            }
        };

        let registry = self
            .registry
            .unwrap_or_else(|| global_registry().read().clone());

        Ok(PakLoader {
            config,
            opener,
            table_builder: self.table_builder,
            registry,
            names,
        })
    }
}

impl Default for PakLoaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builder_defaults() -> Result<()> {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let loader = PakLoader::new(temp_dir.path())?;

        assert_eq!(loader.config().variant, Variant::Titanfall2);
        assert!(loader.registry().contains(AssetType::DATATABLE));
        assert!(loader.names().is_empty());
        Ok(())
    }

    #[test]
    fn test_builder_loads_known_names() -> Result<()> {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let names_path = temp_dir.path().join("names.txt");
        let mut file = std::fs::File::create(&names_path).unwrap();
        writeln!(file, "datatable/weapons.rpak").unwrap();

        let loader = PakLoaderBuilder::new()
            .variant(Variant::Apex)
            .pak_dir(temp_dir.path())
            .known_names(&names_path)
            .registry(AssetRegistry::new())
            .build()?;

        assert_eq!(loader.names().len(), 1);
        assert!(loader.registry().is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_archive_reports_path() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let loader = PakLoader::new(temp_dir.path()).unwrap();
        match loader.load("missing") {
            Err(RpakError::FileIo { path, .. }) => assert!(path.ends_with("missing.rpak")),
            other => panic!("unexpected result: {:?}", other.map(|pak| pak.name().to_string())),
        }
    }
}
