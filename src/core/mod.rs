//! RPak Archive Format
//!
//! Loader for the asset archives used by Titanfall 2 and Apex Legends.
//!
//! ## Modules
//!
//! - [`error`] - Error types for loader operations
//! - [`header`] - Outer header and per-variant layouts
//! - [`descriptors`] - Slot, section, relocation and asset table records
//! - [`io`] / [`compression`] - Per-file readers yielding decompressed bytes
//! - [`chain`] - Continuous byte source over a base archive and its linked revisions
//! - [`patch`] - Patch stream decoder reconstructing patched content
//! - [`allocator`] / [`arena`] - Section placement and the memory pools holding them
//! - [`relocation`] - Rewrites stored section references into arena addresses
//! - [`archive`] - Structural parser and the loaded archive
//! - [`asset`] - Typed asset views and the constructor registry
//! - [`names`] / [`starpak`] / [`dump`] / [`config`] - Tooling around loaded archives
//!
//! ## Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Header (0x58 Titanfall 2, 0x80 Apex)        │
//! ├─────────────────────────────────────────────┤
//! │ Link table (patched archives only)          │
//! │ Starpak path block(s)                       │
//! │ Slot / section descriptors                  │
//! │ Relocations, asset descriptors              │
//! │ Extra header, patch data block              │
//! ├─────────────────────────────────────────────┤
//! │ Section payloads                            │
//! └─────────────────────────────────────────────┘
//! ```

pub mod allocator;
pub mod archive;
pub mod arena;
pub mod asset;
pub(crate) mod bytes;
pub mod chain;
pub mod compression;
pub mod config;
pub mod descriptors;
pub mod dump;
pub mod error;
pub mod header;
pub mod io;
pub mod names;
pub mod patch;
pub mod relocation;
pub mod starpak;

// Re-export commonly used types
pub use archive::{ArchiveParser, AssetSummary, RPakFile};
pub use arena::{Arena, ArenaAddress};
pub use asset::{Asset, AssetRegistry};
pub use error::{RpakError, Result};
pub use header::{ArchiveHeader, Variant};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
