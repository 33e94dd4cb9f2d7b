//! Known asset names
//!
//! Assets are identified by a 64-bit hash of their logical name. The archive stores
//! only the hash, so human-readable names come from an external list of candidate
//! names hashed with the same function, plus names discovered while dumping.

use crate::error::{RpakError, Result};
use ahash::AHashMap;
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

/// Hash over a NUL-terminated asset name
pub trait AssetHasher: Send + Sync {
    /// `name` excludes the terminator; implementations hash as if it were present
    fn hash_name(&self, name: &[u8]) -> u64;
}

/// Portable name hash used when the engine's own hash is not available
#[derive(Debug, Clone, Copy, Default)]
pub struct Xxh3Hasher;

impl AssetHasher for Xxh3Hasher {
    fn hash_name(&self, name: &[u8]) -> u64 {
        let end = name.iter().position(|b| *b == 0).unwrap_or(name.len());
        xxh3_64(&name[..end])
    }
}

/// Format a hash the way asset references are printed
pub fn hash_to_string(hash: u64) -> String {
    format!("{:016x}", hash)
}

/// Names in script dumps are written as `$"name"` or `$'name'`
const SCRIPT_NAME_PATTERN: &str = r#"\$['"](.*?)['"]"#;

/// Hash → name lookup table
pub struct KnownAssets {
    hasher: Box<dyn AssetHasher>,
    names: AHashMap<u64, String>,
}

impl KnownAssets {
    pub fn new(hasher: Box<dyn AssetHasher>) -> Self {
        KnownAssets {
            hasher,
            names: AHashMap::new(),
        }
    }

    /// Load a newline-separated name list
    pub fn load<P: AsRef<Path>>(path: P, hasher: Box<dyn AssetHasher>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| RpakError::file_io(path, e))?;

        let mut known = KnownAssets::new(hasher);
        known.extend(text.lines());
        debug!("Loaded {} known asset names from {:?}", known.len(), path);
        Ok(known)
    }

    /// Add a name; returns its hash
    pub fn add(&mut self, name: &str) -> u64 {
        let hash = self.hasher.hash_name(name.as_bytes());
        self.names.entry(hash).or_insert_with(|| name.to_string());
        hash
    }

    pub fn extend<'n, I: IntoIterator<Item = &'n str>>(&mut self, names: I) {
        for name in names {
            let name = name.trim();
            if !name.is_empty() {
                self.add(name);
            }
        }
    }

    /// Collect every `$"name"` reference from script text
    pub fn harvest_script_names(&mut self, text: &str) -> Result<usize> {
        let pattern =
            Regex::new(SCRIPT_NAME_PATTERN).map_err(|e| RpakError::Config(e.to_string()))?;
        let before = self.len();
        for captures in pattern.captures_iter(text) {
            if let Some(name) = captures.get(1) {
                let name = name.as_str().trim();
                if !name.is_empty() {
                    self.add(name);
                }
            }
        }
        Ok(self.len() - before)
    }

    pub fn hash_of(&self, name: &str) -> u64 {
        self.hasher.hash_name(name.as_bytes())
    }

    pub fn name_of(&self, hash: u64) -> Option<&str> {
        self.names.get(&hash).map(String::as_str)
    }

    pub fn contains(&self, hash: u64) -> bool {
        self.names.contains_key(&hash)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for KnownAssets {
    fn default() -> Self {
        Self::new(Box::new(Xxh3Hasher))
    }
}

impl std::fmt::Debug for KnownAssets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnownAssets")
            .field("names", &self.names.len())
            .finish()
    }
}
