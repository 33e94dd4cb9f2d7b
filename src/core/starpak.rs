//! Starpak sidecar files
//!
//! A starpak holds streamed bulk data referenced by offset. Layout:
//! - `u32` magic `SRPk`, `u32` version (1)
//! - payload
//! - `(offset u64, size u64)` entry table, followed by an `i64` entry count

use crate::bytes::{le_u32, le_u64};
use crate::error::{RpakError, Result};
use ahash::AHashMap;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// "SRPk" read as a little-endian u32
pub const STARPAK_MAGIC: u32 = 0x6B50_5253;

pub const STARPAK_VERSION: u32 = 1;

const ENTRY_SIZE: u64 = 16;
const PREAMBLE_SIZE: u64 = 8;

/// One mapped starpak and its offset → size table
pub struct StarpakFile {
    path: PathBuf,
    mmap: Mmap,
    entries: AHashMap<u64, u64>,
}

impl StarpakFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening starpak: {:?}", path);

        let invalid = || RpakError::InvalidStarpak(path.display().to_string());
        let file = File::open(path).map_err(|e| RpakError::file_io(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| RpakError::file_io(path, e))?
            .len();
        if len < PREAMBLE_SIZE + 8 {
            return Err(invalid());
        }

        // SAFETY: the mapping is read-only and owned by this value
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| RpakError::file_io(path, e))?;

        if le_u32(&mmap, 0) != STARPAK_MAGIC {
            return Err(invalid());
        }
        let version = le_u32(&mmap, 4);
        if version != STARPAK_VERSION {
            debug!("{:?} has starpak version {}", path, version);
            return Err(invalid());
        }

        let count = le_u64(&mmap, (len - 8) as usize) as i64;
        let table_len = u64::try_from(count)
            .ok()
            .and_then(|count| count.checked_mul(ENTRY_SIZE))
            .filter(|table_len| *table_len <= len - 8 - PREAMBLE_SIZE)
            .ok_or_else(invalid)?;

        let table_start = (len - 8 - table_len) as usize;
        let entries: AHashMap<u64, u64> = mmap[table_start..(len - 8) as usize]
            .chunks_exact(ENTRY_SIZE as usize)
            .map(|entry| (le_u64(entry, 0), le_u64(entry, 8)))
            .collect();

        debug!("Starpak {:?}: {} entries", path, entries.len());
        Ok(StarpakFile {
            path: path.to_path_buf(),
            mmap,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry stored at `offset`, `None` if the table has no such entry
    pub fn entry(&self, offset: u64) -> Option<Result<&[u8]>> {
        let size = *self.entries.get(&offset)?;
        let data = offset
            .checked_add(size)
            .filter(|end| *end <= self.mmap.len() as u64)
            .map(|end| &self.mmap[offset as usize..end as usize])
            .ok_or_else(|| RpakError::InvalidStarpak(self.path.display().to_string()));
        Some(data)
    }
}

impl std::fmt::Debug for StarpakFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StarpakFile")
            .field("path", &self.path)
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Starpaks referenced by one archive, in path block order
#[derive(Debug, Default)]
pub struct StarpakStore {
    files: Vec<StarpakFile>,
    full_files: Vec<StarpakFile>,
}

/// File name of a path stored in a starpak path block
///
/// Stored paths are relative to the game root with either separator.
pub fn starpak_file_name(stored: &str) -> &str {
    stored.rsplit(['\\', '/']).next().unwrap_or(stored)
}

impl StarpakStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open every stored path from `dir`
    pub fn open_all<'p, I, J>(dir: &Path, paths: I, full_paths: J) -> Result<Self>
    where
        I: IntoIterator<Item = &'p String>,
        J: IntoIterator<Item = &'p String>,
    {
        let mut store = StarpakStore::new();
        for stored in paths {
            store.add(dir.join(starpak_file_name(stored)))?;
        }
        for stored in full_paths {
            store.add_full(dir.join(starpak_file_name(stored)))?;
        }
        Ok(store)
    }

    pub fn add<P: AsRef<Path>>(&mut self, path: P) -> Result<u32> {
        self.files.push(StarpakFile::open(path)?);
        Ok((self.files.len() - 1) as u32)
    }

    pub fn add_full<P: AsRef<Path>>(&mut self, path: P) -> Result<u32> {
        self.full_files.push(StarpakFile::open(path)?);
        Ok((self.full_files.len() - 1) as u32)
    }

    /// Number of open starpaks across both sets
    pub fn len(&self) -> usize {
        self.files.len() + self.full_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.full_files.is_empty()
    }

    /// Starpaks addressed by [`StarpakStore::read`]
    pub fn optional_len(&self) -> usize {
        self.files.len()
    }

    /// Starpaks addressed by [`StarpakStore::read_full`]
    pub fn full_len(&self) -> usize {
        self.full_files.len()
    }

    /// Entry at `offset` in starpak `index`
    pub fn read(&self, index: u32, offset: u64) -> Result<&[u8]> {
        Self::read_from(&self.files, index, offset)
    }

    /// Entry at `offset` in full starpak `index`
    pub fn read_full(&self, index: u32, offset: u64) -> Result<&[u8]> {
        Self::read_from(&self.full_files, index, offset)
    }

    fn read_from(files: &[StarpakFile], index: u32, offset: u64) -> Result<&[u8]> {
        let file = files
            .get(index as usize)
            .ok_or(RpakError::StarpakIndexOutOfBounds(index))?;
        file.entry(offset)
            .ok_or(RpakError::StarpakEntryNotFound { index, offset })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_starpak(dir: &TempDir, name: &str, entries: &[(u64, &[u8])]) -> PathBuf {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&STARPAK_MAGIC.to_le_bytes());
        bytes.extend_from_slice(&STARPAK_VERSION.to_le_bytes());

        let mut table = Vec::new();
        for (offset, data) in entries {
            bytes.resize(*offset as usize, 0);
            bytes.extend_from_slice(data);
            table.extend_from_slice(&offset.to_le_bytes());
            table.extend_from_slice(&(data.len() as u64).to_le_bytes());
        }
        bytes.extend_from_slice(&table);
        bytes.extend_from_slice(&(entries.len() as i64).to_le_bytes());

        let path = dir.path().join(name);
        File::create(&path).unwrap().write_all(&bytes).unwrap();
        path
    }

    #[test]
    fn test_read_entries() {
        let dir = TempDir::new().unwrap();
        let path = write_starpak(&dir, "a.starpak", &[(0x10, b"hello"), (0x20, b"world!")]);

        let mut store = StarpakStore::new();
        assert_eq!(store.add(&path).unwrap(), 0);
        assert_eq!(store.read(0, 0x10).unwrap(), b"hello");
        assert_eq!(store.read(0, 0x20).unwrap(), b"world!");
    }

    #[test]
    fn test_missing_entry_and_index() {
        let dir = TempDir::new().unwrap();
        let path = write_starpak(&dir, "a.starpak", &[(0x10, b"x")]);

        let mut store = StarpakStore::new();
        store.add(&path).unwrap();
        assert!(matches!(
            store.read(0, 0x11),
            Err(RpakError::StarpakEntryNotFound { index: 0, offset: 0x11 })
        ));
        assert!(matches!(store.read(1, 0x10), Err(RpakError::StarpakIndexOutOfBounds(1))));
        assert!(matches!(store.read_full(0, 0x10), Err(RpakError::StarpakIndexOutOfBounds(0))));
    }

    #[test]
    fn test_invalid_magic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.starpak");
        File::create(&path).unwrap().write_all(&[0u8; 32]).unwrap();
        assert!(matches!(StarpakFile::open(&path), Err(RpakError::InvalidStarpak(_))));
    }

    #[test]
    fn test_entry_count_exceeds_file() {
        let dir = TempDir::new().unwrap();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&STARPAK_MAGIC.to_le_bytes());
        bytes.extend_from_slice(&STARPAK_VERSION.to_le_bytes());
        bytes.extend_from_slice(&1000i64.to_le_bytes());
        let path = dir.path().join("short.starpak");
        File::create(&path).unwrap().write_all(&bytes).unwrap();
        assert!(matches!(StarpakFile::open(&path), Err(RpakError::InvalidStarpak(_))));
    }

    #[test]
    fn test_open_all_uses_file_name() {
        let dir = TempDir::new().unwrap();
        write_starpak(&dir, "pc_all.starpak", &[(0x10, b"data")]);
        let stored = vec![r"paks\Win64\pc_all.starpak".to_string()];

        let store = StarpakStore::open_all(dir.path(), &stored, &[]).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.optional_len(), 1);
        assert_eq!(starpak_file_name("paks/Win64/x.starpak"), "x.starpak");
    }

    #[test]
    fn test_store_with_only_full_starpaks() {
        let dir = TempDir::new().unwrap();
        write_starpak(&dir, "pc_all.opt.starpak", &[(0x10, b"full")]);
        let stored = vec!["paks/Win64/pc_all.opt.starpak".to_string()];

        let store = StarpakStore::open_all(dir.path(), &[], &stored).unwrap();
        assert!(!store.is_empty());
        assert_eq!(store.len(), 1);
        assert_eq!(store.optional_len(), 0);
        assert_eq!(store.full_len(), 1);
        assert_eq!(store.read_full(0, 0x10).unwrap(), b"full");
        assert!(StarpakStore::new().is_empty());
    }
}
