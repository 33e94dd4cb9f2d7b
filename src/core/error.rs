use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RpakError {
    #[error("Invalid signature in header: 0x{0:08x}")]
    InvalidSignature(u32),

    #[error("Unsupported format version: {found} (expected {expected})")]
    UnsupportedVersion { found: u16, expected: u16 },

    #[error("Required table is empty: {0}")]
    EmptyTable(&'static str),

    #[error("Invalid alignment 0x{alignment:x} for {what} {index}")]
    InvalidAlignment {
        what: &'static str,
        index: usize,
        alignment: u32,
    },

    #[error("Section {section} does not fit its slot descriptor region (end 0x{end:x} > limit 0x{limit:x})")]
    SectionOverflow { section: usize, end: u64, limit: u64 },

    #[error("Cannot allocate arena pool {pool} of 0x{size:x} bytes")]
    PoolAllocation { pool: usize, size: u64 },

    #[error("Cannot allocate a read buffer of 0x{0:x} bytes")]
    BufferAllocation(u64),

    #[error("Slot descriptor index {index} out of range ({count} descriptors)")]
    InvalidSlotDescriptor { index: u32, count: usize },

    #[error("Starting section offset {offset} out of range ({count} sections)")]
    InvalidSectionRotation { offset: u32, count: usize },

    #[error("Unexpected hotswap starpak present in file: {0}")]
    HotswapStarpak(String),

    #[error("Invalid section reference: offset 0x{offset:x} in section {section}")]
    InvalidReference { section: u32, offset: u32 },

    #[error("Relocation {index} out of bounds: offset 0x{offset:x} in section {section}")]
    RelocationOutOfBounds {
        index: usize,
        section: u32,
        offset: u32,
    },

    #[error("Relocation {index} target out of bounds: offset 0x{offset:x} in section {section}")]
    RelocationTargetOutOfBounds {
        index: usize,
        section: u32,
        offset: u32,
    },

    #[error("Patch opcode invalid: {0}")]
    InvalidPatchOpcode(u8),

    #[error("Patch instruction stream exhausted before a decode program was installed")]
    PatchProgramMissing,

    #[error("Archive declares {0} linked paks but no patch table builder is configured")]
    PatchTablesUnavailable(u16),

    #[error("Patch data block is malformed: {0}")]
    InvalidPatchData(String),

    #[error("Read/seek past end of chained input ({requested} bytes requested, {available} available)")]
    ReadPastEnd { requested: u64, available: u64 },

    #[error("Decompressed size in header (0x{header:x}) does not match size from data (0x{data:x})")]
    DecompressedSizeMismatch { header: u64, data: u64 },

    #[error("Archive {0} is compressed but no bulk decompressor is configured")]
    CompressionUnavailable(String),

    #[error("Decompression failed: {0}")]
    Decompression(String),

    #[error("Metadata access out of bounds: {len} bytes at 0x{offset:x} ({available} available)")]
    MetadataOutOfBounds {
        offset: usize,
        len: usize,
        available: usize,
    },

    #[error("Asset {hash:016x} is malformed: {reason}")]
    InvalidAssetData { hash: u64, reason: &'static str },

    #[error("Asset {hash:016x} has a null {field} pointer")]
    NullPointer { hash: u64, field: &'static str },

    #[error("{0} is not a valid starpak file")]
    InvalidStarpak(String),

    #[error("Starpak index {0} out of bounds")]
    StarpakIndexOutOfBounds(u32),

    #[error("Offset 0x{offset:x} not found in offset map for starpak {index}")]
    StarpakEntryNotFound { index: u32, offset: u64 },

    #[error("Asset {hash:016x} depends on asset {dependency:016x} which is not available")]
    MissingDependency { hash: u64, dependency: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error on {path:?}: {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RpakError {
    /// Wrap an I/O error with the path it occurred on
    pub fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RpakError::FileIo {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only invalidates a single asset rather than the load
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RpakError::MissingDependency { .. })
    }
}

pub type Result<T> = std::result::Result<T, RpakError>;
