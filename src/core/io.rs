//! Disk I/O for RPak archives
//!
//! Every underlying source implements [`DecompressedReader`]: a forward-only reader
//! that yields the *decompressed* archive bytes, whether the file on disk is stored
//! raw or bulk compressed.

use crate::compression::{CompressedFileReader, DecompressorFactory};
use crate::error::{RpakError, Result};
use crate::header::{Variant, FLAG_COMPRESSED};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Forward-only reader over the decompressed bytes of one archive file
pub trait DecompressedReader {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    /// Total decompressed size of the file
    fn size(&self) -> u64;

    /// Discard `skip` bytes, then fill `buffer`
    fn read_data(&mut self, buffer: &mut [u8], skip: u64) -> Result<()>;
}

/// Reader over any seekable stream holding uncompressed archive bytes
pub struct StreamReader<R> {
    name: String,
    inner: R,
    size: u64,
}

impl<R: Read + Seek> StreamReader<R> {
    pub fn new(name: impl Into<String>, mut inner: R) -> Result<Self> {
        let name = name.into();
        let size = inner
            .seek(SeekFrom::End(0))
            .map_err(|e| RpakError::file_io(&name, e))?;
        inner
            .seek(SeekFrom::Start(0))
            .map_err(|e| RpakError::file_io(&name, e))?;

        Ok(StreamReader { name, inner, size })
    }
}

impl<R: Read + Seek> DecompressedReader for StreamReader<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read_data(&mut self, buffer: &mut [u8], skip: u64) -> Result<()> {
        if skip > 0 {
            self.inner
                .seek(SeekFrom::Current(skip as i64))
                .map_err(|e| RpakError::file_io(&self.name, e))?;
        }
        self.inner
            .read_exact(buffer)
            .map_err(|e| RpakError::file_io(&self.name, e))?;
        Ok(())
    }
}

/// Uncompressed archive read straight from disk
pub type PlainFileReader = StreamReader<BufReader<File>>;

/// Archive bytes held in memory
pub type MemoryReader = StreamReader<Cursor<Vec<u8>>>;

impl StreamReader<BufReader<File>> {
    /// Open an uncompressed archive file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| RpakError::file_io(path, e))?;
        StreamReader::new(path.display().to_string(), BufReader::new(file))
    }
}

impl StreamReader<Cursor<Vec<u8>>> {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u64;
        StreamReader {
            name: name.into(),
            inner: Cursor::new(bytes),
            size,
        }
    }
}

/// File name of archive `name` at revision `number`
///
/// Revision 0 is the base file (`name.rpak`); others are `name(NN).rpak`.
pub fn rpak_file_name(name: &str, number: u16) -> String {
    if number == 0 {
        format!("{}.rpak", name)
    } else {
        format!("{}({:02}).rpak", name, number)
    }
}

/// Opens the base archive and any linked archive by revision number
pub trait ArchiveOpener {
    fn open(&self, name: &str, number: u16) -> Result<Box<dyn DecompressedReader>>;
}

/// Opens archives from a directory laid out like the game's `paks/Win64`
pub struct DirectoryOpener {
    dir: PathBuf,
    variant: Variant,
    decompressor: Option<DecompressorFactory>,
}

impl DirectoryOpener {
    pub fn new<P: Into<PathBuf>>(dir: P, variant: Variant) -> Self {
        DirectoryOpener {
            dir: dir.into(),
            variant,
            decompressor: None,
        }
    }

    /// Use `factory` to decompress archives whose header sets the compressed flag
    pub fn with_decompressor(mut self, factory: DecompressorFactory) -> Self {
        self.decompressor = Some(factory);
        self
    }

    pub fn path_for(&self, name: &str, number: u16) -> PathBuf {
        self.dir.join(rpak_file_name(name, number))
    }
}

impl ArchiveOpener for DirectoryOpener {
    fn open(&self, name: &str, number: u16) -> Result<Box<dyn DecompressedReader>> {
        let path = self.path_for(name, number);
        debug!("Opening archive {:?}", path);

        let mut file = File::open(&path).map_err(|e| RpakError::file_io(&path, e))?;
        let mut flags = [0u8; 2];
        file.seek(SeekFrom::Start(6))
            .and_then(|_| file.read_exact(&mut flags))
            .and_then(|_| file.seek(SeekFrom::Start(0)))
            .map_err(|e| RpakError::file_io(&path, e))?;

        let shown = path.display().to_string();
        if u16::from_le_bytes(flags) & FLAG_COMPRESSED == 0 {
            trace!("{} is stored uncompressed", shown);
            return Ok(Box::new(StreamReader::new(shown, BufReader::new(file))?));
        }

        let factory = self
            .decompressor
            .as_ref()
            .ok_or_else(|| RpakError::CompressionUnavailable(shown.clone()))?;
        let reader = CompressedFileReader::new(shown, file, factory(), self.variant)?;
        Ok(Box::new(reader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::ArchiveHeader;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_rpak_file_names() {
        assert_eq!(rpak_file_name("common", 0), "common.rpak");
        assert_eq!(rpak_file_name("common", 3), "common(03).rpak");
        assert_eq!(rpak_file_name("mp_lobby", 12), "mp_lobby(12).rpak");
    }

    #[test]
    fn test_memory_reader_skip_and_read() {
        let mut reader = MemoryReader::from_bytes("mem", (0u8..32).collect());
        assert_eq!(reader.size(), 32);

        let mut buffer = [0u8; 4];
        reader.read_data(&mut buffer, 2).unwrap();
        assert_eq!(buffer, [2, 3, 4, 5]);

        reader.read_data(&mut buffer, 0).unwrap();
        assert_eq!(buffer, [6, 7, 8, 9]);
    }

    #[test]
    fn test_short_read_reports_name() {
        let mut reader = MemoryReader::from_bytes("short.rpak", vec![1, 2, 3]);
        let mut buffer = [0u8; 8];
        let err = reader.read_data(&mut buffer, 0).unwrap_err();
        match err {
            RpakError::FileIo { path, .. } => assert_eq!(path, PathBuf::from("short.rpak")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_directory_opener_plain_file() {
        let dir = TempDir::new().unwrap();
        let header = ArchiveHeader::new(Variant::Titanfall2);
        let mut file = File::create(dir.path().join("common(01).rpak")).unwrap();
        file.write_all(&header.to_bytes()).unwrap();
        drop(file);

        let opener = DirectoryOpener::new(dir.path(), Variant::Titanfall2);
        let reader = opener.open("common", 1).unwrap();
        assert_eq!(reader.size(), 0x58);
    }

    #[test]
    fn test_directory_opener_missing_file() {
        let dir = TempDir::new().unwrap();
        let opener = DirectoryOpener::new(dir.path(), Variant::Titanfall2);
        assert!(matches!(
            opener.open("absent", 0),
            Err(RpakError::FileIo { .. })
        ));
    }

    #[test]
    fn test_compressed_without_decompressor() {
        let dir = TempDir::new().unwrap();
        let mut header = ArchiveHeader::new(Variant::Titanfall2);
        header.flags = FLAG_COMPRESSED;
        std::fs::write(dir.path().join("packed.rpak"), header.to_bytes()).unwrap();

        let opener = DirectoryOpener::new(dir.path(), Variant::Titanfall2);
        assert!(matches!(
            opener.open("packed", 0),
            Err(RpakError::CompressionUnavailable(_))
        ));
    }
}
