//! Local file positioned at the start of one block.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use blockscan_core::BlockRange;

use crate::error::{Error, Result};

/// A file opened and positioned at a block offset.
///
/// The source does not stop at the block end: the reader enforces the
/// length and must be able to finish a record that crosses it.
pub struct FileBlockSource {
    file: File,
    path: PathBuf,
    position: u64,
}

impl FileBlockSource {
    pub fn open(path: impl AsRef<Path>, offset: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).map_err(|source| Error::Open {
            path: path.clone(),
            source,
        })?;
        if offset > 0 {
            file.seek(SeekFrom::Start(offset))
                .map_err(|source| Error::Seek {
                    path: path.clone(),
                    offset,
                    source,
                })?;
        }
        tracing::debug!(path = %path.display(), offset, "opened block source");
        Ok(Self {
            file,
            path,
            position: offset,
        })
    }

    pub fn open_block(path: impl AsRef<Path>, range: &BlockRange) -> Result<Self> {
        Self::open(path, range.offset)
    }

    /// Absolute offset of the next byte to be read.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File length in bytes.
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Read for FileBlockSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.file.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ByteSource;
    use std::fs;

    fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("blockscan-io-{}-{name}", std::process::id()));
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn starts_reading_at_the_block_offset() {
        let path = temp_file("offset", b"0123456789");
        let mut src = FileBlockSource::open_block(&path, &BlockRange::new(4, 3)).unwrap();
        assert_eq!(src.position(), 4);
        assert_eq!(src.len().unwrap(), 10);

        let mut buf = [0u8; 16];
        let n = src.read_bytes(&mut buf).unwrap();
        // Reads past the block length; the reader applies the limit.
        assert_eq!(&buf[..n], b"456789");
        assert_eq!(src.position(), 10);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = FileBlockSource::open("/definitely/not/here.csv", 0)
            .err()
            .unwrap();
        assert!(err.to_string().contains("/definitely/not/here.csv"));
    }
}
