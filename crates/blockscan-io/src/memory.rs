//! In-memory byte source for tests and benches.

use std::io::{self, Read};
use std::sync::Arc;

/// Serves bytes from memory, optionally at most `chunk` bytes per read to
/// model a transport that returns short reads.
#[derive(Clone)]
pub struct MemorySource {
    data: Arc<[u8]>,
    pos: usize,
    chunk: Option<usize>,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Arc::from(bytes.into()),
            pos: 0,
            chunk: None,
        }
    }

    /// Every read returns at most `chunk` bytes (at least one).
    pub fn chunked(bytes: impl Into<Vec<u8>>, chunk: usize) -> Self {
        Self {
            chunk: Some(chunk.max(1)),
            ..Self::new(bytes)
        }
    }

    /// Start serving at `offset`, as the IO layer does for a block that
    /// begins mid-file.
    pub fn at_offset(mut self, offset: u64) -> Self {
        self.pos = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.data.len());
        self
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl Read for MemorySource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut n = buf.len().min(self.remaining());
        if let Some(chunk) = self.chunk {
            n = n.min(chunk);
        }
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
