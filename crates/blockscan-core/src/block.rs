//! Byte range of one storage block.
//!
//! The offset positions the byte source (done by the IO layer before a reader
//! exists); the length is the limit the reader enforces while consuming.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub offset: u64,
    /// 0 means "read to the end of the source".
    pub length: u64,
}

impl BlockRange {
    pub const fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// The whole source, no limit.
    pub const fn unbounded() -> Self {
        Self { offset: 0, length: 0 }
    }

    pub fn is_bounded(&self) -> bool {
        self.length > 0
    }

    /// A block that does not start at the beginning of the file begins in the
    /// middle of some record, which belongs to the previous block.
    pub fn starts_mid_file(&self) -> bool {
        self.offset > 0
    }

    /// Exclusive end offset, `None` when unbounded.
    pub fn end(&self) -> Option<u64> {
        self.is_bounded()
            .then(|| self.offset.saturating_add(self.length))
    }

    /// Split `[0, total)` into consecutive blocks of `block_size` bytes.
    pub fn split(total: u64, block_size: u64) -> Vec<BlockRange> {
        if block_size == 0 {
            return vec![BlockRange::unbounded()];
        }
        let mut out = Vec::new();
        let mut offset = 0;
        while offset < total {
            out.push(BlockRange::new(offset, block_size));
            offset += block_size;
        }
        out
    }
}
