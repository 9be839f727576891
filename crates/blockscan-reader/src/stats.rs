//! Session counters, merged from the reader and its buffer pool.

use std::fmt;

use blockscan_mem::PoolStatsSnapshot;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    pub records_read: u64,
    /// Bytes turned into records, delimiters and skipped prefixes included.
    pub bytes_consumed: u64,
    pub buffers_filled: u64,
    pub bytes_filled: u64,
    pub buffers_released: u64,
    pub free_empty_on_release: u64,
    pub peak_ready_depth: usize,
}

impl ReaderStats {
    pub(crate) fn new(records_read: u64, bytes_consumed: u64, pool: PoolStatsSnapshot) -> Self {
        Self {
            records_read,
            bytes_consumed,
            buffers_filled: pool.filled,
            bytes_filled: pool.bytes_filled,
            buffers_released: pool.released,
            free_empty_on_release: pool.free_empty_on_release,
            peak_ready_depth: pool.peak_ready,
        }
    }
}

impl fmt::Display for ReaderStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "records={} consumed={}B filled={} ({}B) released={} free_empty={} peak_ready={}",
            self.records_read,
            self.bytes_consumed,
            self.buffers_filled,
            self.bytes_filled,
            self.buffers_released,
            self.free_empty_on_release,
            self.peak_ready_depth
        )
    }
}
