//! Pool counters. Informational only; nothing in the pipeline branches on them.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[derive(Default)]
pub struct PoolStats {
    filled: AtomicU64,
    bytes_filled: AtomicU64,
    released: AtomicU64,
    free_empty_on_release: AtomicU64,
    filling: AtomicUsize,
    peak_ready: AtomicUsize,
}

/// Plain copy of [`PoolStats`] at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStatsSnapshot {
    /// Buffers published by the producer.
    pub filled: u64,
    pub bytes_filled: u64,
    /// Buffers returned to the free queue by the consumer.
    pub released: u64,
    /// Releases that found the free queue empty, i.e. the producer was
    /// waiting on the consumer.
    pub free_empty_on_release: u64,
    /// Highest ready-queue depth observed at publish time.
    pub peak_ready: usize,
}

impl PoolStats {
    pub(crate) fn record_fill_started(&self) {
        self.filling.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn record_fill_abandoned(&self) {
        self.filling.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn record_published(&self, bytes: usize, ready_depth: usize) {
        self.filled.fetch_add(1, Ordering::Relaxed);
        self.bytes_filled.fetch_add(bytes as u64, Ordering::Relaxed);
        self.filling.fetch_sub(1, Ordering::AcqRel);
        self.record_ready_depth(ready_depth);
    }

    pub(crate) fn record_released(&self, free_was_empty: bool) {
        self.released.fetch_add(1, Ordering::Relaxed);
        if free_was_empty {
            self.free_empty_on_release.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_ready_depth(&self, depth: usize) {
        let mut cur = self.peak_ready.load(Ordering::Relaxed);
        while depth > cur {
            match self.peak_ready.compare_exchange(
                cur,
                depth,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => cur = observed,
            }
        }
    }

    /// Buffers the producer currently holds outside every queue.
    pub fn filling(&self) -> usize {
        self.filling.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            filled: self.filled.load(Ordering::Relaxed),
            bytes_filled: self.bytes_filled.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            free_empty_on_release: self.free_empty_on_release.load(Ordering::Relaxed),
            peak_ready: self.peak_ready.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_only_moves_up() {
        let stats = PoolStats::default();
        for depth in [1, 3, 2] {
            stats.record_fill_started();
            stats.record_published(10, depth);
        }
        let snap = stats.snapshot();
        assert_eq!(snap.peak_ready, 3);
        assert_eq!(snap.filled, 3);
        assert_eq!(snap.bytes_filled, 30);
        assert_eq!(stats.filling(), 0);
    }
}
