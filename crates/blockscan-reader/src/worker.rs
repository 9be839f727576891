//! Producer loop: fills free buffers from the byte source and publishes them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use blockscan_io::ByteSource;
use blockscan_mem::PoolProducer;

/// Bytes the consumer has turned into records so far, published at the start
/// of every record read. The worker stops filling once it passes the limit.
#[derive(Debug, Clone, Default)]
pub(crate) struct ConsumedGate(Arc<AtomicU64>);

impl ConsumedGate {
    pub(crate) fn publish(&self, consumed: u64) {
        self.0.store(consumed, Ordering::Release);
    }

    pub(crate) fn load(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}

pub(crate) struct Worker<S> {
    source: S,
    pool: PoolProducer,
    gate: ConsumedGate,
    block_size: u64,
}

impl<S: ByteSource + 'static> Worker<S> {
    pub(crate) fn new(source: S, pool: PoolProducer, gate: ConsumedGate, block_size: u64) -> Self {
        Self {
            source,
            pool,
            gate,
            block_size,
        }
    }

    pub(crate) fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("blockscan-worker".into())
            .spawn(move || self.run())
    }

    fn limit_passed(&self) -> bool {
        self.block_size > 0 && self.gate.load() > self.block_size
    }

    fn run(mut self) {
        tracing::debug!(
            buffer_size = self.pool.buffer_size(),
            block_size = self.block_size,
            "worker started"
        );
        let mut fills = 0u64;
        loop {
            let Some(mut buf) = self.pool.acquire_free() else {
                tracing::debug!(fills, "worker woken for shutdown");
                break;
            };
            if self.pool.is_shutdown() {
                self.pool.recycle(buf);
                tracing::debug!(fills, "worker saw shutdown flag");
                break;
            }
            if self.limit_passed() {
                self.pool.recycle(buf);
                tracing::debug!(
                    fills,
                    consumed = self.gate.load(),
                    block_size = self.block_size,
                    "block limit passed, worker stopping"
                );
                break;
            }

            buf.reset();
            let n = match self.source.read_bytes(buf.spare_mut()) {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(error = %e, "byte source failed; treating as end of input");
                    0
                }
            };
            buf.set_readable(n);
            fills += 1;

            if let Err(buf) = self.pool.publish_ready(buf) {
                self.pool.recycle(buf);
                tracing::debug!(fills, "consumer gone, worker stopping");
                break;
            }
            if n == 0 {
                tracing::debug!(fills, "byte source exhausted");
                break;
            }
            tracing::trace!(bytes = n, "buffer published");
        }
    }
}
