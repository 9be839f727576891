//! Bounded buffer pool connecting one producer and one consumer.
//!
//! Three buffer states, each an ownership location:
//! - *free*: a bounded channel the producer pulls from,
//! - *ready*: a bounded channel of filled buffers, strictly FIFO,
//! - *held*: consumer-local, buffers a live record still points into.
//!
//! Both channels have capacity `queue_size` and exactly `queue_size` buffers
//! exist, so sends never block; the only blocking points are the producer
//! waiting for a free buffer and the consumer waiting for a ready one.
//! Shutdown is a one-slot side channel the producer selects on together with
//! the free queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};

use crate::budget::{MemoryBudget, Reservation};
use crate::buffer::FixedBuffer;
use crate::error::{Error, Result};
use crate::stats::{PoolStats, PoolStatsSnapshot};

struct PoolShared {
    queue_size: usize,
    buffer_size: usize,
    stats: PoolStats,
    shutdown: AtomicBool,
    _reservation: Reservation,
}

/// Counts of buffers per ownership location at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Census {
    pub free: usize,
    pub ready: usize,
    pub held: usize,
    pub current: usize,
    /// Taken by the producer and not yet published.
    pub filling: usize,
}

impl Census {
    pub fn total(&self) -> usize {
        self.free + self.ready + self.held + self.current + self.filling
    }
}

pub struct BufferPool;

impl BufferPool {
    /// Allocate `queue_size` buffers of `buffer_size` bytes from one
    /// contiguous region and split the pool into its two halves.
    ///
    /// Fails before allocating anything if the budget cannot cover the pool.
    pub fn allocate(
        queue_size: usize,
        buffer_size: usize,
        budget: &MemoryBudget,
    ) -> Result<(PoolProducer, PoolConsumer)> {
        if queue_size == 0 || buffer_size == 0 {
            return Err(Error::InvalidPool(format!(
                "queue_size={queue_size}, buffer_size={buffer_size}"
            )));
        }
        let total = queue_size
            .checked_mul(buffer_size)
            .ok_or_else(|| Error::InvalidPool("pool size overflows usize".into()))?;
        let reservation = budget.reserve(total, "buffer_pool")?;

        let mut region = BytesMut::with_capacity(total);
        region.resize(total, 0);

        let (free_tx, free_rx) = bounded(queue_size);
        let (ready_tx, ready_rx) = bounded(queue_size);
        let (shutdown_tx, shutdown_rx) = bounded(1);

        for id in 0..queue_size {
            let chunk = region.split_to(buffer_size);
            free_tx
                .try_send(FixedBuffer::new(id, chunk))
                .map_err(|_| Error::InvalidPool("free queue rejected initial buffer".into()))?;
        }
        tracing::debug!(queue_size, buffer_size, total, "buffer pool allocated");

        let shared = Arc::new(PoolShared {
            queue_size,
            buffer_size,
            stats: PoolStats::default(),
            shutdown: AtomicBool::new(false),
            _reservation: reservation,
        });

        let producer = PoolProducer {
            free_rx: free_rx.clone(),
            free_tx: free_tx.clone(),
            ready_tx,
            shutdown_rx,
            shared: Arc::clone(&shared),
        };
        let consumer = PoolConsumer {
            free_tx,
            free_rx,
            ready_rx,
            shutdown_tx,
            held: Vec::with_capacity(queue_size),
            shared,
        };
        Ok((producer, consumer))
    }
}

/// Producer half: takes free buffers, publishes filled ones.
pub struct PoolProducer {
    free_rx: Receiver<FixedBuffer>,
    free_tx: Sender<FixedBuffer>,
    ready_tx: Sender<FixedBuffer>,
    shutdown_rx: Receiver<()>,
    shared: Arc<PoolShared>,
}

impl PoolProducer {
    /// Block until a buffer is free. `None` once shutdown was signalled or
    /// the consumer is gone.
    pub fn acquire_free(&self) -> Option<FixedBuffer> {
        let buf: Option<FixedBuffer> = select! {
            recv(self.free_rx) -> msg => msg.ok(),
            recv(self.shutdown_rx) -> _ => None,
        };
        let buf = buf?;
        self.shared.stats.record_fill_started();
        Some(buf)
    }

    /// Hand a filled buffer to the consumer. Gives the buffer back if the
    /// consumer has gone away.
    pub fn publish_ready(&self, buf: FixedBuffer) -> std::result::Result<(), FixedBuffer> {
        let bytes = buf.readable();
        match self.ready_tx.send(buf) {
            Ok(()) => {
                self.shared
                    .stats
                    .record_published(bytes, self.ready_tx.len());
                Ok(())
            }
            Err(e) => Err(e.into_inner()),
        }
    }

    /// Return an unfilled buffer to the free queue, used on the exit path.
    pub fn recycle(&self, buf: FixedBuffer) {
        self.shared.stats.record_fill_abandoned();
        if let Err(e) = self.free_tx.try_send(buf) {
            tracing::warn!(error = %e, "free queue rejected recycled buffer");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    pub fn buffer_size(&self) -> usize {
        self.shared.buffer_size
    }
}

/// Consumer half: takes ready buffers, returns or holds drained ones.
///
/// The held queue lives here and is only touched by the consumer thread.
pub struct PoolConsumer {
    free_tx: Sender<FixedBuffer>,
    // Keeps the free queue connected after the producer exits.
    free_rx: Receiver<FixedBuffer>,
    ready_rx: Receiver<FixedBuffer>,
    shutdown_tx: Sender<()>,
    held: Vec<FixedBuffer>,
    shared: Arc<PoolShared>,
}

impl PoolConsumer {
    /// Block until the next filled buffer arrives, in fill order. `None` once
    /// the producer has exited and the ready queue is drained.
    pub fn acquire_ready(&self) -> Option<FixedBuffer> {
        self.ready_rx.recv().ok()
    }

    /// Give a drained buffer back to the producer.
    pub fn release_free(&self, buf: FixedBuffer) {
        let was_empty = self.free_rx.is_empty();
        match self.free_tx.try_send(buf) {
            Ok(()) => self.shared.stats.record_released(was_empty),
            Err(TrySendError::Full(buf)) | Err(TrySendError::Disconnected(buf)) => {
                tracing::warn!(buffer = buf.id(), "free queue rejected released buffer");
            }
        }
    }

    /// Park a drained buffer that the record being assembled still aliases.
    pub fn hold(&mut self, buf: FixedBuffer) {
        self.held.push(buf);
    }

    /// Return every held buffer to the free queue. Returns how many.
    pub fn release_held(&mut self) -> usize {
        let n = self.held.len();
        let held = std::mem::take(&mut self.held);
        for buf in held {
            self.release_free(buf);
        }
        n
    }

    pub fn held(&self) -> &[FixedBuffer] {
        &self.held
    }

    /// Ask the producer to stop. Wakes it if it is waiting for a free buffer;
    /// a source read already in progress completes first.
    pub fn signal_shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
        let _ = self.shutdown_tx.try_send(());
    }

    /// Snapshot of where the buffers are. `current` is supplied by the caller
    /// since the consumer's current buffer lives outside the pool.
    pub fn census(&self, current: usize) -> Census {
        Census {
            free: self.free_rx.len(),
            ready: self.ready_rx.len(),
            held: self.held.len(),
            current,
            filling: self.shared.stats.filling(),
        }
    }

    pub fn stats(&self) -> PoolStatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn queue_size(&self) -> usize {
        self.shared.queue_size
    }

    pub fn buffer_size(&self) -> usize {
        self.shared.buffer_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(producer: &PoolProducer, bytes: &[u8]) {
        let mut buf = producer.acquire_free().unwrap();
        buf.reset();
        buf.spare_mut()[..bytes.len()].copy_from_slice(bytes);
        buf.set_readable(bytes.len());
        producer.publish_ready(buf).unwrap();
    }

    #[test]
    fn buffers_flow_in_fifo_order_and_census_is_constant() {
        let budget = MemoryBudget::new(1 << 20);
        let (producer, mut consumer) = BufferPool::allocate(4, 16, &budget).unwrap();
        assert_eq!(budget.used_bytes(), 64);
        assert_eq!(consumer.census(0).total(), 4);

        fill(&producer, b"first");
        fill(&producer, b"second");
        assert_eq!(consumer.census(0).ready, 2);
        assert_eq!(consumer.census(0).total(), 4);

        let a = consumer.acquire_ready().unwrap();
        assert_eq!(a.unread(), b"first");
        let b = consumer.acquire_ready().unwrap();
        assert_eq!(b.unread(), b"second");
        assert_eq!(consumer.census(2).total(), 4);

        consumer.hold(a);
        assert_eq!(consumer.census(1).held, 1);
        assert_eq!(consumer.census(1).total(), 4);
        assert_eq!(consumer.held()[0].id(), 0);

        assert_eq!(consumer.release_held(), 1);
        consumer.release_free(b);
        assert_eq!(consumer.census(0).free, 4);

        let stats = consumer.stats();
        assert_eq!(stats.filled, 2);
        assert_eq!(stats.bytes_filled, 11);
        assert_eq!(stats.released, 2);
    }

    #[test]
    fn pool_reservation_is_released_when_both_halves_drop() {
        let budget = MemoryBudget::new(1 << 20);
        let (producer, consumer) = BufferPool::allocate(2, 1024, &budget).unwrap();
        assert_eq!(budget.used_bytes(), 2048);
        drop(producer);
        assert_eq!(budget.used_bytes(), 2048);
        drop(consumer);
        assert_eq!(budget.used_bytes(), 0);
    }

    #[test]
    fn allocation_over_budget_fails_up_front() {
        let budget = MemoryBudget::new(100);
        let err = BufferPool::allocate(4, 64, &budget).err().unwrap();
        assert!(matches!(err, Error::BudgetExceeded { requested: 256, .. }));
        assert_eq!(budget.used_bytes(), 0);
    }

    #[test]
    fn shutdown_wakes_a_waiting_producer() {
        let budget = MemoryBudget::new(1 << 20);
        let (producer, consumer) = BufferPool::allocate(2, 8, &budget).unwrap();
        let a = producer.acquire_free().unwrap();
        let b = producer.acquire_free().unwrap();

        let waiter = std::thread::spawn(move || {
            let got = producer.acquire_free();
            (got.is_none(), producer.is_shutdown())
        });
        consumer.signal_shutdown();
        let (woke_empty, saw_flag) = waiter.join().unwrap();
        assert!(woke_empty);
        assert!(saw_flag);
        drop((a, b));
    }

    #[test]
    fn consumer_sees_end_when_producer_exits() {
        let budget = MemoryBudget::new(1 << 20);
        let (producer, consumer) = BufferPool::allocate(2, 8, &budget).unwrap();
        fill(&producer, b"x");
        drop(producer);
        assert!(consumer.acquire_ready().is_some());
        assert!(consumer.acquire_ready().is_none());
    }
}
