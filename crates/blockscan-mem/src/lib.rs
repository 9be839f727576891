#![forbid(unsafe_code)]
//! blockscan-mem: memory budget, fixed-capacity buffers and the bounded
//! buffer pool shared by the worker and the tokenizer.
//!
//! Every buffer is an owned [`FixedBuffer`] that is moved between the free
//! and ready queues, so a buffer can only ever be in one place. All pooled
//! memory is reserved against a [`MemoryBudget`] before it is allocated.

pub mod budget;
pub mod buffer;
pub mod error;
pub mod pool;
pub mod stats;

pub use budget::{MemoryBudget, Reservation};
pub use buffer::FixedBuffer;
pub use pool::{BufferPool, Census, PoolConsumer, PoolProducer};
pub use stats::{PoolStats, PoolStatsSnapshot};
