//! Hard cap on the bytes a reader session may allocate.
//!
//! The buffer pool and the overflow arena each take a [`Reservation`]
//! before allocating; its drop hands the bytes back, unwinding included.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Cloneable handle to one shared byte cap.
#[derive(Clone)]
pub struct MemoryBudget {
    cap: usize,
    in_use: Arc<AtomicUsize>,
}

impl MemoryBudget {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            cap: capacity_bytes,
            in_use: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Bytes held by live reservations. Racy under concurrent use.
    pub fn used_bytes(&self) -> usize {
        self.in_use.load(Ordering::Relaxed)
    }

    pub fn capacity_bytes(&self) -> usize {
        self.cap
    }

    /// Reserve `bytes`, or `None` when the cap would be exceeded.
    pub fn try_reserve(&self, bytes: usize, tag: &'static str) -> Option<Reservation> {
        let cap = self.cap;
        self.in_use
            .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |held| {
                held.checked_add(bytes).filter(|&total| total <= cap)
            })
            .ok()?;
        Some(Reservation {
            in_use: Arc::clone(&self.in_use),
            bytes,
            tag,
        })
    }

    /// [`try_reserve`](Self::try_reserve), reporting the shortfall as an error.
    pub fn reserve(&self, bytes: usize, tag: &'static str) -> Result<Reservation> {
        self.try_reserve(bytes, tag).ok_or_else(|| Error::BudgetExceeded {
            tag,
            requested: bytes,
            capacity: self.cap,
            used: self.used_bytes(),
        })
    }
}

impl fmt::Debug for MemoryBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBudget")
            .field("used", &self.used_bytes())
            .field("capacity", &self.cap)
            .finish()
    }
}

/// Bytes charged to a [`MemoryBudget`] until dropped.
pub struct Reservation {
    in_use: Arc<AtomicUsize>,
    bytes: usize,
    tag: &'static str,
}

impl Reservation {
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.in_use.fetch_sub(self.bytes, Ordering::AcqRel);
    }
}

impl fmt::Debug for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reservation({} bytes for {})", self.bytes, self.tag)
    }
}
