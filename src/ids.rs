//! Transaction id allocation.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::model::TxId;

/// Issues unique, strictly increasing transaction ids.
///
/// Safe to share between threads. Ids start at 1 and are never reused for the
/// lifetime of the allocator.
///
/// Known limitation: the counter is a `u32`, so an allocator can hand out at most
/// `u32::MAX - 1` ids; going past that wraps around and breaks uniqueness.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(1),
        }
    }

    pub fn next(&self) -> TxId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
