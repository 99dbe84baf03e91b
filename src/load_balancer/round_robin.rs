//! Round-robin cursor.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared rotating cursor.
///
/// Each call to `next_start` consumes exactly one advance, so concurrent
/// requests never share a starting position within one cycle.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next starting index in `0..len`.
    pub fn next_start(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.counter.fetch_add(1, Ordering::Relaxed) % len
    }

    /// Indices to try for one request: `start`, then the rest in cycle order.
    /// Every index appears exactly once.
    pub fn failover_order(start: usize, len: usize) -> impl Iterator<Item = usize> {
        (0..len).map(move |i| (start + i) % len)
    }
}
