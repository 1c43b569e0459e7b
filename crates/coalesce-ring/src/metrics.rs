use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

/// Thread-safe counters for monitoring queue occupancy and backpressure.
///
/// Each counter sits on its own cache line: `items_put` is hammered by every
/// producer while `items_drained` is hammered by the single consumer, and
/// letting them share a line would pointlessly bounce it between cores.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Items that have ever been put onto the queue.
    pub items_put: CachePadded<AtomicU64>,
    /// Items that have ever been drained off the queue.
    pub items_drained: CachePadded<AtomicU64>,
    /// Number of times a producer had to block because the queue was full.
    pub put_blocked: CachePadded<AtomicU64>,
    /// Number of times a drain call woke only because its deadline elapsed.
    pub drain_timeouts: CachePadded<AtomicU64>,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_put(&self) {
        self.items_put.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drained(&self, count: u64) {
        self.items_drained.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_blocked(&self) {
        self.put_blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_timeout(&self) {
        self.drain_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn items_put(&self) -> u64 {
        self.items_put.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn items_drained(&self) -> u64 {
        self.items_drained.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn put_blocked(&self) -> u64 {
        self.put_blocked.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn drain_timeouts(&self) -> u64 {
        self.drain_timeouts.load(Ordering::Relaxed)
    }
}
