use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use crate::worker_pool::WorkerPool;

/// The callback a coordinator invokes once per closed batch: it receives the
/// deduplicated argument tuples and must return exactly one result per
/// argument, in the same order, or an error that fails the whole batch.
pub type Callback<A, R> =
    Arc<dyn Fn(Vec<A>) -> Result<Vec<R>, Box<dyn Error + Send + Sync>> + Send + Sync>;

/// An immutable snapshot of everything that governs how a coordinator forms
/// and closes batches.
///
/// A coordinator holds its config behind an atomic pointer swap
/// ([`arc_swap::ArcSwap`]) rather than a lock: readers (the batcher, each
/// `execute` call) take a cheap snapshot of whichever config was current the
/// instant they looked, and an in-flight batch keeps using the snapshot it
/// captured when its window opened even if `update_config` runs concurrently.
pub struct CoordinatorConfig<A, R> {
    /// Maximum time a batch stays open after its first member arrives.
    pub window: Duration,
    /// Maximum number of members a batch may hold before closing early.
    pub max_size: usize,
    /// Capacity of the admission queue new submissions are placed into.
    pub buffer_capacity: usize,
    /// Whether structurally-equal argument tuples are deduplicated before
    /// the callback runs.
    pub remove_duplicates: bool,
    /// The batch callback.
    pub callback: Callback<A, R>,
    /// Where closed batches are dispatched to run.
    pub worker_pool: Arc<dyn WorkerPool>,
}

impl<A, R> Clone for CoordinatorConfig<A, R> {
    fn clone(&self) -> Self {
        Self {
            window: self.window,
            max_size: self.max_size,
            buffer_capacity: self.buffer_capacity,
            remove_duplicates: self.remove_duplicates,
            callback: Arc::clone(&self.callback),
            worker_pool: Arc::clone(&self.worker_pool),
        }
    }
}

impl<A, R> CoordinatorConfig<A, R> {
    /// # Panics
    ///
    /// Panics if `max_size` or `buffer_capacity` is zero, or if
    /// `buffer_capacity` is smaller than `max_size` — the admission queue
    /// must be able to hold at least one full batch.
    #[must_use]
    pub fn new(
        window: Duration,
        max_size: usize,
        buffer_capacity: usize,
        remove_duplicates: bool,
        callback: Callback<A, R>,
        worker_pool: Arc<dyn WorkerPool>,
    ) -> Self {
        assert!(max_size > 0, "max_size must be at least 1");
        assert!(buffer_capacity > 0, "buffer_capacity must be at least 1");
        assert!(
            buffer_capacity >= max_size,
            "buffer_capacity ({buffer_capacity}) must be at least max_size ({max_size})"
        );
        Self {
            window,
            max_size,
            buffer_capacity,
            remove_duplicates,
            callback,
            worker_pool,
        }
    }
}
