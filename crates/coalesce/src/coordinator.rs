use std::error::Error;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use arc_swap::ArcSwap;
use coalesce_ring::Queue;

use crate::batcher::Batcher;
use crate::config::CoordinatorConfig;
use crate::error::CoalesceError;
use crate::mono::Mono;
use crate::sink::DeferredHandle;
use crate::tuple::Tuple;
use crate::worker_pool::FixedThreadPool;

/// Default number of workers in the pool a coordinator builds when none is
/// supplied explicitly (see [`Coordinator::create`]).
const DEFAULT_WORKERS: usize = 4;
const DEFAULT_BUFFER_CAPACITY: usize = 8192;

/// Coalesces concurrent single-argument calls into batched invocations of a
/// single callback, fanning results back out to each caller.
///
/// A coordinator owns an admission queue, a dedicated batcher thread, and a
/// worker pool; all three live for as long as the coordinator does and are
/// torn down together when it is dropped. Configuration is held as an atomic
/// snapshot: [`Coordinator::update_config`] takes effect for the next batch
/// that opens, never interrupting one already filling.
pub struct Coordinator<A, R> {
    queue_slot: Arc<Mutex<Arc<Queue<Tuple<A, R>>>>>,
    config: Arc<ArcSwap<CoordinatorConfig<A, R>>>,
    shutdown: Arc<AtomicBool>,
    _batcher: Batcher,
}

impl<A, R> Coordinator<A, R>
where
    A: Clone + Eq + Hash + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    /// Builds a coordinator with sensible defaults: a 4-worker fixed thread
    /// pool, an 8192-slot admission queue, and deduplication enabled.
    #[must_use]
    pub fn create<F>(window: Duration, max_size: usize, callback: F) -> Arc<Self>
    where
        F: Fn(Vec<A>) -> Result<Vec<R>, Box<dyn Error + Send + Sync>> + Send + Sync + 'static,
    {
        let config = CoordinatorConfig::new(
            window,
            max_size,
            DEFAULT_BUFFER_CAPACITY,
            true,
            Arc::new(callback),
            Arc::new(FixedThreadPool::new(DEFAULT_WORKERS)),
        );
        Self::with_config(config)
    }

    /// Builds a coordinator from a fully-specified config, for callers that
    /// need a custom worker pool, buffer capacity, or dedup setting.
    #[must_use]
    pub fn with_config(config: CoordinatorConfig<A, R>) -> Arc<Self> {
        let queue = Arc::new(Queue::new(coalesce_ring::Config::new(config.buffer_capacity)));
        let queue_slot = Arc::new(Mutex::new(queue));
        let config = Arc::new(ArcSwap::new(Arc::new(config)));
        let shutdown = Arc::new(AtomicBool::new(false));

        let batcher = Batcher::spawn(
            Arc::clone(&queue_slot),
            Arc::clone(&config),
            Arc::clone(&shutdown),
        );

        Arc::new(Self {
            queue_slot,
            config,
            shutdown,
            _batcher: batcher,
        })
    }

    /// Submits `args` and blocks the calling thread until the batch it ends
    /// up in is dispatched and this call's result is available.
    pub fn execute(&self, args: A) -> Result<R, CoalesceError> {
        let (tuple, completion) = Tuple::blocking(args);
        self.admit(tuple);
        completion.wait()
    }

    /// Submits `args` and returns a handle the caller can poll, block on
    /// (with or without a timeout), or cancel.
    #[must_use]
    pub fn execute_as_future(&self, args: A) -> DeferredHandle<R> {
        let (tuple, completion, cancel) = Tuple::deferred(args);
        self.admit(tuple);
        DeferredHandle { completion, cancel }
    }

    /// Returns a cold, re-subscribable handle for `args`. Nothing is
    /// submitted until [`Mono::subscribe`] is called.
    #[must_use]
    pub fn execute_as_mono(self: &Arc<Self>, args: A) -> Mono<A, R> {
        let this = Arc::clone(self);
        let submit = Arc::new(move |args: A| {
            let (tx, rx) = tokio::sync::oneshot::channel();
            let (tuple, cancel) = Tuple::reactive(args, tx);
            this.admit(tuple);
            (cancel, rx)
        });
        Mono::new(args, submit)
    }

    /// Replaces the coordinator's configuration. Takes effect for the next
    /// batch that opens; a batch already filling keeps using the snapshot it
    /// captured when its window started.
    ///
    /// A changed `buffer_capacity` additionally migrates every item still
    /// sitting in the admission queue onto a freshly-sized replacement,
    /// without dropping any of them.
    pub fn update_config(&self, new_config: CoordinatorConfig<A, R>) {
        let current_capacity = self.config.load().buffer_capacity;
        if new_config.buffer_capacity != current_capacity {
            self.rotate_queue(new_config.buffer_capacity);
        }
        self.config.store(Arc::new(new_config));
    }

    fn rotate_queue(&self, new_capacity: usize) {
        let mut slot = self.queue_slot.lock().unwrap_or_else(|e| e.into_inner());
        let old = Arc::clone(&slot);
        // Draining and closing must happen under one lock acquisition: a
        // producer holding its own Arc<Queue> clone from admit() could
        // otherwise land a put() in the gap between an empty-but-still-open
        // queue and it being marked closed, stranding that submission on a
        // queue nobody drains again.
        let backlog = old.close_and_drain();
        tracing::info!(new_capacity, migrated = backlog.len(), "rotating admission queue");
        let replacement = Arc::new(Queue::seeded(coalesce_ring::Config::new(new_capacity), backlog));
        *slot = replacement;
    }

    fn admit(&self, tuple: Tuple<A, R>) {
        let mut pending = tuple;
        loop {
            let queue = Arc::clone(&self.queue_slot.lock().unwrap_or_else(|e| e.into_inner()));
            match queue.put(pending) {
                Ok(()) => return,
                Err(rejected) => {
                    // Lost a race with a concurrent buffer-capacity rotation;
                    // retry against whichever queue is current now.
                    pending = rejected;
                    thread::yield_now();
                }
            }
        }
    }
}

impl<A, R> Drop for Coordinator<A, R> {
    fn drop(&mut self) {
        tracing::info!("coordinator shutting down");
        self.shutdown.store(true, Ordering::Release);
        self.queue_slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn sum_callback(args: Vec<i32>) -> Result<Vec<i32>, Box<dyn Error + Send + Sync>> {
        Ok(args.into_iter().map(|a| a * 10).collect())
    }

    #[test]
    fn execute_blocks_until_batch_dispatches() {
        let coordinator = Coordinator::create(Duration::from_millis(50), 8, sum_callback);
        assert_eq!(coordinator.execute(4).unwrap(), 40);
    }

    #[test]
    fn concurrent_calls_within_window_share_one_batch() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&invocations);
        let coordinator = Coordinator::create(Duration::from_millis(100), 16, move |args: Vec<i32>| {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(args.into_iter().map(|a| a + 1).collect())
        });

        let mut handles = vec![];
        for i in 0..8 {
            let coordinator = Arc::clone(&coordinator);
            handles.push(thread::spawn(move || coordinator.execute(i)));
        }
        let results: Vec<i32> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();

        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        let mut expected: Vec<i32> = (1..=8).collect();
        let mut results = results;
        results.sort_unstable();
        expected.sort_unstable();
        assert_eq!(results, expected);
    }

    #[test]
    fn size_close_dispatches_before_window_elapses() {
        let coordinator = Coordinator::create(Duration::from_secs(10), 2, sum_callback);
        let c2 = Arc::clone(&coordinator);
        let h1 = thread::spawn(move || c2.execute(1));
        thread::sleep(Duration::from_millis(10));
        let h2 = thread::spawn(move || coordinator.execute(2));

        assert_eq!(h1.join().unwrap().unwrap(), 10);
        assert_eq!(h2.join().unwrap().unwrap(), 20);
    }

    #[test]
    fn deferred_handle_can_be_cancelled_before_dispatch() {
        let coordinator = Coordinator::create(Duration::from_secs(10), 8, sum_callback);
        let handle = coordinator.execute_as_future(1);
        handle.cancel();
        assert!(matches!(handle.get(), Err(CoalesceError::Cancelled)));
    }

    #[test]
    fn arity_mismatch_fails_every_member() {
        let coordinator = Coordinator::create(Duration::from_millis(20), 8, |_args: Vec<i32>| Ok(vec![1]));
        let c2 = Arc::clone(&coordinator);
        let h1 = thread::spawn(move || c2.execute(1));
        let h2 = thread::spawn(move || coordinator.execute(2));

        assert!(matches!(
            h1.join().unwrap(),
            Err(CoalesceError::ArityMismatch { .. })
        ));
        assert!(matches!(
            h2.join().unwrap(),
            Err(CoalesceError::ArityMismatch { .. })
        ));
    }

    #[test]
    fn update_config_preserves_queued_items_across_capacity_change() {
        let coordinator = Coordinator::create(Duration::from_millis(200), 32, sum_callback);
        let c2 = Arc::clone(&coordinator);
        let handle = thread::spawn(move || c2.execute(3));
        thread::sleep(Duration::from_millis(5));

        let mut new_config = (*coordinator.config.load_full()).clone();
        new_config.buffer_capacity = 16;
        coordinator.update_config(new_config);

        assert_eq!(handle.join().unwrap().unwrap(), 30);
    }
}
