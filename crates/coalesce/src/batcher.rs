use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use arc_swap::ArcSwap;
use coalesce_ring::{Drained, Queue};

use crate::batch::Batch;
use crate::config::CoordinatorConfig;
use crate::dispatcher;
use crate::invariants::debug_assert_batch_bounded;
use crate::tuple::Tuple;

/// Drives the Idle → Filling → Closing state machine for one coordinator.
///
/// Runs on its own dedicated thread for the coordinator's lifetime. Closed
/// batches are handed off to the configured worker pool so the batcher
/// itself never blocks on a callback.
pub(crate) struct Batcher {
    join: Option<JoinHandle<()>>,
}

impl Batcher {
    pub(crate) fn spawn<A, R>(
        queue_slot: Arc<Mutex<Arc<Queue<Tuple<A, R>>>>>,
        config: Arc<ArcSwap<CoordinatorConfig<A, R>>>,
        shutdown: Arc<AtomicBool>,
    ) -> Self
    where
        A: Clone + Eq + Hash + Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        let join = thread::Builder::new()
            .name("coalesce-batcher".to_string())
            .spawn(move || run(&queue_slot, &config, &shutdown))
            .expect("failed to spawn batcher thread");
        Self { join: Some(join) }
    }
}

impl Drop for Batcher {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn current_queue<A, R>(queue_slot: &Mutex<Arc<Queue<Tuple<A, R>>>>) -> Arc<Queue<Tuple<A, R>>> {
    Arc::clone(&queue_slot.lock().unwrap_or_else(|e| e.into_inner()))
}

fn run<A, R>(
    queue_slot: &Mutex<Arc<Queue<Tuple<A, R>>>>,
    config: &ArcSwap<CoordinatorConfig<A, R>>,
    shutdown: &AtomicBool,
) where
    A: Clone + Eq + Hash + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    'outer: loop {
        if shutdown.load(Ordering::Acquire) {
            return;
        }

        let queue = current_queue(queue_slot);
        // The snapshot captured here governs this whole batch, even if
        // update_config runs while the batch is still filling.
        let snapshot = config.load_full();

        let members = match queue.drain_batch(snapshot.max_size, None) {
            Drained::Items(items) => items,
            Drained::TimedOut => {
                unreachable!("an indefinite wait (no deadline) cannot time out")
            }
            Drained::Closed => {
                if shutdown.load(Ordering::Acquire) {
                    return;
                }
                // The queue was closed by a live buffer-capacity swap, not by
                // coordinator shutdown. Loop back around and pick up the
                // freshly-swapped queue.
                continue 'outer;
            }
        };

        let t0 = Instant::now();
        let deadline = t0 + snapshot.window;
        let mut members = members;

        while members.len() < snapshot.max_size {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let remaining = snapshot.max_size - members.len();
            match queue.drain_batch(remaining, Some(deadline)) {
                Drained::Items(more) => members.extend(more),
                Drained::TimedOut => break,
                Drained::Closed => {
                    if shutdown.load(Ordering::Acquire) {
                        close_and_dispatch(members, &snapshot);
                        return;
                    }
                    // Rotation again: close out this batch early with what it
                    // has rather than lose already-admitted members.
                    break;
                }
            }
        }

        close_and_dispatch(members, &snapshot);
    }
}

fn close_and_dispatch<A, R>(raw_members: Vec<Tuple<A, R>>, snapshot: &Arc<CoordinatorConfig<A, R>>)
where
    A: Clone + Eq + Hash + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    // A member that lost its race with a concurrent cancel() never joins the
    // batch; it has already been resolved with Cancelled by the caller.
    let members: Vec<_> = raw_members
        .into_iter()
        .filter(|tuple| tuple.cancel.try_mark_batched())
        .collect();

    if members.is_empty() {
        return;
    }

    debug_assert_batch_bounded!(members.len(), snapshot.max_size);
    let batch = Batch::form(members, snapshot.remove_duplicates);
    tracing::debug!(
        members = batch.members.len(),
        unique = batch.unique_args.len(),
        "batch closed, submitting to worker pool"
    );
    let snapshot = Arc::clone(snapshot);
    snapshot
        .worker_pool
        .submit(Box::new(move || dispatcher::dispatch(batch, &snapshot)));
}
