use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::backoff::Backoff;
use crate::config::Config;
use crate::invariants::{debug_assert_drain_bounded, debug_assert_within_capacity};
use crate::metrics::Metrics;

/// Outcome of [`Queue::drain_batch`].
#[derive(Debug)]
pub enum Drained<T> {
    /// At least one item was collected, in enqueue order.
    Items(Vec<T>),
    /// The deadline elapsed before any item arrived.
    TimedOut,
    /// The queue was closed; no further items will ever arrive on it.
    Closed,
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// A bounded, blocking, multi-producer multi-consumer queue.
///
/// Producers call [`Queue::put`] and block when the queue is full. A single
/// logical consumer drains items in enqueue-order batches with
/// [`Queue::drain_batch`], which can wait indefinitely, wait up to a
/// deadline, or return immediately once at least one item is present.
///
/// Closing the queue (see [`Queue::close`]) wakes every blocked producer and
/// consumer; producers get their item handed back so they can retry against
/// a replacement queue, which is how live buffer-capacity changes are
/// implemented one layer up.
pub struct Queue<T> {
    state: Mutex<State<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
    metrics: Metrics,
}

impl<T> Queue<T> {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(config.capacity().min(1024)),
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity: config.capacity(),
            metrics: Metrics::new(),
        }
    }

    /// Builds a queue pre-populated with `items`, for migrating buffered
    /// content off a queue being replaced (see [`Queue::close_and_drain`]).
    ///
    /// Deliberately bypasses the capacity check at construction: the
    /// migrated content may momentarily exceed `config.capacity()` if the
    /// new capacity is smaller than the old queue held, and must not be
    /// dropped on the floor for that reason. The queue still enforces
    /// capacity for every `put` after this.
    #[must_use]
    pub fn seeded(config: Config, items: Vec<T>) -> Self {
        Self {
            state: Mutex::new(State {
                items: items.into(),
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity: config.capacity(),
            metrics: Metrics::new(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).closed
    }

    /// Appends `item`, blocking the caller while the queue is full.
    ///
    /// Returns the item back if the queue is closed, so the caller can
    /// resubmit it against a replacement queue.
    pub fn put(&self, item: T) -> Result<(), T> {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut blocked_once = false;
        loop {
            if guard.closed {
                return Err(item);
            }
            if guard.items.len() < self.capacity {
                guard.items.push_back(item);
                debug_assert_within_capacity!(guard.items.len(), self.capacity);
                drop(guard);
                self.metrics.record_put();
                self.not_empty.notify_one();
                return Ok(());
            }
            if !blocked_once {
                self.metrics.record_blocked();
                blocked_once = true;
                tracing::trace!(capacity = self.capacity, "producer blocked, queue full");
            }
            guard = self.not_full.wait(guard).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Drains up to `max` items in enqueue order.
    ///
    /// * `deadline = None` waits indefinitely for the first item (used by an
    ///   idle consumer with nothing buffered yet).
    /// * `deadline = Some(t)` waits only until `t`; if nothing has arrived by
    ///   then, returns [`Drained::TimedOut`] rather than blocking further.
    ///
    /// A brief adaptive spin runs before parking on the condition variable,
    /// which avoids a syscall round-trip for the common case where a put is
    /// already in flight.
    pub fn drain_batch(&self, max: usize, deadline: Option<Instant>) -> Drained<T> {
        debug_assert!(max > 0, "drain_batch called with max == 0");

        let mut backoff = Backoff::new();
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if !guard.items.is_empty() {
                let n = max.min(guard.items.len());
                let batch: Vec<T> = guard.items.drain(..n).collect();
                debug_assert_drain_bounded!(batch.len(), max);
                drop(guard);
                self.metrics.record_drained(batch.len() as u64);
                self.not_full.notify_all();
                return Drained::Items(batch);
            }
            if guard.closed {
                return Drained::Closed;
            }

            match deadline {
                None => {
                    if backoff.spin() {
                        drop(guard);
                        guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
                        continue;
                    }
                    guard = self
                        .not_empty
                        .wait(guard)
                        .unwrap_or_else(|e| e.into_inner());
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        self.metrics.record_timeout();
                        return Drained::TimedOut;
                    }
                    let remaining = deadline - now;
                    if backoff.spin() && remaining > Duration::from_micros(50) {
                        drop(guard);
                        guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
                        continue;
                    }
                    let (g, timeout) = self
                        .not_empty
                        .wait_timeout(guard, remaining)
                        .unwrap_or_else(|e| e.into_inner());
                    guard = g;
                    if timeout.timed_out() && guard.items.is_empty() && !guard.closed {
                        self.metrics.record_timeout();
                        return Drained::TimedOut;
                    }
                }
            }
        }
    }

    /// Closes the queue, waking every blocked producer and consumer.
    ///
    /// Idempotent. Items already buffered remain available to a subsequent
    /// [`Queue::drain_batch`] call; only once the queue is empty does
    /// draining report [`Drained::Closed`].
    pub fn close(&self) {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        guard.closed = true;
        let remaining = guard.items.len();
        drop(guard);
        tracing::debug!(remaining, "queue closed");
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Atomically drains every remaining item and marks the queue closed,
    /// under a single acquisition of the internal lock.
    ///
    /// Unlike calling a hypothetical drain-then-`close`, no
    /// `put` can land in the gap between the two: a caller that obtained this
    /// `Arc<Queue>` before a rotation began sees either "queue not yet
    /// closed, item enqueued" (and the eventual retry loop in the consumer
    /// still drains it before anyone else takes over) or "queue already
    /// closed, item handed back for resubmission" — never a successful `put`
    /// into a queue nobody will ever drain again.
    pub fn close_and_drain(&self) -> Vec<T> {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        guard.closed = true;
        let items = guard.items.drain(..).collect();
        drop(guard);
        self.not_full.notify_all();
        self.not_empty.notify_all();
        items
    }
}
