use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::CoalesceError;

/// Tracks whether a submission is still sitting in the admission queue, has
/// already been handed to a batch, or was cancelled while still waiting.
///
/// The transition from `InRing` to `Batched` races against a caller's
/// `cancel()`, which tries to move straight from `InRing` to `Cancelled`.
/// Exactly one of the two succeeds, which is what gives a cancelled
/// submission at-most-once delivery semantics without a lock.
pub(crate) struct CancelState(AtomicU8);

impl CancelState {
    const IN_RING: u8 = 0;
    const BATCHED: u8 = 1;
    const CANCELLED: u8 = 2;

    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(Self::IN_RING))
    }

    /// Called by the batcher when it pulls a tuple out of the admission
    /// queue. Returns `true` if the tuple should be included in the batch
    /// being formed, `false` if it lost the race to a concurrent `cancel()`
    /// and must be silently dropped (it has already been resolved).
    pub(crate) fn try_mark_batched(&self) -> bool {
        self.0
            .compare_exchange(Self::IN_RING, Self::BATCHED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Called by a cancelling caller. Returns `true` if the cancellation won
    /// the race (the tuple was still in the ring) and the caller is
    /// responsible for resolving the sink with `Cancelled`. Returns `false`
    /// if the tuple was already batched or already cancelled, in which case
    /// cancellation is a no-op — per this design's resolution of the
    /// ambiguous post-dispatch cancellation behavior, a cancel that loses
    /// the race never interrupts or overrides the callback's own delivery.
    pub(crate) fn try_cancel(&self) -> bool {
        self.0
            .compare_exchange(Self::IN_RING, Self::CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire) == Self::CANCELLED
    }
}

/// A single-assignment result cell shared between the submitter and the
/// dispatcher. Backs both the [`Blocking`](crate::coordinator) and
/// `Deferred` delivery modalities, which differ only in how the caller
/// observes it (implicit park-and-return vs. an explicit handle).
pub(crate) struct Completion<R> {
    slot: Mutex<Option<Result<R, CoalesceError>>>,
    ready: Condvar,
}

impl<R: Clone> Completion<R> {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// Resolves the cell. A second call after the first is a programming
    /// error and is silently ignored, matching single-assignment semantics.
    pub(crate) fn resolve(&self, result: Result<R, CoalesceError>) {
        let mut guard = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_none() {
            *guard = Some(result);
            drop(guard);
            self.ready.notify_all();
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Blocks until resolved.
    pub(crate) fn wait(&self) -> Result<R, CoalesceError> {
        let mut guard = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        while guard.is_none() {
            guard = self.ready.wait(guard).unwrap_or_else(|e| e.into_inner());
        }
        guard.clone().expect("checked Some above")
    }

    /// Blocks until resolved or `timeout` elapses, whichever comes first.
    /// A timeout here never affects the underlying submission — it is
    /// strictly local to this waiter.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> Result<R, CoalesceError> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(result) = guard.clone() {
                return result;
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(CoalesceError::Timeout);
            }
            let (g, res) = self
                .ready
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            guard = g;
            if res.timed_out() && guard.is_none() {
                return Err(CoalesceError::Timeout);
            }
        }
    }
}

/// The three ways a completed result can be delivered back to a submitter.
pub(crate) enum SinkSlot<R> {
    Blocking(std::sync::Arc<Completion<R>>),
    Deferred(std::sync::Arc<Completion<R>>),
    Reactive(Mutex<Option<tokio::sync::oneshot::Sender<Result<R, CoalesceError>>>>),
}

impl<R: Clone> SinkSlot<R> {
    pub(crate) fn resolve(&self, result: Result<R, CoalesceError>) {
        match self {
            SinkSlot::Blocking(completion) | SinkSlot::Deferred(completion) => {
                completion.resolve(result);
            }
            SinkSlot::Reactive(sender_slot) => {
                if let Some(sender) = sender_slot.lock().unwrap_or_else(|e| e.into_inner()).take() {
                    // A dropped receiver (subscriber lost interest) is not an error.
                    let _ = sender.send(result);
                }
            }
        }
    }
}

/// Public handle returned by [`crate::Coordinator::execute_as_future`].
///
/// Supports blocking retrieval with or without a timeout, best-effort
/// cancellation, and polling completion state.
pub struct DeferredHandle<R> {
    pub(crate) completion: std::sync::Arc<Completion<R>>,
    pub(crate) cancel: std::sync::Arc<CancelState>,
}

impl<R: Clone> DeferredHandle<R> {
    /// Blocks until the result is available.
    #[must_use]
    pub fn get(&self) -> Result<R, CoalesceError> {
        self.completion.wait()
    }

    /// Blocks until the result is available or `timeout` elapses.
    #[must_use]
    pub fn get_timeout(&self, timeout: Duration) -> Result<R, CoalesceError> {
        self.completion.wait_timeout(timeout)
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.completion.is_done()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Best-effort cancellation.
    ///
    /// If the submission has not yet been handed to the dispatcher, it is
    /// dropped from the batch being formed and this handle resolves to
    /// [`CoalesceError::Cancelled`]. If dispatch has already begun, this is
    /// a no-op: the callback's real result or error is delivered normally.
    pub fn cancel(&self) {
        if self.cancel.try_cancel() {
            self.completion.resolve(Err(CoalesceError::Cancelled));
        }
    }
}
