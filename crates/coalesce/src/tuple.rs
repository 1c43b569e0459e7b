use std::sync::Arc;

use crate::error::CoalesceError;
use crate::sink::{CancelState, Completion, SinkSlot};

/// The per-submission record admitted into the ring buffer.
///
/// Carries the caller's argument tuple and a handle to deliver the eventual
/// result (or failure) back to whichever modality the caller chose. A tuple
/// is completed exactly once, by whichever batch it ends up a member of.
pub(crate) struct Tuple<A, R> {
    pub(crate) args: A,
    pub(crate) sink: Arc<SinkSlot<R>>,
    pub(crate) cancel: Arc<CancelState>,
}

impl<A, R: Clone> Tuple<A, R> {
    pub(crate) fn blocking(args: A) -> (Self, Arc<Completion<R>>) {
        let completion = Arc::new(Completion::new());
        let tuple = Self {
            args,
            sink: Arc::new(SinkSlot::Blocking(Arc::clone(&completion))),
            cancel: Arc::new(CancelState::new()),
        };
        (tuple, completion)
    }

    pub(crate) fn deferred(args: A) -> (Self, Arc<Completion<R>>, Arc<CancelState>) {
        let completion = Arc::new(Completion::new());
        let cancel = Arc::new(CancelState::new());
        let tuple = Self {
            args,
            sink: Arc::new(SinkSlot::Deferred(Arc::clone(&completion))),
            cancel: Arc::clone(&cancel),
        };
        (tuple, completion, cancel)
    }

    pub(crate) fn reactive(
        args: A,
        sender: tokio::sync::oneshot::Sender<Result<R, CoalesceError>>,
    ) -> (Self, Arc<CancelState>) {
        let cancel = Arc::new(CancelState::new());
        let tuple = Self {
            args,
            sink: Arc::new(SinkSlot::Reactive(std::sync::Mutex::new(Some(sender)))),
            cancel: Arc::clone(&cancel),
        };
        (tuple, cancel)
    }

    /// Resolves this tuple's sink. Called by the dispatcher, at most once
    /// per tuple — a repeat call (which should not happen) is absorbed by
    /// the sink's own single-assignment guard.
    pub(crate) fn complete(&self, result: Result<R, CoalesceError>) {
        self.sink.resolve(result);
    }
}
