use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::CoalesceError;
use crate::sink::CancelState;

pub(crate) type SubmitFn<A, R> =
    Arc<dyn Fn(A) -> (Arc<CancelState>, oneshot::Receiver<Result<R, CoalesceError>>) + Send + Sync>;

/// A cold, re-subscribable handle to a single coalesced call.
///
/// No submission happens when this is created — only when
/// [`subscribe`](Mono::subscribe) is called. Each subscription is an
/// independent submission with its own argument copy, its own batch
/// membership, and its own cancellation; subscribing twice runs the
/// underlying call twice.
pub struct Mono<A, R> {
    args: A,
    submit: SubmitFn<A, R>,
}

impl<A: Clone, R> Mono<A, R> {
    pub(crate) fn new(args: A, submit: SubmitFn<A, R>) -> Self {
        Self { args, submit }
    }

    /// Submits this call's arguments and returns a future resolving to its
    /// result. Calling this more than once produces independent
    /// submissions, each batched (and deduplicated, if enabled) on its own.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<R> {
        let (cancel, receiver) = (self.submit)(self.args.clone());
        Subscription {
            cancel: Some(cancel),
            receiver,
        }
    }
}

/// The future returned by [`Mono::subscribe`].
///
/// Dropping a subscription before it resolves requests best-effort
/// cancellation of the underlying submission: if the submission has not yet
/// been batched, it is dropped and never runs; if a batch has already
/// claimed it, the drop has no effect and the callback still runs to
/// completion, its result simply going unobserved.
pub struct Subscription<R> {
    cancel: Option<Arc<CancelState>>,
    receiver: oneshot::Receiver<Result<R, CoalesceError>>,
}

impl<R> Future for Subscription<R> {
    type Output = Result<R, CoalesceError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => {
                this.cancel = None;
                Poll::Ready(result)
            }
            Poll::Ready(Err(_)) => {
                // The sender side was dropped without sending, which should
                // only happen if the coordinator itself is shutting down.
                this.cancel = None;
                Poll::Ready(Err(CoalesceError::Closed))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<R> Drop for Subscription<R> {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.try_cancel();
        }
    }
}
