use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// The cause carried by [`CoalesceError::CallbackFailed`].
///
/// Wraps whatever the callback returned as its error, or the payload of a
/// panic it raised. Cloneable because a single batch failure fans the same
/// cause out to every member.
#[derive(Clone)]
pub struct CallbackCause(pub(crate) Arc<dyn std::error::Error + Send + Sync + 'static>);

impl CallbackCause {
    pub(crate) fn from_error(err: Box<dyn std::error::Error + Send + Sync + 'static>) -> Self {
        Self(Arc::from(err))
    }

    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "callback panicked with a non-string payload".to_string()
        };
        Self(Arc::new(PanicCause(message)))
    }
}

impl fmt::Debug for CallbackCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for CallbackCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug)]
struct PanicCause(String);

impl fmt::Display for PanicCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "callback panicked: {}", self.0)
    }
}

impl std::error::Error for PanicCause {}

/// The error taxonomy a submitter can observe.
///
/// Every variant other than [`Timeout`](CoalesceError::Timeout) and
/// [`Interrupted`](CoalesceError::Interrupted) propagates to every member of
/// the batch that produced it; those two are local to the observing waiter
/// and never affect other members.
#[derive(Debug, Clone, Error)]
pub enum CoalesceError {
    /// The user callback returned an error or panicked.
    #[error("callback failed: {0}")]
    CallbackFailed(CallbackCause),

    /// The callback returned a result sequence of the wrong length.
    #[error("callback returned {actual} results for {expected} inputs")]
    ArityMismatch {
        /// Number of unique argument tuples passed to the callback.
        expected: usize,
        /// Number of results the callback actually returned.
        actual: usize,
    },

    /// The submission was cancelled before it was dispatched.
    #[error("submission was cancelled")]
    Cancelled,

    /// A waiter's bounded `get` expired before the result was available.
    ///
    /// Local to that waiter; the underlying submission is unaffected and may
    /// still complete normally for anyone still watching it.
    #[error("timed out waiting for result")]
    Timeout,

    /// A blocking waiter's thread was interrupted.
    #[error("interrupted while waiting for result")]
    Interrupted,

    /// Reserved for a non-blocking submission variant; the default
    /// blocking-submit coordinator never returns this.
    #[error("submission rejected: buffer is full")]
    BackpressureFull,

    /// The coordinator has been shut down and no longer accepts submissions.
    #[error("coordinator is shut down")]
    Closed,
}
