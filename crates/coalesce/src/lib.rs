//! Coalesces concurrent single-argument calls from independent threads into
//! batched invocations of one callback, closing each batch by whichever
//! comes first of a time window or a size limit, then fanning the
//! callback's results back out to each caller.
//!
//! Three delivery modalities share the same admission and batching path:
//!
//! * [`Coordinator::execute`] blocks the calling thread.
//! * [`Coordinator::execute_as_future`] returns a [`DeferredHandle`] the
//!   caller can poll, block on with a timeout, or cancel.
//! * [`Coordinator::execute_as_mono`] returns a [`Mono`], a cold,
//!   re-subscribable publisher of a single value — nothing is submitted
//!   until [`Mono::subscribe`] is called.
//!
//! Batching, admission, and dedup logic live here; the bounded blocking
//! queue submissions are admitted into lives in the sibling `coalesce-ring`
//! crate.

mod batch;
mod batcher;
mod config;
mod coordinator;
mod dispatcher;
mod error;
mod invariants;
mod mono;
mod sink;
mod tuple;
mod worker_pool;

pub use config::{Callback, CoordinatorConfig};
pub use coordinator::Coordinator;
pub use error::{CallbackCause, CoalesceError};
pub use mono::{Mono, Subscription};
pub use sink::DeferredHandle;
pub use worker_pool::{FixedThreadPool, Job, WorkerPool};
