//! Bounded blocking MPMC queue used to admit submissions into a coalescing
//! coordinator.
//!
//! This crate deliberately stays ignorant of batching, dedup, or delivery —
//! it is the admission primitive only. See the `coalesce` crate for the
//! batching engine built on top of it.

mod backoff;
mod config;
mod invariants;
mod metrics;
mod queue;

pub use backoff::Backoff;
pub use config::Config;
pub use metrics::Metrics;
pub use queue::{Drained, Queue};
