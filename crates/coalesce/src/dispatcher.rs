use std::panic::{self, AssertUnwindSafe};

use crate::batch::Batch;
use crate::config::CoordinatorConfig;
use crate::error::{CallbackCause, CoalesceError};

/// Runs one closed batch's callback to completion and fans the outcome back
/// to every member's sink.
///
/// This is the unit of work handed to the worker pool — one dispatch per
/// closed batch, so batches can run concurrently with each other as long as
/// the pool has capacity.
pub(crate) fn dispatch<A, R>(batch: Batch<A, R>, config: &CoordinatorConfig<A, R>)
where
    A: Clone,
    R: Clone,
{
    let Batch {
        members,
        unique_args,
        index_map,
    } = batch;

    let expected = unique_args.len();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| (config.callback)(unique_args)));

    let values = match outcome {
        Ok(Ok(values)) => {
            if values.len() != expected {
                let err = CoalesceError::ArityMismatch {
                    expected,
                    actual: values.len(),
                };
                complete_all_with_error(&members, &err);
                return;
            }
            values
        }
        Ok(Err(cause)) => {
            tracing::warn!(error = %cause, "batch callback returned an error");
            let err = CoalesceError::CallbackFailed(CallbackCause::from_error(cause));
            complete_all_with_error(&members, &err);
            return;
        }
        Err(panic) => {
            let cause = CallbackCause::from_panic(&*panic);
            tracing::warn!(error = %cause, "batch callback panicked");
            let err = CoalesceError::CallbackFailed(cause);
            complete_all_with_error(&members, &err);
            return;
        }
    };

    for (member, &unique_idx) in members.iter().zip(index_map.iter()) {
        let value = values[unique_idx].clone();
        member.complete(Ok(value));
    }
}

fn complete_all_with_error<A, R: Clone>(members: &[crate::tuple::Tuple<A, R>], err: &CoalesceError) {
    for member in members {
        member.complete(Err(err.clone()));
    }
}
