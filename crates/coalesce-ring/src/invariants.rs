//! Debug assertion macros for queue invariants.
//!
//! Zero overhead in release builds (`#[cfg(debug_assertions)]` only).

/// Assert the queue never holds more than its configured capacity.
macro_rules! debug_assert_within_capacity {
    ($len:expr, $capacity:expr) => {
        debug_assert!(
            $len <= $capacity,
            "queue holds {} items, exceeding capacity {}",
            $len,
            $capacity
        )
    };
}

/// Assert a drain never returns more items than it was asked for.
macro_rules! debug_assert_drain_bounded {
    ($drained:expr, $max:expr) => {
        debug_assert!(
            $drained <= $max,
            "drained {} items, exceeding requested max {}",
            $drained,
            $max
        )
    };
}

pub(crate) use debug_assert_drain_bounded;
pub(crate) use debug_assert_within_capacity;
