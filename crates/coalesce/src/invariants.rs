//! Debug assertion macros for coordinator invariants. Zero overhead in
//! release builds.

macro_rules! debug_assert_batch_bounded {
    ($len:expr, $max_size:expr) => {
        debug_assert!(
            $len <= $max_size,
            "batch holds {} members, exceeding configured max_size {}",
            $len,
            $max_size
        )
    };
}

macro_rules! debug_assert_index_in_range {
    ($idx:expr, $unique_len:expr) => {
        debug_assert!(
            $idx < $unique_len,
            "index_map entry {} out of range for {} unique args",
            $idx,
            $unique_len
        )
    };
}

pub(crate) use debug_assert_batch_bounded;
pub(crate) use debug_assert_index_in_range;
