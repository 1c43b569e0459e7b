use std::collections::HashMap;
use std::hash::Hash;

use crate::invariants::{debug_assert_batch_bounded, debug_assert_index_in_range};
use crate::tuple::Tuple;

/// A set of tuples closed together by the batcher and handed to one
/// callback invocation.
///
/// `unique_args[index_map[i]]` is the argument tuple actually passed to the
/// callback on behalf of `members[i]`; with dedup disabled `index_map` is
/// the identity mapping and `unique_args == members.iter().map(args)`.
pub(crate) struct Batch<A, R> {
    pub(crate) members: Vec<Tuple<A, R>>,
    pub(crate) unique_args: Vec<A>,
    pub(crate) index_map: Vec<usize>,
}

impl<A: Clone + Eq + Hash, R> Batch<A, R> {
    /// Forms a batch from tuples already pulled off the admission queue,
    /// applying dedup by structural equality over `args` when requested.
    /// First occurrence wins and is assigned the next position in
    /// `unique_args`, in insertion order.
    pub(crate) fn form(members: Vec<Tuple<A, R>>, remove_duplicates: bool) -> Self {
        debug_assert!(!members.is_empty(), "batcher should never close an empty batch");

        if !remove_duplicates {
            let unique_args: Vec<A> = members.iter().map(|t| t.args.clone()).collect();
            let index_map: Vec<usize> = (0..members.len()).collect();
            debug_assert_batch_bounded!(members.len(), members.len());
            return Self {
                members,
                unique_args,
                index_map,
            };
        }

        let mut unique_args = Vec::with_capacity(members.len());
        let mut seen: HashMap<A, usize> = HashMap::with_capacity(members.len());
        let mut index_map = Vec::with_capacity(members.len());

        for member in &members {
            let idx = *seen.entry(member.args.clone()).or_insert_with(|| {
                unique_args.push(member.args.clone());
                unique_args.len() - 1
            });
            debug_assert_index_in_range!(idx, unique_args.len());
            index_map.push(idx);
        }

        Self {
            members,
            unique_args,
            index_map,
        }
    }
}
