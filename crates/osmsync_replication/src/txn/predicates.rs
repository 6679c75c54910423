//! Transaction id selection for one replication batch.

use super::space::TxnIdSpace;
use crate::state::ReplicationState;
use serde::Serialize;
use std::collections::HashSet;

/// An inclusive run of consecutive transaction ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TxnRange {
    /// First id.
    pub start: u64,
    /// Last id.
    pub end: u64,
}

impl TxnRange {
    /// Creates a range.
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Returns true if `id` is in the range.
    pub fn contains(&self, id: u64) -> bool {
        (self.start..=self.end).contains(&id)
    }

    /// Number of ids in the range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false; a range holds at least one id.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// The transaction ids whose rows make up one batch.
///
/// Row sources select history rows written by any id in `ranges` or in
/// `ready`. Ranges never span a wraparound and never include an id that
/// was in flight when the range was built.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct QueryPredicates {
    /// Newly reached ids, as maximal consecutive runs.
    pub ranges: Vec<TxnRange>,
    /// Ids passed over earlier while in flight that have since finished.
    pub ready: Vec<u64>,
}

impl QueryPredicates {
    /// Advances `state` by up to `max_count` ids and returns the ids to
    /// query.
    ///
    /// Walks from `txn_max_queried` towards `txn_max` using `space`,
    /// leaving out ids still in `txn_active`, then drains `txn_ready`.
    /// `txn_max_queried` is set to the last id walked.
    pub fn build(state: &mut ReplicationState, space: &dyn TxnIdSpace, max_count: u32) -> Self {
        let active: HashSet<u64> = state.txn_active.iter().copied().collect();
        let mut ranges = Vec::new();
        let mut current: Option<TxnRange> = None;

        let mut id = state.txn_max_queried;
        let mut walked = 0u32;
        while id != state.txn_max && walked < max_count {
            id = space.successor(id);
            walked += 1;

            if active.contains(&id) {
                ranges.extend(current.take());
                continue;
            }
            match current.as_mut() {
                Some(range) if range.end + 1 == id => range.end = id,
                _ => {
                    ranges.extend(current.take());
                    current = Some(TxnRange::new(id, id));
                }
            }
        }
        ranges.extend(current);

        state.txn_max_queried = id;
        let ready = std::mem::take(&mut state.txn_ready);
        tracing::debug!(
            ranges = ranges.len(),
            ready = ready.len(),
            walked,
            txn_max_queried = id,
            "built transaction predicates"
        );
        Self { ranges, ready }
    }

    /// Returns true if rows written by `id` belong to this batch.
    pub fn contains(&self, id: u64) -> bool {
        self.ranges.iter().any(|range| range.contains(id)) || self.ready.contains(&id)
    }

    /// Returns true if no id is selected.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty() && self.ready.is_empty()
    }

    /// Number of selected ids.
    pub fn txn_count(&self) -> u64 {
        self.ranges.iter().map(TxnRange::len).sum::<u64>() + self.ready.len() as u64
    }
}
