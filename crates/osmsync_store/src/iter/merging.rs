//! K-way merge of sorted releasable iterators.

use super::{BoxedIterator, PeekableIterator, Release};
use crate::error::StoreResult;
use std::cmp::Ordering;

/// Merges several individually sorted sources into one sorted stream.
///
/// On equal keys the record from the lowest-numbered source is emitted
/// first, so merging stable runs in their original order keeps the sort
/// stable. An optional owner is released after the sources; the external
/// sort uses it to delete its run file once the merge is released.
pub struct MergingIterator<T, C> {
    sources: Vec<PeekableIterator<T, BoxedIterator<T>>>,
    comparator: C,
    owner: Option<Box<dyn Release>>,
}

impl<T, C> MergingIterator<T, C>
where
    C: Fn(&T, &T) -> Ordering,
{
    /// Merges `sources` using `comparator`.
    pub fn new(sources: Vec<BoxedIterator<T>>, comparator: C) -> Self {
        Self {
            sources: sources.into_iter().map(PeekableIterator::new).collect(),
            comparator,
            owner: None,
        }
    }

    /// Attaches a resource to be released together with the merge.
    #[must_use]
    pub fn with_owner(mut self, owner: Box<dyn Release>) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Number of merged sources.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

impl<T, C> Iterator for MergingIterator<T, C>
where
    C: Fn(&T, &T) -> Ordering,
{
    type Item = StoreResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        for source in &mut self.sources {
            if let Err(e) = source.peek() {
                return Some(Err(e));
            }
        }

        let mut best: Option<usize> = None;
        for (i, source) in self.sources.iter().enumerate() {
            let Some(candidate) = source.peeked() else {
                continue;
            };
            best = match best.and_then(|b| self.sources[b].peeked().map(|current| (b, current))) {
                Some((b, current)) if (self.comparator)(candidate, current) != Ordering::Less => Some(b),
                _ => Some(i),
            };
        }

        self.sources[best?].next()
    }
}

impl<T, C> Release for MergingIterator<T, C> {
    fn release(&mut self) {
        for source in &mut self.sources {
            source.release();
        }
        self.sources.clear();
        if let Some(mut owner) = self.owner.take() {
            owner.release();
        }
    }
}
