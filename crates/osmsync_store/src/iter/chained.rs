//! Concatenation of releasable iterators.

use super::{BoxedIterator, Release};
use crate::error::StoreResult;
use std::collections::VecDeque;

/// Yields every record of each source in turn.
///
/// An exhausted source is released as soon as it runs dry; releasing the
/// chain releases whatever sources remain.
pub struct ChainedIterator<T> {
    sources: VecDeque<BoxedIterator<T>>,
}

impl<T> ChainedIterator<T> {
    /// Chains `sources` in the given order.
    pub fn new(sources: Vec<BoxedIterator<T>>) -> Self {
        Self {
            sources: sources.into(),
        }
    }

    /// Appends another source.
    pub fn push(&mut self, source: BoxedIterator<T>) {
        self.sources.push_back(source);
    }
}

impl<T> Iterator for ChainedIterator<T> {
    type Item = StoreResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(source) = self.sources.front_mut() {
            if let Some(item) = source.next() {
                return Some(item);
            }
            if let Some(mut finished) = self.sources.pop_front() {
                finished.release();
            }
        }
        None
    }
}

impl<T> Release for ChainedIterator<T> {
    fn release(&mut self) {
        for mut source in self.sources.drain(..) {
            source.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iter::ReleasableVecIterator;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counted {
        releases: Rc<Cell<u32>>,
    }

    impl Iterator for Counted {
        type Item = StoreResult<i32>;
        fn next(&mut self) -> Option<Self::Item> {
            None
        }
    }

    impl Release for Counted {
        fn release(&mut self) {
            self.releases.set(self.releases.get() + 1);
        }
    }

    #[test]
    fn yields_sources_in_order() {
        let chain: ChainedIterator<i32> = ChainedIterator::new(vec![
            Box::new(ReleasableVecIterator::new(vec![1, 2])),
            Box::new(ReleasableVecIterator::new(Vec::new())),
            Box::new(ReleasableVecIterator::new(vec![3])),
        ]);
        let items: Vec<i32> = chain.map(|r| r.unwrap()).collect();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn each_source_released_once() {
        let releases = Rc::new(Cell::new(0));
        let mut chain: ChainedIterator<i32> = ChainedIterator::new(vec![
            Box::new(Counted {
                releases: Rc::clone(&releases),
            }),
            Box::new(Counted {
                releases: Rc::clone(&releases),
            }),
        ]);
        chain.push(Box::new(Counted {
            releases: Rc::clone(&releases),
        }));

        // Drains the first two, leaving none.
        assert!(chain.next().is_none());
        assert_eq!(releases.get(), 3);
        chain.release();
        assert_eq!(releases.get(), 3);
    }

    #[test]
    fn release_before_exhaustion_releases_remaining() {
        let releases = Rc::new(Cell::new(0));
        let mut chain: ChainedIterator<i32> = ChainedIterator::new(vec![
            Box::new(Counted {
                releases: Rc::clone(&releases),
            }),
            Box::new(Counted {
                releases: Rc::clone(&releases),
            }),
        ]);
        chain.release();
        assert_eq!(releases.get(), 2);
        chain.release();
        assert_eq!(releases.get(), 2);
    }
}
