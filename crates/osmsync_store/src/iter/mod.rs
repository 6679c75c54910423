//! Releasable iterators and stream adapters.
//!
//! Every stream in osmsync is a pull-based [`Iterator`] yielding
//! `StoreResult<T>` that also owns some resource: a spill file, a
//! database cursor, another stream. [`Release`] frees that resource.
//!
//! ## Release rules
//!
//! - A wrapper releases exactly what it owns, once.
//! - `release` is idempotent and never fails; secondary errors are
//!   logged and swallowed so the first error stays visible.
//! - A caller cancels by ceasing to pull and then releasing.

mod chained;
mod merging;
mod peekable;
mod persistent;

pub use chained::ChainedIterator;
pub use merging::MergingIterator;
pub use peekable::PeekableIterator;
pub use persistent::PersistentIterator;

use crate::error::StoreResult;

/// A value that owns a resource which must be freed explicitly.
pub trait Release {
    /// Frees the owned resource. Safe to call more than once.
    fn release(&mut self);
}

impl<R: Release + ?Sized> Release for Box<R> {
    fn release(&mut self) {
        (**self).release();
    }
}

/// An iterator over `StoreResult<T>` that can be released early.
pub trait ReleasableIterator<T>: Iterator<Item = StoreResult<T>> + Release {}

impl<T, I> ReleasableIterator<T> for I where I: Iterator<Item = StoreResult<T>> + Release + ?Sized {}

/// A boxed releasable iterator.
pub type BoxedIterator<T> = Box<dyn ReleasableIterator<T>>;

/// A releasable iterator over an in-memory vector.
#[derive(Debug)]
pub struct ReleasableVecIterator<T> {
    items: std::vec::IntoIter<T>,
}

impl<T> ReleasableVecIterator<T> {
    /// Creates an iterator yielding `items` in order.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

impl<T> Iterator for ReleasableVecIterator<T> {
    type Item = StoreResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next().map(Ok)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl<T> Release for ReleasableVecIterator<T> {
    fn release(&mut self) {
        self.items = Vec::new().into_iter();
    }
}

impl<T> From<Vec<T>> for ReleasableVecIterator<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}
