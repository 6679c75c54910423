//! Lookahead over a releasable iterator.

use super::Release;
use crate::error::StoreResult;

/// Wraps an iterator so the next record can be inspected without
/// consuming it.
///
/// Releasing the wrapper releases only the wrapped iterator.
pub struct PeekableIterator<T, I> {
    source: I,
    next_value: Option<T>,
}

impl<T, I> PeekableIterator<T, I>
where
    I: Iterator<Item = StoreResult<T>>,
{
    /// Wraps `source`.
    pub fn new(source: I) -> Self {
        Self {
            source,
            next_value: None,
        }
    }

    /// Returns the next record without consuming it.
    ///
    /// # Errors
    ///
    /// Returns the source's error. The failed read is not cached.
    pub fn peek(&mut self) -> StoreResult<Option<&T>> {
        if self.next_value.is_none() {
            match self.source.next() {
                Some(Ok(value)) => self.next_value = Some(value),
                Some(Err(e)) => return Err(e),
                None => return Ok(None),
            }
        }
        Ok(self.next_value.as_ref())
    }

    /// Returns the record cached by the last [`PeekableIterator::peek`].
    pub fn peeked(&self) -> Option<&T> {
        self.next_value.as_ref()
    }

    /// Returns true if another record is available.
    ///
    /// # Errors
    ///
    /// Returns the source's error.
    pub fn has_next(&mut self) -> StoreResult<bool> {
        Ok(self.peek()?.is_some())
    }

    /// Consumes the next record only if `predicate` accepts it.
    ///
    /// # Errors
    ///
    /// Returns the source's error.
    pub fn next_if(&mut self, predicate: impl FnOnce(&T) -> bool) -> StoreResult<Option<T>> {
        let accepted = match self.peek()? {
            Some(value) => predicate(value),
            None => false,
        };
        Ok(if accepted { self.next_value.take() } else { None })
    }

    /// Returns the wrapped iterator.
    pub fn get_mut(&mut self) -> &mut I {
        &mut self.source
    }
}

impl<T, I> Iterator for PeekableIterator<T, I>
where
    I: Iterator<Item = StoreResult<T>>,
{
    type Item = StoreResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_value.take() {
            Some(value) => Some(Ok(value)),
            None => self.source.next(),
        }
    }
}

impl<T, I: Release> Release for PeekableIterator<T, I> {
    fn release(&mut self) {
        self.next_value = None;
        self.source.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::iter::ReleasableVecIterator;

    #[test]
    fn peek_does_not_consume() {
        let mut iter = PeekableIterator::new(ReleasableVecIterator::new(vec![1, 2]));
        assert_eq!(iter.peek().unwrap(), Some(&1));
        assert_eq!(iter.peek().unwrap(), Some(&1));
        assert_eq!(iter.next().unwrap().unwrap(), 1);
        assert_eq!(iter.peek().unwrap(), Some(&2));
        assert_eq!(iter.next().unwrap().unwrap(), 2);
        assert!(!iter.has_next().unwrap());
        assert!(iter.next().is_none());
    }

    #[test]
    fn next_if_respects_predicate() {
        let mut iter = PeekableIterator::new(ReleasableVecIterator::new(vec![1, 5]));
        assert_eq!(iter.next_if(|v| *v < 3).unwrap(), Some(1));
        assert_eq!(iter.next_if(|v| *v < 3).unwrap(), None);
        assert_eq!(iter.next().unwrap().unwrap(), 5);
    }

    #[test]
    fn peek_surfaces_errors() {
        let source = vec![Err(StoreError::ordering_violation("boom")), Ok(7)].into_iter();
        let mut iter = PeekableIterator::new(source);
        assert!(iter.peek().is_err());
        assert_eq!(iter.peek().unwrap(), Some(&7));
    }

    #[test]
    fn release_reaches_source() {
        let mut iter = PeekableIterator::new(ReleasableVecIterator::new(vec![1, 2, 3]));
        iter.peek().unwrap();
        iter.release();
        assert!(iter.next().is_none());
    }
}
