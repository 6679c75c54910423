//! Spooling of a live stream to disk.

use super::Release;
use crate::error::StoreResult;
use crate::store::{ObjectIterator, SimpleObjectStore};
use osmsync_codec::Storeable;
use osmsync_storage::StorageConfig;

/// Copies a source stream into a temporary store, then replays it.
///
/// Used to drain a result set (a database cursor, say) completely before
/// the next one is opened, so at most one live source is active at once.
/// [`PersistentIterator::materialize`] may be called up front; otherwise
/// the first pull materializes. The source is released as soon as it has
/// been copied.
pub struct PersistentIterator<T, I> {
    source: Option<I>,
    store: SimpleObjectStore<T>,
    reader: Option<ObjectIterator<T>>,
    done: bool,
}

impl<T, I> PersistentIterator<T, I>
where
    T: Storeable,
    I: Iterator<Item = StoreResult<T>> + Release,
{
    /// Wraps `source`, spooling to a store called `name`.
    pub fn new(config: &StorageConfig, name: &str, source: I) -> Self {
        Self {
            source: Some(source),
            store: SimpleObjectStore::new(config, name),
            reader: None,
            done: false,
        }
    }

    /// Drains the source into the store and releases it. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns the first error from the source or the store. The source
    /// is released either way.
    pub fn materialize(&mut self) -> StoreResult<()> {
        let Some(mut source) = self.source.take() else {
            return Ok(());
        };
        let result = Self::copy(&mut source, &mut self.store);
        source.release();
        result?;

        tracing::trace!(records = self.store.len(), "stream materialized");
        self.reader = Some(self.store.iterate()?);
        Ok(())
    }

    fn copy(source: &mut I, store: &mut SimpleObjectStore<T>) -> StoreResult<()> {
        for value in source {
            store.add(&value?)?;
        }
        Ok(())
    }
}

impl<T, I> Iterator for PersistentIterator<T, I>
where
    T: Storeable,
    I: Iterator<Item = StoreResult<T>> + Release,
{
    type Item = StoreResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Err(e) = self.materialize() {
            self.done = true;
            return Some(Err(e));
        }
        let item = self.reader.as_mut()?.next();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

impl<T: Storeable, I: Release> Release for PersistentIterator<T, I> {
    fn release(&mut self) {
        self.done = true;
        if let Some(mut source) = self.source.take() {
            source.release();
        }
        if let Some(mut reader) = self.reader.take() {
            reader.release();
        }
        self.store.release();
    }
}
