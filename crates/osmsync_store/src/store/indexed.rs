//! Spill store with lookup by external id.

use super::object_file::ObjectIterator;
use super::random_access::RandomAccessObjectStore;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::index::{IndexStore, LongLongIndexElement};
use crate::iter::Release;
use crate::stage::StoreStage;
use osmsync_codec::Storeable;

/// A store of records retrievable by a strictly increasing `i64` id.
///
/// Payloads live in a [`RandomAccessObjectStore`]. Two parallel indexes
/// map id to sequence number and sequence number to payload offset, so a
/// lookup is a binary search on ids followed by a direct offset lookup.
pub struct IndexedObjectStore<T> {
    objects: RandomAccessObjectStore<T>,
    ids: IndexStore<LongLongIndexElement>,
    offsets: IndexStore<LongLongIndexElement>,
    last_id: Option<i64>,
    sequence: i64,
}

#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
impl<T: Storeable> IndexedObjectStore<T> {
    /// Creates an empty store.
    pub fn new(config: &StoreConfig, name: &str) -> Self {
        Self {
            objects: RandomAccessObjectStore::new(&config.storage, name),
            ids: IndexStore::new(config, &format!("{name}-ids")),
            offsets: IndexStore::new(config, &format!("{name}-offsets")),
            last_id: None,
            sequence: 0,
        }
    }

    /// Adds a record under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OrderingViolation`] if `id` is not greater
    /// than the previous id.
    pub fn add(&mut self, id: i64, value: &T) -> StoreResult<()> {
        if let Some(last) = self.last_id {
            if id <= last {
                return Err(StoreError::ordering_violation(format!(
                    "id {id} added after id {last}; ids must be strictly increasing"
                )));
            }
        }

        let offset = self.objects.add(value)?;
        self.ids.write(&LongLongIndexElement::new(id, self.sequence))?;
        self.offsets
            .write(&LongLongIndexElement::new(self.sequence, offset as i64))?;
        self.sequence += 1;
        self.last_id = Some(id);
        Ok(())
    }

    /// Closes writing on the payload store and both indexes.
    ///
    /// Called implicitly by the first read.
    ///
    /// # Errors
    ///
    /// Returns an error if an index fails to complete.
    pub fn complete(&mut self) -> StoreResult<()> {
        self.objects.finish()?;
        self.ids.complete()?;
        self.offsets.complete()
    }

    /// Returns the record stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no record has that id.
    pub fn get(&mut self, id: i64) -> StoreResult<T> {
        self.complete()?;
        let sequence = self.ids.get(id)?.value;
        let offset = self.offsets.get(sequence)?.value;
        self.objects.get(offset as u64)
    }

    /// Replays all records in id order.
    ///
    /// # Errors
    ///
    /// Fails after release, or on I/O error.
    pub fn iterate(&mut self) -> StoreResult<ObjectIterator<T>> {
        self.complete()?;
        self.objects.iterate()
    }

    /// Number of records added.
    pub fn len(&self) -> u64 {
        self.objects.len()
    }

    /// Returns true if no record was added.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Lifecycle stage of the payload store.
    pub fn stage(&self) -> StoreStage {
        self.objects.stage()
    }
}

impl<T: Storeable> Release for IndexedObjectStore<T> {
    fn release(&mut self) {
        self.ids.release();
        self.offsets.release();
        self.objects.release();
    }
}
