//! Spill store addressable by segment offsets.

use super::object_file::{ObjectFile, ObjectIterator};
use crate::error::StoreResult;
use crate::iter::Release;
use crate::stage::StoreStage;
use osmsync_codec::Storeable;
use osmsync_storage::StorageConfig;

/// A sequential store whose contents can be replayed from a segment start.
///
/// [`SegmentedObjectStore::close_chunk`] flushes buffered records and
/// returns the offset at which the next chunk begins. A chunk is replayed
/// with [`SegmentedObjectStore::iterate_from`] given its start offset and
/// record count.
pub struct SegmentedObjectStore<T> {
    file: ObjectFile<T>,
}

impl<T: Storeable> SegmentedObjectStore<T> {
    /// Creates an empty store.
    pub fn new(config: &StorageConfig, name: &str) -> Self {
        Self {
            file: ObjectFile::new(config, name),
        }
    }

    /// Appends a record.
    ///
    /// # Errors
    ///
    /// Fails once reading has begun, or on I/O error.
    pub fn add(&mut self, value: &T) -> StoreResult<()> {
        self.file.add(value).map(|_| ())
    }

    /// Ends the current chunk and returns the start offset of the next one.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn close_chunk(&mut self) -> StoreResult<u64> {
        self.file.flush()
    }

    /// Replays `count` records starting at `offset`.
    ///
    /// # Errors
    ///
    /// Fails after release, or on I/O error.
    pub fn iterate_from(&mut self, offset: u64, count: u64) -> StoreResult<ObjectIterator<T>> {
        self.file.iterate_from(offset, Some(count))
    }

    /// Replays every record in the store.
    ///
    /// # Errors
    ///
    /// Fails after release, or on I/O error.
    pub fn iterate(&mut self) -> StoreResult<ObjectIterator<T>> {
        self.file.iterate_from(0, None)
    }

    /// Number of records added.
    pub fn len(&self) -> u64 {
        self.file.len()
    }

    /// Returns true if no record was added.
    pub fn is_empty(&self) -> bool {
        self.file.len() == 0
    }

    /// Current lifecycle stage.
    pub fn stage(&self) -> StoreStage {
        self.file.stage()
    }
}

impl<T: Storeable> Release for SegmentedObjectStore<T> {
    fn release(&mut self) {
        self.file.release();
    }
}
