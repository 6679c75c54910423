//! Spill store with random access by offset.

use super::object_file::{ObjectFile, ObjectIterator, RandomAccessReader};
use crate::error::{StoreError, StoreResult};
use crate::iter::Release;
use crate::stage::StoreStage;
use osmsync_codec::Storeable;
use osmsync_storage::StorageConfig;

/// A store whose records can be fetched individually by byte offset.
///
/// [`RandomAccessObjectStore::add`] returns the offset of the record it
/// wrote; [`RandomAccessObjectStore::get`] seeks there and reads one
/// record. Index stores keep their fixed-width elements here.
pub struct RandomAccessObjectStore<T> {
    file: ObjectFile<T>,
    reader: Option<RandomAccessReader<T>>,
}

impl<T: Storeable> RandomAccessObjectStore<T> {
    /// Creates an empty store.
    pub fn new(config: &StorageConfig, name: &str) -> Self {
        Self {
            file: ObjectFile::new(config, name),
            reader: None,
        }
    }

    /// Appends a record and returns its offset.
    ///
    /// # Errors
    ///
    /// Fails once reading has begun, or on I/O error.
    pub fn add(&mut self, value: &T) -> StoreResult<u64> {
        self.file.add(value)
    }

    /// Closes writing and returns the total file size in bytes.
    ///
    /// # Errors
    ///
    /// Fails after release, or on I/O error.
    pub fn finish(&mut self) -> StoreResult<u64> {
        self.file.begin_reading()?;
        Ok(self.file.position())
    }

    /// Reads the record at `offset`.
    ///
    /// # Errors
    ///
    /// Fails after release, on I/O error, or if `offset` is not a record
    /// boundary.
    pub fn get(&mut self, offset: u64) -> StoreResult<T> {
        if self.reader.is_none() {
            self.reader = Some(self.file.open_random_reader()?);
        }
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| StoreError::invalid_stage("read", self.file.stage()))?;
        reader.get(offset)
    }

    /// Opens an independent random-access reader.
    ///
    /// # Errors
    ///
    /// Fails after release, or on I/O error.
    pub fn reader(&mut self) -> StoreResult<RandomAccessReader<T>> {
        self.file.open_random_reader()
    }

    /// Replays every record in write order.
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

impl<T: Storeable> Release for RandomAccessObjectStore<T> {
    fn release(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            reader.release();
        }
        self.file.release();
    }
}
