//! Sequential spill store.

use super::object_file::{ObjectFile, ObjectIterator};
use crate::error::StoreResult;
use crate::iter::Release;
use crate::stage::StoreStage;
use osmsync_codec::Storeable;
use osmsync_storage::StorageConfig;

/// A write-once, read-many sequence of records in a temporary file.
///
/// Records are added in the `Add` stage. The first call to
/// [`SimpleObjectStore::iterate`] flushes and closes the writer; every
/// iterator then replays the records in write order from the start.
/// Releasing deletes the file.
///
/// # Example
///
/// ```
/// use osmsync_store::{Release, SimpleObjectStore};
/// use osmsync_storage::StorageConfig;
///
/// let mut store = SimpleObjectStore::<i64>::new(&StorageConfig::default(), "ids");
/// for id in [3, 1, 2] {
///     store.add(&id).unwrap();
/// }
/// let ids: Vec<i64> = store.iterate().unwrap().map(|r| r.unwrap()).collect();
/// assert_eq!(ids, vec![3, 1, 2]);
/// store.release();
/// ```
pub struct SimpleObjectStore<T> {
    file: ObjectFile<T>,
}

impl<T: Storeable> SimpleObjectStore<T> {
    /// Creates an empty store. The file is created on the first add.
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

    /// Returns an iterator over all records in write order.
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

impl<T: Storeable> Release for SimpleObjectStore<T> {
    fn release(&mut self) {
        self.file.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    fn config(dir: &tempfile::TempDir) -> StorageConfig {
        StorageConfig::new().with_temp_dir(dir.path())
    }

    #[test]
    fn roundtrip_in_write_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SimpleObjectStore::<(i64, String)>::new(&config(&dir), "test");
        let records: Vec<(i64, String)> = (0..500).map(|i| (i * 7 % 13, format!("v{i}"))).collect();
        for record in &records {
            store.add(record).unwrap();
        }
        assert_eq!(store.stage(), StoreStage::Add);

        let read: Vec<_> = store.iterate().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(read, records);
        assert_eq!(store.stage(), StoreStage::Reading);
    }

    #[test]
    fn fresh_reader_replays_from_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SimpleObjectStore::<i32>::new(&config(&dir), "test");
        for i in 0..10 {
            store.add(&i).unwrap();
        }

        let mut first = store.iterate().unwrap();
        assert_eq!(first.next().unwrap().unwrap(), 0);
        first.release();

        let all: Vec<i32> = store.iterate().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn empty_store_iterates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SimpleObjectStore::<i32>::new(&config(&dir), "test");
        assert!(store.is_empty());
        assert!(store.iterate().unwrap().next().is_none());
        assert_eq!(store.stage(), StoreStage::Reading);
    }

    #[test]
    fn add_after_reading_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SimpleObjectStore::<i32>::new(&config(&dir), "test");
        store.add(&1).unwrap();
        store.iterate().unwrap();
        assert!(matches!(
            store.add(&2),
            Err(StoreError::InvalidStage {
                stage: StoreStage::Reading,
                ..
            })
        ));
    }

    #[test]
    fn release_deletes_file_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SimpleObjectStore::<i32>::new(&config(&dir), "test");
        store.add(&1).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        store.release();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(store.stage(), StoreStage::Released);

        store.release();
        assert!(store.iterate().is_err());
    }
}
