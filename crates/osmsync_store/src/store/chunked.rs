//! Spill store partitioned into independently readable chunks.

use super::object_file::ObjectIterator;
use super::segmented::SegmentedObjectStore;
use crate::config::StoreConfig;
use crate::error::StoreResult;
use crate::index::{IndexStore, LongLongIndexElement};
use crate::iter::Release;
use crate::stage::StoreStage;
use osmsync_codec::Storeable;

/// A store of records grouped into numbered chunks.
///
/// Records are appended to the open chunk; [`ChunkedObjectStore::close_chunk`]
/// seals it. Chunk `c` is located through an index holding
/// `2c → start offset` and `2c + 1 → record count`, and
/// [`ChunkedObjectStore::iterate`] replays exactly the records of one chunk.
pub struct ChunkedObjectStore<T> {
    objects: SegmentedObjectStore<T>,
    index: IndexStore<LongLongIndexElement>,
    chunk_count: u64,
    chunk_start: u64,
    chunk_len: u64,
    chunk_open: bool,
}

#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
impl<T: Storeable> ChunkedObjectStore<T> {
    /// Creates an empty store.
    pub fn new(config: &StoreConfig, name: &str) -> Self {
        Self {
            objects: SegmentedObjectStore::new(&config.storage, name),
            index: IndexStore::new(config, &format!("{name}-chunks")),
            chunk_count: 0,
            chunk_start: 0,
            chunk_len: 0,
            chunk_open: false,
        }
    }

    /// Appends a record to the open chunk.
    ///
    /// # Errors
    ///
    /// Fails once reading has begun, or on I/O error.
    pub fn add(&mut self, value: &T) -> StoreResult<()> {
        self.objects.add(value)?;
        self.chunk_len += 1;
        self.chunk_open = true;
        Ok(())
    }

    /// Seals the open chunk and returns the start offset of the next one.
    ///
    /// Closing with no records added since the last close still creates
    /// an empty chunk.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush or index write fails.
    pub fn close_chunk(&mut self) -> StoreResult<u64> {
        let next_start = self.objects.close_chunk()?;
        let key = self.chunk_count as i64 * 2;
        self.index
            .write(&LongLongIndexElement::new(key, self.chunk_start as i64))?;
        self.index
            .write(&LongLongIndexElement::new(key + 1, self.chunk_len as i64))?;

        tracing::trace!(chunk = self.chunk_count, records = self.chunk_len, "closed chunk");
        self.chunk_count += 1;
        self.chunk_start = next_start;
        self.chunk_len = 0;
        self.chunk_open = false;
        Ok(next_start)
    }

    /// Number of chunks, counting a chunk still open for writing.
    pub fn chunk_count(&self) -> u64 {
        self.chunk_count + u64::from(self.chunk_open)
    }

    /// Replays the records of chunk `chunk`, closing the open chunk first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::NotFound`] if the chunk does not exist.
    pub fn iterate(&mut self, chunk: u64) -> StoreResult<ObjectIterator<T>> {
        if self.chunk_open {
            self.close_chunk()?;
        }
        let key = chunk as i64 * 2;
        let start = self.index.get(key)?.value as u64;
        let count = self.index.get(key + 1)?.value as u64;
        self.objects.iterate_from(start, count)
    }

    /// Number of records across all chunks.
    pub fn len(&self) -> u64 {
        self.objects.len()
    }

    /// Returns true if no record was added.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Lifecycle stage of the record file.
    pub fn stage(&self) -> StoreStage {
        self.objects.stage()
    }
}

impl<T: Storeable> Release for ChunkedObjectStore<T> {
    fn release(&mut self) {
        self.index.release();
        self.objects.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    fn config(dir: &tempfile::TempDir) -> StoreConfig {
        StoreConfig::new().with_temp_dir(dir.path())
    }

    #[test]
    fn chunks_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ChunkedObjectStore::<i32>::new(&config(&dir), "chunked");
        for chunk in 0..3 {
            for i in 0..5 {
                store.add(&(chunk * 100 + i)).unwrap();
            }
            store.close_chunk().unwrap();
        }
        assert_eq!(store.chunk_count(), 3);

        for chunk in [2u64, 0, 1] {
            let values: Vec<i32> = store.iterate(chunk).unwrap().map(|r| r.unwrap()).collect();
            let base = chunk as i32 * 100;
            assert_eq!(values, (base..base + 5).collect::<Vec<_>>());
        }
    }

    #[test]
    fn open_chunk_closed_on_iterate() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ChunkedObjectStore::<String>::new(&config(&dir), "chunked");
        store.add(&"a".to_string()).unwrap();
        store.close_chunk().unwrap();
        store.add(&"b".to_string()).unwrap();
        store.add(&"c".to_string()).unwrap();
        assert_eq!(store.chunk_count(), 2);

        let last: Vec<String> = store.iterate(1).unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(last, vec!["b", "c"]);
        let first: Vec<String> = store.iterate(0).unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(first, vec!["a"]);
    }

    #[test]
    fn empty_chunk_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ChunkedObjectStore::<i32>::new(&config(&dir), "chunked");
        store.add(&1).unwrap();
        store.close_chunk().unwrap();
        store.close_chunk().unwrap();
        store.add(&2).unwrap();
        store.close_chunk().unwrap();

        assert_eq!(store.iterate(1).unwrap().count(), 0);
        assert_eq!(store.iterate(2).unwrap().map(|r| r.unwrap()).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn unknown_chunk_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ChunkedObjectStore::<i32>::new(&config(&dir), "chunked");
        store.add(&1).unwrap();
        store.close_chunk().unwrap();
        assert!(matches!(store.iterate(5), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn release_removes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ChunkedObjectStore::<i32>::new(&config(&dir), "chunked");
        for i in 0..10 {
            store.add(&i).unwrap();
            store.close_chunk().unwrap();
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
        store.release();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
