//! Key-sorted on-disk array with binary search lookup.

use super::element::IndexElement;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::iter::Release;
use crate::sort::FileBasedSort;
use crate::stage::StoreStage;
use crate::store::{ObjectIterator, RandomAccessObjectStore, RandomAccessReader};

/// A fixed-width, key-sorted array of elements in a temporary file.
///
/// Elements are appended with [`IndexStore::write`]. The store notes
/// whether keys arrived in non-decreasing order; if not,
/// [`IndexStore::complete`] rewrites the file through an external sort.
/// After completion, [`IndexStore::get`] finds elements by binary search.
///
/// # Invariants
///
/// - Every element encodes to the same width. The width is taken from the
///   offset of the second element and checked on every later write.
/// - After `complete`, keys are non-decreasing.
/// - This is not a multimap: with duplicate keys, lookup returns whichever
///   matching element the search reaches.
pub struct IndexStore<E: IndexElement> {
    config: StoreConfig,
    name: String,
    store: RandomAccessObjectStore<E>,
    element_size: Option<u64>,
    element_count: u64,
    last_key: Option<E::Key>,
    sorted: bool,
    completed: bool,
    reader: Option<IndexStoreReader<E>>,
}

impl<E> IndexStore<E>
where
    E: IndexElement + 'static,
{
    /// Creates an empty index.
    pub fn new(config: &StoreConfig, name: &str) -> Self {
        Self {
            config: config.clone(),
            name: name.to_string(),
            store: RandomAccessObjectStore::new(&config.storage, name),
            element_size: None,
            element_count: 0,
            last_key: None,
            sorted: true,
            completed: false,
            reader: None,
        }
    }

    /// Appends an element.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IndexWidthMismatch`] if the element's width
    /// differs from earlier elements, or fails after completion.
    pub fn write(&mut self, element: &E) -> StoreResult<()> {
        if self.completed {
            return Err(StoreError::invalid_stage("write", StoreStage::Reading));
        }

        let offset = self.store.add(element)?;
        self.check_width(offset)?;

        let key = element.key();
        if let Some(last) = self.last_key {
            if key < last && self.sorted {
                tracing::debug!(index = %self.name, "index input out of order; will sort on completion");
                self.sorted = false;
            }
        }
        self.last_key = Some(key);
        self.element_count += 1;
        Ok(())
    }

    fn check_width(&mut self, offset: u64) -> StoreResult<()> {
        match (self.element_count, self.element_size) {
            (0, _) => Ok(()),
            (1, None) => {
                self.element_size = Some(offset);
                Ok(())
            }
            (count, Some(size)) if offset != count * size => Err(StoreError::IndexWidthMismatch {
                index: count,
                expected: count * size,
                actual: offset,
            }),
            _ => Ok(()),
        }
    }

    /// Finishes writing, sorting the elements if they arrived out of order.
    ///
    /// Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the sort fails or the final element has a
    /// different width.
    pub fn complete(&mut self) -> StoreResult<()> {
        if self.completed {
            return Ok(());
        }
        if !self.sorted {
            self.sort()?;
        }

        let total = self.store.finish()?;
        match (self.element_count, self.element_size) {
            (0, _) => {}
            (1, _) => self.element_size = Some(total),
            (count, Some(size)) if total != count * size => {
                return Err(StoreError::IndexWidthMismatch {
                    index: count,
                    expected: count * size,
                    actual: total,
                });
            }
            _ => {}
        }

        self.completed = true;
        Ok(())
    }

    fn sort(&mut self) -> StoreResult<()> {
        tracing::debug!(index = %self.name, elements = self.element_count, "sorting index");

        let mut sorter = FileBasedSort::new(self.config.clone(), |a: &E, b: &E| a.key().cmp(&b.key()));
        let mut source = self.store.iterate()?;
        for element in &mut source {
            sorter.add(element?)?;
        }
        source.release();

        let mut sorted = RandomAccessObjectStore::new(&self.config.storage, &self.name);
        let mut elements = sorter.iterate()?;
        for element in &mut elements {
            sorted.add(&element?)?;
        }
        elements.release();

        let mut unsorted = std::mem::replace(&mut self.store, sorted);
        unsorted.release();
        self.sorted = true;
        Ok(())
    }

    /// Opens an independent reader, completing the index first.
    ///
    /// # Errors
    ///
    /// Returns an error if completion fails.
    pub fn reader(&mut self) -> StoreResult<IndexStoreReader<E>> {
        self.complete()?;
        Ok(IndexStoreReader {
            reader: self.store.reader()?,
            element_size: self.element_size.unwrap_or(0),
            element_count: self.element_count,
        })
    }

    /// Looks up the element with `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no element has that key.
    pub fn get(&mut self, key: E::Key) -> StoreResult<E> {
        if self.reader.is_none() {
            self.reader = Some(self.reader()?);
        }
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| StoreError::invalid_stage("read", StoreStage::Released))?;
        reader.get(key)
    }

    /// Iterates all elements in key order, completing the index first.
    ///
    /// # Errors
    ///
    /// Returns an error if completion fails.
    pub fn iterate(&mut self) -> StoreResult<ObjectIterator<E>> {
        self.complete()?;
        self.store.iterate()
    }

    /// Number of elements written.
    pub fn len(&self) -> u64 {
        self.element_count
    }

    /// Returns true if no element was written.
    pub fn is_empty(&self) -> bool {
        self.element_count == 0
    }

    /// Width of one element in bytes, once known.
    pub fn element_size(&self) -> Option<u64> {
        self.element_size
    }

    /// Returns true if elements have so far arrived in key order.
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }
}

impl<E: IndexElement> Release for IndexStore<E> {
    fn release(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            reader.release();
        }
        self.store.release();
    }
}

/// Binary-search reader over a completed [`IndexStore`].
pub struct IndexStoreReader<E: IndexElement> {
    reader: RandomAccessReader<E>,
    element_size: u64,
    element_count: u64,
}

impl<E: IndexElement> IndexStoreReader<E> {
    /// Number of elements.
    pub fn len(&self) -> u64 {
        self.element_count
    }

    /// Returns true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.element_count == 0
    }

    /// Reads the element at position `index`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `index` is out of range.
    pub fn element_at(&mut self, index: u64) -> StoreResult<E> {
        if index >= self.element_count {
            return Err(StoreError::not_found(&index));
        }
        self.reader.get(index * self.element_size)
    }

    /// Binary search for `key`.
    ///
    /// Returns `Ok(element)` when found, or `Err(position)` with the
    /// position where the key would be inserted.
    ///
    /// # Errors
    ///
    /// Returns an error if an element cannot be read.
    pub fn search(&mut self, key: E::Key) -> StoreResult<Result<E, u64>> {
        let mut low = 0u64;
        let mut high = self.element_count;
        while low < high {
            let mid = low + (high - low) / 2;
            let element = self.element_at(mid)?;
            match element.key().cmp(&key) {
                std::cmp::Ordering::Less => low = mid + 1,
                std::cmp::Ordering::Greater => high = mid,
                std::cmp::Ordering::Equal => return Ok(Ok(element)),
            }
        }
        Ok(Err(low))
    }

    /// Returns the element with `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no element has that key.
    pub fn get(&mut self, key: E::Key) -> StoreResult<E> {
        match self.search(key)? {
            Ok(element) => Ok(element),
            Err(_) => Err(StoreError::not_found(&key)),
        }
    }
}

impl<E: IndexElement> Release for IndexStoreReader<E> {
    fn release(&mut self) {
        self.reader.release();
    }
}
