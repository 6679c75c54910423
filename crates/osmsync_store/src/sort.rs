//! External merge sort over spill files.
//!
//! Records are buffered in memory up to [`StoreConfig::sort_run_size`].
//! A full buffer is sorted stably and written to a [`ChunkedObjectStore`]
//! as one run. When the records are read back, runs are merged in passes
//! of at most [`StoreConfig::sort_fan_in`] until few enough remain to
//! merge directly into the output stream. Input that never fills a buffer
//! is sorted in memory and never touches disk.

use crate::config::StoreConfig;
use crate::error::StoreResult;
use crate::iter::{BoxedIterator, MergingIterator, ReleasableVecIterator, Release};
use crate::store::ChunkedObjectStore;
use osmsync_codec::Storeable;
use std::cmp::Ordering;

/// A stable external sort.
///
/// Equal records come out in the order they were added.
///
/// # Example
///
/// ```
/// use osmsync_store::{FileBasedSort, StoreConfig};
///
/// let mut sort = FileBasedSort::new(StoreConfig::default(), |a: &i64, b: &i64| a.cmp(b));
/// for value in [5, 3, 9, 1] {
///     sort.add(value).unwrap();
/// }
/// let sorted: Vec<i64> = sort.iterate().unwrap().map(|r| r.unwrap()).collect();
/// assert_eq!(sorted, vec![1, 3, 5, 9]);
/// ```
pub struct FileBasedSort<T, C> {
    config: StoreConfig,
    comparator: C,
    buffer: Vec<T>,
    runs: Option<ChunkedObjectStore<T>>,
    count: u64,
}

impl<T, C> FileBasedSort<T, C>
where
    T: Storeable + 'static,
    C: Fn(&T, &T) -> Ordering + Clone + 'static,
{
    /// Creates an empty sort ordered by `comparator`.
    pub fn new(config: StoreConfig, comparator: C) -> Self {
        Self {
            config,
            comparator,
            buffer: Vec::new(),
            runs: None,
            count: 0,
        }
    }

    /// Adds a record, spilling a sorted run if the buffer is full.
    ///
    /// # Errors
    ///
    /// Returns an error if writing a run fails.
    pub fn add(&mut self, value: T) -> StoreResult<()> {
        self.buffer.push(value);
        self.count += 1;
        if self.buffer.len() >= self.config.sort_run_size {
            self.spill_run()?;
        }
        Ok(())
    }

    /// Number of records added.
    pub fn len(&self) -> u64 {
        self.count
    }

    /// Returns true if no record was added.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn spill_run(&mut self) -> StoreResult<()> {
        let comparator = &self.comparator;
        self.buffer.sort_by(|a, b| comparator(a, b));

        let config = &self.config;
        let runs = self
            .runs
            .get_or_insert_with(|| ChunkedObjectStore::new(config, "sort-runs"));
        for value in self.buffer.drain(..) {
            runs.add(&value)?;
        }
        runs.close_chunk()?;
        Ok(())
    }

    /// Consumes the sort and returns its records in order.
    ///
    /// # Errors
    ///
    /// Returns an error if spilling or an intermediate merge pass fails.
    pub fn iterate(mut self) -> StoreResult<BoxedIterator<T>> {
        if self.runs.is_none() {
            let comparator = &self.comparator;
            self.buffer.sort_by(|a, b| comparator(a, b));
            return Ok(Box::new(ReleasableVecIterator::new(std::mem::take(&mut self.buffer))));
        }
        if !self.buffer.is_empty() {
            self.spill_run()?;
        }
        let Some(mut runs) = self.runs.take() else {
            return Ok(Box::new(ReleasableVecIterator::new(Vec::new())));
        };

        let fan_in = self.config.sort_fan_in as u64;
        let mut pass = 0u32;
        while runs.chunk_count() > fan_in {
            pass += 1;
            runs = self.merge_pass(runs, pass)?;
        }

        let run_count = runs.chunk_count();
        let sources = Self::open_runs(&mut runs, 0, run_count)?;
        tracing::debug!(records = self.count, runs = sources.len(), passes = pass, "external sort merging");
        let merged = MergingIterator::new(sources, self.comparator.clone()).with_owner(Box::new(runs));
        Ok(Box::new(merged))
    }

    fn open_runs(runs: &mut ChunkedObjectStore<T>, start: u64, end: u64) -> StoreResult<Vec<BoxedIterator<T>>> {
        (start..end)
            .map(|chunk| runs.iterate(chunk).map(|iter| Box::new(iter) as BoxedIterator<T>))
            .collect()
    }

    /// Merges groups of `fan_in` runs from `runs` into a new run store.
    fn merge_pass(&self, mut runs: ChunkedObjectStore<T>, pass: u32) -> StoreResult<ChunkedObjectStore<T>> {
        let fan_in = self.config.sort_fan_in as u64;
        let total = runs.chunk_count();
        tracing::debug!(pass, runs = total, "external sort merge pass");

        let mut merged_runs = ChunkedObjectStore::new(&self.config, "sort-runs");
        let mut start = 0;
        while start < total {
            let end = (start + fan_in).min(total);
            let sources = Self::open_runs(&mut runs, start, end)?;
            let mut merged = MergingIterator::new(sources, self.comparator.clone());
            for value in &mut merged {
                merged_runs.add(&value?)?;
            }
            merged.release();
            merged_runs.close_chunk()?;
            start = end;
        }

        runs.release();
        Ok(merged_runs)
    }
}

impl<T, C> Release for FileBasedSort<T, C>
where
    T: Storeable,
{
    fn release(&mut self) {
        self.buffer.clear();
        if let Some(mut runs) = self.runs.take() {
            runs.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(dir: &tempfile::TempDir, run_size: usize, fan_in: usize) -> StoreConfig {
        StoreConfig::new()
            .with_temp_dir(dir.path())
            .with_sort_run_size(run_size)
            .with_sort_fan_in(fan_in)
    }

    fn by_key(a: &(i64, i32), b: &(i64, i32)) -> Ordering {
        a.0.cmp(&b.0)
    }

    #[test]
    fn in_memory_sort_uses_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sort = FileBasedSort::new(config(&dir, 100, 4), |a: &i64, b: &i64| a.cmp(b));
        for v in [3, 1, 2] {
            sort.add(v).unwrap();
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        let sorted: Vec<i64> = sort.iterate().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(sorted, vec![1, 2, 3]);
    }

    #[test]
    fn multi_pass_merge_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        // 10 records per run, fan-in 2: 100 runs need several passes.
        let mut sort = FileBasedSort::new(config(&dir, 10, 2), by_key);
        for seq in 0..1000 {
            sort.add((i64::from(seq % 7), seq)).unwrap();
        }
        let sorted: Vec<(i64, i32)> = sort.iterate().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(sorted.len(), 1000);
        for pair in sorted.windows(2) {
            assert!(pair[0].0 <= pair[1].0);
            if pair[0].0 == pair[1].0 {
                assert!(pair[0].1 < pair[1].1, "equal keys must keep insertion order");
            }
        }
    }

    #[test]
    fn release_of_merge_deletes_runs() {
        let dir = tempfile::tempdir().unwrap();
        let mut sort = FileBasedSort::new(config(&dir, 4, 3), |a: &i64, b: &i64| b.cmp(a));
        for v in 0..50 {
            sort.add(v).unwrap();
        }
        let mut sorted = sort.iterate().unwrap();
        assert_eq!(sorted.next().unwrap().unwrap(), 49);
        assert!(std::fs::read_dir(dir.path()).unwrap().count() > 0);
        sorted.release();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn empty_sort() {
        let dir = tempfile::tempdir().unwrap();
        let sort = FileBasedSort::new(config(&dir, 4, 2), |a: &i64, b: &i64| a.cmp(b));
        assert!(sort.is_empty());
        assert!(sort.iterate().unwrap().next().is_none());
    }

    #[test]
    fn exact_multiple_of_run_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut sort = FileBasedSort::new(config(&dir, 5, 2), |a: &i64, b: &i64| a.cmp(b));
        for v in (0..20).rev() {
            sort.add(v).unwrap();
        }
        let sorted: Vec<i64> = sort.iterate().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn matches_stable_in_memory_sort(
            keys in prop::collection::vec(0i64..50, 0..400),
            run_size in 1usize..40,
            fan_in in 2usize..6,
        ) {
            let dir = tempfile::tempdir().unwrap();
            let mut sort = FileBasedSort::new(config(&dir, run_size, fan_in), by_key);
            let records: Vec<(i64, i32)> = keys.iter().enumerate().map(|(i, k)| (*k, i as i32)).collect();
            for record in &records {
                sort.add(*record).unwrap();
            }
            let sorted: Vec<(i64, i32)> = sort.iterate().unwrap().map(|r| r.unwrap()).collect();

            let mut expected = records;
            expected.sort_by(by_key);
            prop_assert_eq!(sorted, expected);
        }
    }
}
