//! Stage-checked record file shared by the store variants.

use crate::error::{StoreError, StoreResult};
use crate::iter::Release;
use crate::stage::StoreStage;
use osmsync_codec::{ClassRegistry, RecordReader, RecordWriter, Storeable};
use osmsync_storage::{SpillFile, StorageConfig};
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::marker::PhantomData;

/// A spill file holding records of type `T`, plus the stage machine and
/// class registry every store variant needs.
pub(crate) struct ObjectFile<T> {
    name: String,
    config: StorageConfig,
    stage: StoreStage,
    file: Option<SpillFile>,
    registry: ClassRegistry,
    count: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Storeable> ObjectFile<T> {
    pub(crate) fn new(config: &StorageConfig, name: &str) -> Self {
        Self {
            name: name.to_string(),
            config: config.clone(),
            stage: StoreStage::NotStarted,
            file: None,
            registry: ClassRegistry::new(),
            count: 0,
            _marker: PhantomData,
        }
    }

    pub(crate) fn stage(&self) -> StoreStage {
        self.stage
    }

    pub(crate) fn len(&self) -> u64 {
        self.count
    }

    /// Offset the next record will be written at.
    pub(crate) fn position(&self) -> u64 {
        self.file.as_ref().map_or(0, SpillFile::position)
    }

    /// Appends a record and returns the offset it was written at.
    pub(crate) fn add(&mut self, value: &T) -> StoreResult<u64> {
        if !self.stage.can_add() {
            return Err(StoreError::invalid_stage("add", self.stage));
        }
        if self.file.is_none() {
            let prefix = format!("osmsync-{}-", self.name);
            self.file = Some(SpillFile::create(&self.config, &prefix)?);
            self.stage = StoreStage::Add;
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| StoreError::invalid_stage("add", self.stage))?;

        let offset = file.position();
        let mut writer = RecordWriter::new(file.writer()?);
        value.store(&mut writer, &mut self.registry)?;
        self.count += 1;
        Ok(offset)
    }

    /// Flushes buffered records without leaving the `Add` stage.
    pub(crate) fn flush(&mut self) -> StoreResult<u64> {
        match self.file.as_mut() {
            Some(file) if self.stage == StoreStage::Add => {
                file.flush()?;
                Ok(file.position())
            }
            _ => Ok(self.position()),
        }
    }

    /// Closes writing and moves to `Reading`. Idempotent.
    pub(crate) fn begin_reading(&mut self) -> StoreResult<()> {
        match self.stage {
            StoreStage::NotStarted | StoreStage::Add => {
                if let Some(file) = self.file.as_mut() {
                    file.finish()?;
                }
                self.stage = StoreStage::Reading;
                tracing::debug!(store = %self.name, records = self.count, "store switched to reading");
                Ok(())
            }
            StoreStage::Reading => Ok(()),
            StoreStage::Released => Err(StoreError::invalid_stage("read", self.stage)),
        }
    }

    /// Opens a sequential iterator at `offset`, optionally limited to
    /// `limit` records.
    pub(crate) fn iterate_from(&mut self, offset: u64, limit: Option<u64>) -> StoreResult<ObjectIterator<T>> {
        self.begin_reading()?;
        let reader = match self.file.as_ref() {
            Some(file) => Some(RecordReader::new(file.open_reader(offset)?)),
            None => None,
        };
        Ok(ObjectIterator {
            reader,
            registry: self.registry.clone(),
            remaining: limit,
            _marker: PhantomData,
        })
    }

    /// Opens a seekable reader for random access.
    pub(crate) fn open_random_reader(&mut self) -> StoreResult<RandomAccessReader<T>> {
        self.begin_reading()?;
        let reader = match self.file.as_ref() {
            Some(file) => Some(RecordReader::new(file.open_reader(0)?)),
            None => None,
        };
        Ok(RandomAccessReader {
            reader,
            registry: self.registry.clone(),
            _marker: PhantomData,
        })
    }

    /// Deletes the backing file. Idempotent; errors are logged.
    pub(crate) fn release(&mut self) {
        if self.stage == StoreStage::Released {
            return;
        }
        self.stage = StoreStage::Released;
        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.delete() {
                tracing::warn!(store = %self.name, error = %e, "failed to delete store file");
            }
        }
    }
}

/// Sequential iterator over records in a store file.
///
/// Holds its own read handle, so several iterators over one store may be
/// open at once. A limit restricts it to a fixed number of records, which
/// is how a single chunk is replayed.
pub struct ObjectIterator<T> {
    reader: Option<RecordReader<BufReader<File>>>,
    registry: ClassRegistry,
    remaining: Option<u64>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Storeable> Iterator for ObjectIterator<T> {
    type Item = StoreResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            self.reader = None;
            return None;
        }
        let reader = self.reader.as_mut()?;

        match reader.is_at_end() {
            Ok(true) => {
                self.reader = None;
                return None;
            }
            Ok(false) => {}
            Err(e) => {
                self.reader = None;
                return Some(Err(e.into()));
            }
        }

        match T::load(reader, &self.registry) {
            Ok(value) => {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                Some(Ok(value))
            }
            Err(e) => {
                self.reader = None;
                Some(Err(e.into()))
            }
        }
    }
}

impl<T> Release for ObjectIterator<T> {
    fn release(&mut self) {
        self.reader = None;
    }
}

/// Reads single records at arbitrary offsets.
pub struct RandomAccessReader<T> {
    reader: Option<RecordReader<BufReader<File>>>,
    registry: ClassRegistry,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Storeable> RandomAccessReader<T> {
    /// Reads the record starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an empty store, or a codec
    /// error if `offset` is not a record boundary.
    pub fn get(&mut self, offset: u64) -> StoreResult<T> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| StoreError::not_found(&offset))?;
        reader.get_mut().seek(SeekFrom::Start(offset))?;
        Ok(T::load(reader, &self.registry)?)
    }
}

impl<T> Release for RandomAccessReader<T> {
    fn release(&mut self) {
        self.reader = None;
    }
}
