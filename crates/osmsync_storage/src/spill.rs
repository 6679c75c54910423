//! Temporary spill files.

use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::TempPath;

/// A buffered writer that tracks the byte offset of the next write.
#[derive(Debug)]
pub struct OffsetWriter {
    inner: BufWriter<File>,
    position: u64,
}

impl OffsetWriter {
    /// Offset at which the next byte will land.
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl Write for OffsetWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.position += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A temporary file written once and then read any number of times.
///
/// The file is created in [`StorageConfig::temp_dir`] and removed by
/// [`SpillFile::delete`] or, failing that, when the value is dropped.
///
/// # Lifecycle
///
/// - While writing, [`SpillFile::writer`] hands out a buffered writer.
/// - [`SpillFile::finish`] flushes and closes the writer; it is one-way.
/// - After finishing, [`SpillFile::open_reader`] opens independent
///   read handles at any offset.
/// - [`SpillFile::delete`] removes the file and is safe to call twice.
///
/// # Example
///
/// ```
/// use osmsync_storage::{SpillFile, StorageConfig};
/// use std::io::{Read, Write};
///
/// let mut spill = SpillFile::create(&StorageConfig::default(), "example").unwrap();
/// spill.writer().unwrap().write_all(b"hello world").unwrap();
/// assert_eq!(spill.finish().unwrap(), 11);
///
/// let mut text = String::new();
/// spill.open_reader(6).unwrap().read_to_string(&mut text).unwrap();
/// assert_eq!(text, "world");
/// spill.delete().unwrap();
/// ```
#[derive(Debug)]
pub struct SpillFile {
    path: Option<TempPath>,
    writer: Option<OffsetWriter>,
    size: u64,
    buffer_size: usize,
}

impl SpillFile {
    /// Creates a new empty spill file whose name starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(config: &StorageConfig, prefix: &str) -> StorageResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix).suffix(".spill");
        let named = match &config.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        let (file, path) = named.into_parts();
        tracing::debug!(path = %path.display(), "created spill file");

        Ok(Self {
            path: Some(path),
            writer: Some(OffsetWriter {
                inner: BufWriter::with_capacity(config.buffer_size, file),
                position: 0,
            }),
            size: 0,
            buffer_size: config.buffer_size,
        })
    }

    /// Returns the writer.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::WriteClosed`] after [`SpillFile::finish`] and
    /// [`StorageError::Deleted`] after [`SpillFile::delete`].
    pub fn writer(&mut self) -> StorageResult<&mut OffsetWriter> {
        if self.path.is_none() {
            return Err(StorageError::Deleted);
        }
        self.writer.as_mut().ok_or(StorageError::WriteClosed)
    }

    /// Returns true while the file accepts writes.
    pub fn is_writing(&self) -> bool {
        self.writer.is_some()
    }

    /// Current size: bytes written so far, or the final size once finished.
    pub fn position(&self) -> u64 {
        self.writer.as_ref().map_or(self.size, OffsetWriter::position)
    }

    /// Flushes buffered bytes to the OS without closing the writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn flush(&mut self) -> StorageResult<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    /// Flushes and closes the writer, returning the final size.
    ///
    /// Calling this again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub fn finish(&mut self) -> StorageResult<u64> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            self.size = writer.position;
        }
        Ok(self.size)
    }

    /// Opens an independent buffered reader positioned at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::StillWriting`] before [`SpillFile::finish`],
    /// [`StorageError::Deleted`] after [`SpillFile::delete`], or an I/O error.
    pub fn open_reader(&self, offset: u64) -> StorageResult<BufReader<File>> {
        let path = self.path.as_ref().ok_or(StorageError::Deleted)?;
        if self.writer.is_some() {
            return Err(StorageError::StillWriting);
        }
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        Ok(BufReader::with_capacity(self.buffer_size, file))
    }

    /// Returns the file path, or `None` once deleted.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns true once the file has been deleted.
    pub fn is_deleted(&self) -> bool {
        self.path.is_none()
    }

    /// Closes the writer and removes the file. Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed. The file is
    /// considered deleted either way.
    pub fn delete(&mut self) -> StorageResult<()> {
        // Buffered bytes are discarded with the file.
        self.writer = None;
        if let Some(path) = self.path.take() {
            tracing::debug!(path = %path.display(), "deleting spill file");
            path.close()?;
        }
        Ok(())
    }
}

impl Drop for SpillFile {
    fn drop(&mut self) {
        if let Err(e) = self.delete() {
            tracing::warn!(error = %e, "failed to delete spill file");
        }
    }
}
