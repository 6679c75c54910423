//! Advisory directory locking.

use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// An exclusive advisory lock on a working directory.
///
/// The lock is held through a lock file inside the directory and is
/// released when the value is dropped.
#[derive(Debug)]
pub struct DirLock {
    file: File,
    path: PathBuf,
}

impl DirLock {
    /// Acquires the lock file `name` inside `dir` without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another holder has the lock, or
    /// an I/O error if the lock file cannot be opened.
    pub fn acquire(dir: &Path, name: &str) -> StorageResult<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked { path });
        }

        tracing::debug!(path = %path.display(), "acquired directory lock");
        Ok(Self { file, path })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release directory lock");
        }
    }
}
