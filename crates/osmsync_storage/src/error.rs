//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file has already been deleted.
    #[error("storage file has been deleted")]
    Deleted,

    /// The file is still open for writing.
    #[error("storage file is still being written")]
    StillWriting,

    /// The file has been closed for writing.
    #[error("storage file is closed for writing")]
    WriteClosed,

    /// Another process holds the directory lock.
    #[error("directory locked: {path:?} is held by another process")]
    Locked {
        /// Path of the lock file.
        path: PathBuf,
    },
}
