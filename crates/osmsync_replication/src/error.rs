//! Error types for replication.

use osmsync_storage::StorageError;
use osmsync_store::StoreError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for replication operations.
pub type ReplicationResult<T> = Result<T, ReplicationError>;

/// Errors that can occur while assembling history or replicating changes.
///
/// Any error from [`crate::Replicator::replicate`] leaves the persisted
/// state untouched, so the next run repeats the same batch.
#[derive(Debug, Error)]
pub enum ReplicationError {
    /// Object store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// File plumbing error.
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The row source (database) failed.
    #[error("source error: {message}")]
    Source {
        /// Error message.
        message: String,
    },

    /// The change sink failed.
    #[error("destination error: {message}")]
    Destination {
        /// Error message.
        message: String,
    },

    /// A persisted state file could not be parsed.
    #[error("invalid replication state: {message}")]
    StateFormat {
        /// What was wrong.
        message: String,
    },

    /// Another replicator holds the working directory.
    #[error("working directory is locked: {path:?}")]
    Locked {
        /// Path of the lock file.
        path: PathBuf,
    },

    /// No replication state has been written yet.
    #[error("replication has not been initialized")]
    NotInitialized,
}

impl ReplicationError {
    /// Creates a source error.
    pub fn source_failed(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
        }
    }

    /// Creates a destination error.
    pub fn destination_failed(message: impl Into<String>) -> Self {
        Self::Destination {
            message: message.into(),
        }
    }

    /// Creates a state format error.
    pub fn state_format(message: impl Into<String>) -> Self {
        Self::StateFormat {
            message: message.into(),
        }
    }
}

impl From<StorageError> for ReplicationError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Locked { path } => Self::Locked { path },
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_errors_surface_as_locked() {
        let err: ReplicationError = StorageError::Locked {
            path: PathBuf::from("/data/replicate.lock"),
        }
        .into();
        assert!(matches!(err, ReplicationError::Locked { .. }));

        let err: ReplicationError = StorageError::Deleted.into();
        assert!(matches!(err, ReplicationError::Storage(StorageError::Deleted)));
    }

    #[test]
    fn error_display() {
        let err = ReplicationError::state_format("missing key txnMax");
        assert_eq!(err.to_string(), "invalid replication state: missing key txnMax");
        assert_eq!(
            ReplicationError::NotInitialized.to_string(),
            "replication has not been initialized"
        );
    }
}
