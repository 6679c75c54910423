//! Error types for object stores.

use crate::stage::StoreStage;
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in object stores, indexes and iterators.
///
/// End of stream is never an error: iterators simply return `None`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Record encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] osmsync_codec::CodecError),

    /// Spill file error.
    #[error("storage error: {0}")]
    Storage(#[from] osmsync_storage::StorageError),

    /// Operation not permitted in the store's current stage.
    #[error("cannot {operation} while store is in stage {stage:?}")]
    InvalidStage {
        /// Operation that was attempted.
        operation: &'static str,
        /// Stage the store was in.
        stage: StoreStage,
    },

    /// Input arrived out of the required order.
    #[error("ordering violation: {message}")]
    OrderingViolation {
        /// Description of the violation.
        message: String,
    },

    /// Index elements do not share one fixed width.
    #[error("index element width mismatch at element {index}: expected offset {expected}, got {actual}")]
    IndexWidthMismatch {
        /// Element position.
        index: u64,
        /// Offset implied by the established element width.
        expected: u64,
        /// Offset actually written.
        actual: u64,
    },

    /// A keyed lookup found nothing.
    #[error("key not found: {key}")]
    NotFound {
        /// Debug rendering of the key.
        key: String,
    },

    /// The other side of a handoff queue failed.
    #[error("{side} side of the queue aborted")]
    QueueAborted {
        /// Which side aborted, `"input"` or `"output"`.
        side: &'static str,
    },
}

impl StoreError {
    /// Creates an ordering violation error.
    pub fn ordering_violation(message: impl Into<String>) -> Self {
        Self::OrderingViolation {
            message: message.into(),
        }
    }

    /// Creates a not-found error from any debuggable key.
    pub fn not_found(key: &impl std::fmt::Debug) -> Self {
        Self::NotFound {
            key: format!("{key:?}"),
        }
    }

    /// Creates an invalid stage error.
    pub fn invalid_stage(operation: &'static str, stage: StoreStage) -> Self {
        Self::InvalidStage { operation, stage }
    }
}
