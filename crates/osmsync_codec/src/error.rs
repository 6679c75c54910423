//! Error types for the codec crate.

use std::io;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while writing or reading records.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended in the middle of a record.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A string field did not contain valid UTF-8.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// A string field is longer than the codec allows.
    #[error("string of {len} bytes exceeds the limit of {limit}")]
    StringTooLong {
        /// Declared byte length.
        len: u64,
        /// Maximum permitted byte length.
        limit: u64,
    },

    /// The registry met more distinct classes than a one-byte tag can name.
    #[error("class registry is full: at most {limit} classes per stream")]
    ClassLimitExceeded {
        /// Maximum number of classes per stream.
        limit: usize,
    },

    /// A tag was read that the stream never registered.
    #[error("unknown class tag {tag}")]
    UnknownClassTag {
        /// The tag byte read from the stream.
        tag: u8,
    },

    /// A registered class name does not match any variant of the target type.
    #[error("class {name} is not a variant of {target}")]
    UnknownVariant {
        /// Class name recovered from the registry.
        name: String,
        /// Name of the type being decoded.
        target: &'static str,
    },

    /// Field data was malformed.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },
}

impl CodecError {
    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Create an unknown variant error.
    pub fn unknown_variant(name: impl Into<String>, target: &'static str) -> Self {
        Self::UnknownVariant {
            name: name.into(),
            target,
        }
    }

    /// Maps an I/O error, turning a short read into [`CodecError::UnexpectedEof`].
    pub(crate) fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::UnexpectedEof
        } else {
            Self::Io(err)
        }
    }
}
