//! # osmsync Storage
//!
//! File plumbing for osmsync.
//!
//! This crate knows nothing about records; it moves bytes.
//!
//! - [`SpillFile`] - a temporary file written once, then read through any
//!   number of independent seekable readers, deleted on release
//! - [`write_atomic`] - replace a small file via temp-file-then-rename
//! - [`DirLock`] - exclusive advisory lock on a working directory

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod atomic;
mod config;
mod error;
mod lock;
mod spill;

pub use atomic::write_atomic;
pub use config::{StorageConfig, DEFAULT_BUFFER_SIZE};
pub use error::{StorageError, StorageResult};
pub use lock::DirLock;
pub use spill::{OffsetWriter, SpillFile};
