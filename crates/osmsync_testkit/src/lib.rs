//! # osmsync Testkit
//!
//! Test utilities for osmsync.
//!
//! This crate provides:
//! - In-memory row sources, change sources and change sinks
//! - Property-based test generators using proptest
//! - A harness that fails a batch part way and checks it replays
//!
//! ## Usage
//!
//! ```rust,ignore
//! use osmsync_testkit::prelude::*;
//!
//! let mut rows = MemoryRowSource::new();
//! rows.add_node(101, node_history(1, 1, true));
//! rows.set_snapshot(TransactionSnapshot::new(101, vec![]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use crash::*;
pub use fixtures::*;
pub use generators::*;
