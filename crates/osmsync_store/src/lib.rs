//! # osmsync Store
//!
//! Disk-backed object storage for datasets larger than memory.
//!
//! This crate provides:
//! - Spill stores: [`SimpleObjectStore`], [`SegmentedObjectStore`],
//!   [`ChunkedObjectStore`], [`RandomAccessObjectStore`] and
//!   [`IndexedObjectStore`]
//! - [`IndexStore`] - a fixed-width key-sorted file with binary search
//! - [`FileBasedSort`] - a stable external merge sort
//! - Releasable stream adapters in [`iter`]
//! - [`DataPostbox`] - a bounded handoff queue between threads
//!
//! Every store moves through [`StoreStage`] once: add, read, release.
//! Records are encoded with [`osmsync_codec::Storeable`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod index;
pub mod iter;
mod postbox;
mod sort;
mod stage;
mod store;

pub use config::{StoreConfig, DEFAULT_SORT_FAN_IN, DEFAULT_SORT_RUN_SIZE};
pub use error::{StoreError, StoreResult};
pub use index::{IndexElement, IndexStore, IndexStoreReader, IntegerLongIndexElement, LongLongIndexElement};
pub use iter::{
    BoxedIterator, ChainedIterator, MergingIterator, PeekableIterator, PersistentIterator, ReleasableIterator,
    ReleasableVecIterator, Release,
};
pub use postbox::{DataPostbox, DEFAULT_POSTBOX_CAPACITY};
pub use sort::FileBasedSort;
pub use stage::StoreStage;
pub use store::{
    ChunkedObjectStore, IndexedObjectStore, ObjectIterator, RandomAccessObjectStore, RandomAccessReader,
    SegmentedObjectStore, SimpleObjectStore,
};
