//! Spill store variants.
//!
//! All variants share one lifecycle, tracked by [`crate::StoreStage`]:
//! records are added, the first read closes the writer, any number of
//! readers may then replay the data, and release deletes the file.

mod chunked;
mod indexed;
pub(crate) mod object_file;
mod random_access;
mod segmented;
mod simple;

pub use chunked::ChunkedObjectStore;
pub use indexed::IndexedObjectStore;
pub use object_file::{ObjectIterator, RandomAccessReader};
pub use random_access::RandomAccessObjectStore;
pub use segmented::SegmentedObjectStore;
pub use simple::SimpleObjectStore;
