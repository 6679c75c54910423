//! Fixed-width sorted index files.

mod element;
mod store;

pub use element::{IndexElement, IntegerLongIndexElement, LongLongIndexElement};
pub use store::{IndexStore, IndexStoreReader};
