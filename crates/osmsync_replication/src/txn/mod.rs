//! Transaction snapshots and id ranges.

mod predicates;
mod snapshot;
mod space;

pub use predicates::{QueryPredicates, TxnRange};
pub use snapshot::TransactionSnapshot;
pub use space::{PostgresTxnIdSpace, TxnIdSpace};
