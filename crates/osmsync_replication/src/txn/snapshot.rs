//! Backend transaction snapshots.

use serde::{Deserialize, Serialize};

/// The backend's view of transaction progress at one moment.
///
/// Every id up to and including `txn_max` has been assigned. Ids listed in
/// `active` were still in flight; every other assigned id has committed or
/// rolled back, so its rows are final.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionSnapshot {
    /// Highest assigned transaction id.
    pub txn_max: u64,
    /// Transaction ids still in flight.
    pub active: Vec<u64>,
}

impl TransactionSnapshot {
    /// Creates a snapshot.
    pub fn new(txn_max: u64, active: Vec<u64>) -> Self {
        Self { txn_max, active }
    }
}
