//! Change derivation from entity history.

mod action;
mod reader;
mod snapshot;

pub use action::{ChangeAction, ChangeContainer};
pub use reader::ChangeReader;
pub use snapshot::SnapshotReader;
