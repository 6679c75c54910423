//! Row and change sources.

use crate::change::{ChangeContainer, ChangeReader};
use crate::error::ReplicationResult;
use crate::loader::EntityHistoryLoader;
use crate::model::{EntityHistory, EntityType, FeatureRow, Node, Relation, RelationMember, Tag, Way, WayNode};
use crate::txn::{QueryPredicates, TransactionSnapshot};
use chrono::{DateTime, Utc};
use osmsync_store::BoxedIterator;

/// Where the replicator reads transaction progress and changes from.
pub trait ReplicationSource {
    /// Reads the backend's current transaction snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplicationError::Source`] on backend failure.
    fn snapshot(&mut self) -> ReplicationResult<TransactionSnapshot>;

    /// Reads the backend's clock.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplicationError::Source`] on backend failure.
    fn system_time(&mut self) -> ReplicationResult<DateTime<Utc>>;

    /// Streams the changes written by the transactions in `predicates`,
    /// ordered by entity type, id and version.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplicationError::Source`] on backend failure.
    fn changes(
        &mut self,
        predicates: &QueryPredicates,
        full_history: bool,
    ) -> ReplicationResult<BoxedIterator<ChangeContainer>>;
}

/// A backend holding full entity history tables.
///
/// Every stream covers the rows written by the transactions in the given
/// predicates. Entity streams are ascending by `(id, version)`; feature
/// streams by `(entity_id, entity_version, sequence)`. Only one stream is
/// open at a time: callers drain and release each before requesting the
/// next.
pub trait HistoryRowSource {
    /// Reads the current transaction snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplicationError::Source`] on backend failure.
    fn transaction_snapshot(&mut self) -> ReplicationResult<TransactionSnapshot>;

    /// Reads the backend's clock.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplicationError::Source`] on backend failure.
    fn system_time(&mut self) -> ReplicationResult<DateTime<Utc>>;

    /// Node history rows.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplicationError::Source`] on backend failure.
    fn nodes(&mut self, predicates: &QueryPredicates) -> ReplicationResult<BoxedIterator<EntityHistory<Node>>>;

    /// Way history rows.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplicationError::Source`] on backend failure.
    fn ways(&mut self, predicates: &QueryPredicates) -> ReplicationResult<BoxedIterator<EntityHistory<Way>>>;

    /// Relation history rows.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplicationError::Source`] on backend failure.
    fn relations(
        &mut self,
        predicates: &QueryPredicates,
    ) -> ReplicationResult<BoxedIterator<EntityHistory<Relation>>>;

    /// Tag rows of one entity type.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplicationError::Source`] on backend failure.
    fn tags(
        &mut self,
        entity_type: EntityType,
        predicates: &QueryPredicates,
    ) -> ReplicationResult<BoxedIterator<FeatureRow<Tag>>>;

    /// Way node rows.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplicationError::Source`] on backend failure.
    fn way_nodes(&mut self, predicates: &QueryPredicates) -> ReplicationResult<BoxedIterator<FeatureRow<WayNode>>>;

    /// Relation member rows.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplicationError::Source`] on backend failure.
    fn relation_members(
        &mut self,
        predicates: &QueryPredicates,
    ) -> ReplicationResult<BoxedIterator<FeatureRow<RelationMember>>>;
}

/// Turns a [`HistoryRowSource`] into a [`ReplicationSource`] by assembling
/// entity histories and deriving changes from them.
pub struct HistoryReplicationSource<S> {
    rows: S,
    loader: EntityHistoryLoader,
}

impl<S: HistoryRowSource> HistoryReplicationSource<S> {
    /// Wraps `rows`, materializing streams with `loader`.
    pub fn new(rows: S, loader: EntityHistoryLoader) -> Self {
        Self { rows, loader }
    }

    /// The wrapped row source.
    pub fn rows(&self) -> &S {
        &self.rows
    }

    /// The wrapped row source, mutably.
    pub fn rows_mut(&mut self) -> &mut S {
        &mut self.rows
    }

    /// Unwraps the row source.
    pub fn into_inner(self) -> S {
        self.rows
    }
}

impl<S: HistoryRowSource> ReplicationSource for HistoryReplicationSource<S> {
    fn snapshot(&mut self) -> ReplicationResult<TransactionSnapshot> {
        self.rows.transaction_snapshot()
    }

    fn system_time(&mut self) -> ReplicationResult<DateTime<Utc>> {
        self.rows.system_time()
    }

    fn changes(
        &mut self,
        predicates: &QueryPredicates,
        full_history: bool,
    ) -> ReplicationResult<BoxedIterator<ChangeContainer>> {
        let histories = self.loader.load(&mut self.rows, predicates)?;
        Ok(Box::new(ChangeReader::new(histories, full_history)))
    }
}
