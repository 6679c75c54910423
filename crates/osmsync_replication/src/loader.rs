//! Materialization and assembly of history streams.

use crate::assemble::{AnyEntityIterator, EntityHistoryAssembler, JoinPopulator, JoinScope};
use crate::error::ReplicationResult;
use crate::model::{Entity, EntityHistory, EntityType, Node, Relation, Way};
use crate::source::HistoryRowSource;
use crate::txn::QueryPredicates;
use osmsync_codec::Storeable;
use osmsync_store::{BoxedIterator, ChainedIterator, PersistentIterator, StoreConfig};

/// Loads every history stream of a batch and assembles full entities.
///
/// Each stream is drained to a spill store before the next is requested,
/// since a backend cursor is only valid while it is the only one open.
/// The merge-join then reads all spilled streams side by side. Nodes come
/// first, then ways, then relations.
#[derive(Debug, Clone)]
pub struct EntityHistoryLoader {
    config: StoreConfig,
    scope: JoinScope,
}

impl EntityHistoryLoader {
    /// Creates a loader joining versioned child rows.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            scope: JoinScope::Versioned,
        }
    }

    /// Sets how child rows are matched to entities.
    #[must_use]
    pub fn with_scope(mut self, scope: JoinScope) -> Self {
        self.scope = scope;
        self
    }

    /// Loads and assembles the histories selected by `predicates`.
    ///
    /// # Errors
    ///
    /// Returns the first source or store error. Streams already spilled
    /// are deleted when the partially built result is dropped.
    pub fn load<S: HistoryRowSource + ?Sized>(
        &self,
        source: &mut S,
        predicates: &QueryPredicates,
    ) -> ReplicationResult<BoxedIterator<EntityHistory<Entity>>> {
        let nodes = self.persist("nodes", source.nodes(predicates)?)?;
        let node_tags = self.persist("node-tags", source.tags(EntityType::Node, predicates)?)?;
        let nodes = EntityHistoryAssembler::new(nodes)
            .with_populator(Box::new(JoinPopulator::<Node, _, _>::tags(node_tags, self.scope)));

        let ways = self.persist("ways", source.ways(predicates)?)?;
        let way_tags = self.persist("way-tags", source.tags(EntityType::Way, predicates)?)?;
        let way_nodes = self.persist("way-nodes", source.way_nodes(predicates)?)?;
        let ways = EntityHistoryAssembler::new(ways)
            .with_populator(Box::new(JoinPopulator::<Way, _, _>::tags(way_tags, self.scope)))
            .with_populator(Box::new(JoinPopulator::way_nodes(way_nodes, self.scope)));

        let relations = self.persist("relations", source.relations(predicates)?)?;
        let relation_tags = self.persist("relation-tags", source.tags(EntityType::Relation, predicates)?)?;
        let members = self.persist("relation-members", source.relation_members(predicates)?)?;
        let relations = EntityHistoryAssembler::new(relations)
            .with_populator(Box::new(JoinPopulator::<Relation, _, _>::tags(relation_tags, self.scope)))
            .with_populator(Box::new(JoinPopulator::relation_members(members, self.scope)));

        tracing::debug!(scope = ?self.scope, "history streams materialized");
        let streams: Vec<BoxedIterator<EntityHistory<Entity>>> = vec![
            Box::new(AnyEntityIterator::<Node, _>::new(nodes)),
            Box::new(AnyEntityIterator::<Way, _>::new(ways)),
            Box::new(AnyEntityIterator::<Relation, _>::new(relations)),
        ];
        Ok(Box::new(ChainedIterator::new(streams)))
    }

    fn persist<T: Storeable + 'static>(
        &self,
        name: &str,
        source: BoxedIterator<T>,
    ) -> ReplicationResult<BoxedIterator<T>> {
        let mut persisted = PersistentIterator::new(&self.config.storage, name, source);
        persisted.materialize()?;
        Ok(Box::new(persisted))
    }
}

impl Default for EntityHistoryLoader {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}
