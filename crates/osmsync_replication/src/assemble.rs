//! Merge-join of entity rows with their child feature rows.
//!
//! Every input arrives sorted from the backing store, so children are
//! attached by advancing each child stream in lockstep with the primary
//! stream. Only the rows of one owner are held at a time.
//!
//! Inputs that are not sorted are not detected: children are silently
//! dropped or attached to the wrong owner.

use crate::model::{Entity, EntityHistory, FeatureRow, OsmEntity, Relation, RelationMember, Tag, Way, WayNode};
use osmsync_store::{PeekableIterator, Release, StoreResult};
use std::cmp::Ordering;
use std::marker::PhantomData;

/// How a child row's key is compared with its owner's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinScope {
    /// Children belong to one version: match on `(id, version)`.
    Versioned,
    /// Children belong to the current entity: match on `id` only.
    Current,
}

impl JoinScope {
    fn compare(self, row_id: i64, row_version: i32, id: i64, version: i32) -> Ordering {
        match self {
            JoinScope::Versioned => (row_id, row_version).cmp(&(id, version)),
            JoinScope::Current => row_id.cmp(&id),
        }
    }
}

/// Attaches child features to an entity.
pub trait FeaturePopulator<E>: Release {
    /// Attaches every pending child row belonging to `entity`.
    ///
    /// # Errors
    ///
    /// Returns the child stream's error.
    fn populate(&mut self, entity: &mut E) -> StoreResult<()>;
}

/// A [`FeaturePopulator`] reading one sorted child stream.
pub struct JoinPopulator<E, F, I> {
    source: PeekableIterator<FeatureRow<F>, I>,
    scope: JoinScope,
    attach: fn(&mut E, F),
}

impl<E, F, I> JoinPopulator<E, F, I>
where
    E: OsmEntity,
    I: Iterator<Item = StoreResult<FeatureRow<F>>> + Release,
{
    /// Joins `source` into entities, attaching each matched feature with
    /// `attach`.
    pub fn new(source: I, scope: JoinScope, attach: fn(&mut E, F)) -> Self {
        Self {
            source: PeekableIterator::new(source),
            scope,
            attach,
        }
    }
}

fn push_tag<E: OsmEntity>(entity: &mut E, tag: Tag) {
    entity.header_mut().tags.push(tag);
}

impl<E, I> JoinPopulator<E, Tag, I>
where
    E: OsmEntity,
    I: Iterator<Item = StoreResult<FeatureRow<Tag>>> + Release,
{
    /// Joins a tag stream.
    pub fn tags(source: I, scope: JoinScope) -> Self {
        Self::new(source, scope, push_tag::<E>)
    }
}

impl<I> JoinPopulator<Way, WayNode, I>
where
    I: Iterator<Item = StoreResult<FeatureRow<WayNode>>> + Release,
{
    /// Joins a way node stream.
    pub fn way_nodes(source: I, scope: JoinScope) -> Self {
        Self::new(source, scope, |way, node| way.nodes.push(node))
    }
}

impl<I> JoinPopulator<Relation, RelationMember, I>
where
    I: Iterator<Item = StoreResult<FeatureRow<RelationMember>>> + Release,
{
    /// Joins a relation member stream.
    pub fn relation_members(source: I, scope: JoinScope) -> Self {
        Self::new(source, scope, |relation, member| relation.members.push(member))
    }
}

impl<E, F, I> FeaturePopulator<E> for JoinPopulator<E, F, I>
where
    E: OsmEntity,
    I: Iterator<Item = StoreResult<FeatureRow<F>>> + Release,
{
    fn populate(&mut self, entity: &mut E) -> StoreResult<()> {
        let (id, version) = (entity.header().id, entity.header().version);
        let scope = self.scope;
        loop {
            let ordering = match self.source.peek()? {
                Some(row) => scope.compare(row.entity_id, row.entity_version, id, version),
                None => return Ok(()),
            };
            match ordering {
                Ordering::Less => {
                    self.source.next().transpose()?;
                }
                Ordering::Equal => {
                    if let Some(row) = self.source.next().transpose()? {
                        (self.attach)(entity, row.feature);
                    }
                }
                Ordering::Greater => return Ok(()),
            }
        }
    }
}

impl<E, F, I: Release> Release for JoinPopulator<E, F, I> {
    fn release(&mut self) {
        self.source.release();
    }
}

/// Produces fully populated entity history rows from a primary stream and
/// any number of child streams.
///
/// Releasing the assembler releases the primary stream and every
/// populator.
pub struct EntityHistoryAssembler<E, I> {
    primary: I,
    populators: Vec<Box<dyn FeaturePopulator<E>>>,
}

impl<E, I> EntityHistoryAssembler<E, I>
where
    E: OsmEntity,
    I: Iterator<Item = StoreResult<EntityHistory<E>>> + Release,
{
    /// Creates an assembler over `primary` with no child streams.
    pub fn new(primary: I) -> Self {
        Self {
            primary,
            populators: Vec::new(),
        }
    }

    /// Adds a child stream.
    #[must_use]
    pub fn with_populator(mut self, populator: Box<dyn FeaturePopulator<E>>) -> Self {
        self.populators.push(populator);
        self
    }
}

impl<E, I> Iterator for EntityHistoryAssembler<E, I>
where
    E: OsmEntity,
    I: Iterator<Item = StoreResult<EntityHistory<E>>> + Release,
{
    type Item = StoreResult<EntityHistory<E>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut history = match self.primary.next()? {
            Ok(history) => history,
            Err(e) => return Some(Err(e)),
        };
        for populator in &mut self.populators {
            if let Err(e) = populator.populate(&mut history.entity) {
                return Some(Err(e));
            }
        }
        Some(Ok(history))
    }
}

impl<E, I: Release> Release for EntityHistoryAssembler<E, I> {
    fn release(&mut self) {
        self.primary.release();
        for populator in &mut self.populators {
            populator.release();
        }
    }
}

/// Lifts a stream of one concrete entity type into the [`Entity`] union.
pub struct AnyEntityIterator<E, I> {
    source: I,
    _marker: PhantomData<fn() -> E>,
}

impl<E, I> AnyEntityIterator<E, I> {
    /// Wraps `source`.
    pub fn new(source: I) -> Self {
        Self {
            source,
            _marker: PhantomData,
        }
    }
}

impl<E, I> Iterator for AnyEntityIterator<E, I>
where
    E: OsmEntity,
    I: Iterator<Item = StoreResult<EntityHistory<E>>>,
{
    type Item = StoreResult<EntityHistory<Entity>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.source.next().map(|r| r.map(EntityHistory::into_entity))
    }
}

impl<E, I: Release> Release for AnyEntityIterator<E, I> {
    fn release(&mut self) {
        self.source.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityHeader, EntityType, Node};
    use chrono::{TimeZone, Utc};
    use osmsync_store::ReleasableVecIterator;

    fn node(id: i64, version: i32) -> EntityHistory<Node> {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        EntityHistory::new(Node::new(EntityHeader::new(id, version, timestamp, 1), 0.0, 0.0), true)
    }

    fn way(id: i64, version: i32) -> EntityHistory<Way> {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        EntityHistory::new(Way::new(EntityHeader::new(id, version, timestamp, 1)), true)
    }

    fn tag_rows(rows: &[(i64, i32, &str)]) -> ReleasableVecIterator<FeatureRow<Tag>> {
        rows.iter()
            .enumerate()
            .map(|(seq, (id, version, value))| FeatureRow::new(*id, *version, seq as i32, Tag::new("k", *value)))
            .collect::<Vec<_>>()
            .into()
    }

    fn tag_values<E: OsmEntity>(history: &EntityHistory<E>) -> Vec<String> {
        history.entity.header().tags.iter().map(|t| t.value.clone()).collect()
    }

    #[test]
    fn children_attach_to_matching_owner() {
        let primary = ReleasableVecIterator::new(vec![node(1, 1), node(2, 1), node(3, 1)]);
        let tags = tag_rows(&[(1, 1, "a"), (1, 1, "b"), (3, 1, "c")]);
        let assembler = EntityHistoryAssembler::new(primary)
            .with_populator(Box::new(JoinPopulator::<Node, _, _>::tags(tags, JoinScope::Versioned)));

        let assembled: Vec<EntityHistory<Node>> = assembler.map(|r| r.unwrap()).collect();
        let ids: Vec<i64> = assembled.iter().map(EntityHistory::id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(tag_values(&assembled[0]), vec!["a", "b"]);
        assert!(tag_values(&assembled[1]).is_empty());
        assert_eq!(tag_values(&assembled[2]), vec!["c"]);
    }

    #[test]
    fn versioned_scope_requires_exact_version() {
        let primary = ReleasableVecIterator::new(vec![node(1, 1), node(1, 2), node(2, 3)]);
        let tags = tag_rows(&[(1, 1, "v1"), (1, 2, "v2a"), (1, 2, "v2b"), (2, 2, "stale"), (2, 3, "v3")]);
        let assembled: Vec<EntityHistory<Node>> = EntityHistoryAssembler::new(primary)
            .with_populator(Box::new(JoinPopulator::<Node, _, _>::tags(tags, JoinScope::Versioned)))
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(tag_values(&assembled[0]), vec!["v1"]);
        assert_eq!(tag_values(&assembled[1]), vec!["v2a", "v2b"]);
        assert_eq!(tag_values(&assembled[2]), vec!["v3"]);
    }

    #[test]
    fn current_scope_matches_on_id_only() {
        let primary = ReleasableVecIterator::new(vec![way(5, 7), way(6, 1)]);
        let nodes: ReleasableVecIterator<FeatureRow<WayNode>> = vec![
            FeatureRow::new(4, 1, 0, WayNode::new(99)),
            FeatureRow::new(5, 1, 0, WayNode::new(10)),
            FeatureRow::new(5, 1, 1, WayNode::new(11)),
            FeatureRow::new(6, 9, 0, WayNode::new(12)),
        ]
        .into();

        let assembled: Vec<EntityHistory<Way>> = EntityHistoryAssembler::new(primary)
            .with_populator(Box::new(JoinPopulator::way_nodes(nodes, JoinScope::Current)))
            .map(|r| r.unwrap())
            .collect();

        let refs = |h: &EntityHistory<Way>| h.entity.nodes.iter().map(|n| n.node_id).collect::<Vec<_>>();
        assert_eq!(refs(&assembled[0]), vec![10, 11]);
        assert_eq!(refs(&assembled[1]), vec![12]);
    }

    #[test]
    fn multiple_child_streams() {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let primary = ReleasableVecIterator::new(vec![EntityHistory::new(
            Relation::new(EntityHeader::new(8, 1, timestamp, 1)),
            true,
        )]);
        let tags = tag_rows(&[(8, 1, "multipolygon")]);
        let members: ReleasableVecIterator<FeatureRow<RelationMember>> = vec![
            FeatureRow::new(8, 1, 0, RelationMember::new(5, EntityType::Way, "outer")),
            FeatureRow::new(8, 1, 1, RelationMember::new(6, EntityType::Way, "inner")),
        ]
        .into();

        let mut assembler = EntityHistoryAssembler::new(primary)
            .with_populator(Box::new(JoinPopulator::<Relation, _, _>::tags(tags, JoinScope::Versioned)))
            .with_populator(Box::new(JoinPopulator::relation_members(members, JoinScope::Versioned)));
        let relation = assembler.next().unwrap().unwrap();
        assert_eq!(relation.entity.header.tags.len(), 1);
        assert_eq!(relation.entity.members.len(), 2);
        assert_eq!(relation.entity.members[1].role, "inner");
        assert!(assembler.next().is_none());
        assembler.release();
    }

    #[test]
    fn lifted_into_entity_union() {
        let primary = ReleasableVecIterator::new(vec![node(1, 1)]);
        let mut lifted = AnyEntityIterator::<Node, _>::new(EntityHistoryAssembler::new(primary));
        let history = lifted.next().unwrap().unwrap();
        assert_eq!(history.entity.entity_type(), EntityType::Node);
        assert!(history.visible);
    }
}
