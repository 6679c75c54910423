//! In-memory sources and sinks.
//!
//! These stand in for a database and an output writer so replication can
//! be exercised end to end without either.

use chrono::{DateTime, Duration, TimeZone, Utc};
use osmsync_replication::{
    ChangeContainer, ChangeSink, EntityHeader, EntityHistory, EntityType, FeatureRow, HistoryRowSource, Node,
    OsmEntity, QueryPredicates, Relation, RelationMember, ReplicationError, ReplicationResult, ReplicationSource,
    ReplicationState, Tag, TransactionSnapshot, Way, WayNode,
};
use osmsync_store::{BoxedIterator, Release, ReleasableVecIterator, StoreResult};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A whole-second UTC time. Stored timestamps keep millisecond precision,
/// so fixtures avoid anything finer.
pub fn utc(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().expect("timestamp in range")
}

fn header(id: i64, version: i32) -> EntityHeader {
    EntityHeader::new(id, version, utc(1_600_000_000 + id * 100 + i64::from(version)), 1000 + id)
}

/// A node version with one `name` tag.
pub fn node_history(id: i64, version: i32, visible: bool) -> EntityHistory<Node> {
    let mut node = Node::new(header(id, version), 51.5 + id as f64 * 1e-4, -0.12);
    node.header.tags.push(Tag::new("name", format!("node {id} v{version}")));
    EntityHistory::new(node, visible)
}

/// A way version over `nodes`.
pub fn way_history(id: i64, version: i32, visible: bool, nodes: &[i64]) -> EntityHistory<Way> {
    let mut way = Way::new(header(id, version));
    way.header.tags.push(Tag::new("highway", "residential"));
    way.nodes = nodes.iter().copied().map(WayNode::new).collect();
    EntityHistory::new(way, visible)
}

/// A relation version over `members`.
pub fn relation_history(
    id: i64,
    version: i32,
    visible: bool,
    members: &[(i64, EntityType, &str)],
) -> EntityHistory<Relation> {
    let mut relation = Relation::new(header(id, version));
    relation.header.tags.push(Tag::new("type", "route"));
    relation.members = members
        .iter()
        .map(|(member_id, member_type, role)| RelationMember::new(*member_id, *member_type, *role))
        .collect();
    EntityHistory::new(relation, visible)
}

/// Counts open streams handed out by a [`MemoryRowSource`].
#[derive(Debug, Clone, Default)]
pub struct StreamTracker {
    open: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    opened: Arc<AtomicUsize>,
}

impl StreamTracker {
    /// Wraps `rows` in a tracked stream.
    pub fn open<T: 'static>(&self, rows: Vec<T>) -> BoxedIterator<T> {
        let open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(open, Ordering::SeqCst);
        self.opened.fetch_add(1, Ordering::SeqCst);
        Box::new(TrackedIterator {
            rows: ReleasableVecIterator::new(rows),
            tracker: self.clone(),
            released: false,
        })
    }

    /// Streams currently open.
    pub fn open_count(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Most streams ever open at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Streams opened in total.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

struct TrackedIterator<T> {
    rows: ReleasableVecIterator<T>,
    tracker: StreamTracker,
    released: bool,
}

impl<T> Iterator for TrackedIterator<T> {
    type Item = StoreResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}

impl<T> Release for TrackedIterator<T> {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.rows.release();
            self.tracker.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl<T> Drop for TrackedIterator<T> {
    fn drop(&mut self) {
        self.release();
    }
}

/// History tables held in memory, each row tagged with the transaction
/// that wrote it.
///
/// Entities are added whole; the source splits them into entity and
/// feature rows sorted the way a database query would return them.
#[derive(Debug, Default)]
pub struct MemoryRowSource {
    snapshot: TransactionSnapshot,
    clock: DateTime<Utc>,
    nodes: Vec<(u64, EntityHistory<Node>)>,
    ways: Vec<(u64, EntityHistory<Way>)>,
    relations: Vec<(u64, EntityHistory<Relation>)>,
    failing_stream: Option<&'static str>,
    tracker: StreamTracker,
}

impl MemoryRowSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the snapshot returned from now on.
    pub fn set_snapshot(&mut self, snapshot: TransactionSnapshot) {
        self.snapshot = snapshot;
    }

    /// Sets the backend clock.
    pub fn set_clock(&mut self, time: DateTime<Utc>) {
        self.clock = time;
    }

    /// Records a node version written by `txn`.
    pub fn add_node(&mut self, txn: u64, history: EntityHistory<Node>) {
        self.nodes.push((txn, history));
    }

    /// Records a way version written by `txn`.
    pub fn add_way(&mut self, txn: u64, history: EntityHistory<Way>) {
        self.ways.push((txn, history));
    }

    /// Records a relation version written by `txn`.
    pub fn add_relation(&mut self, txn: u64, history: EntityHistory<Relation>) {
        self.relations.push((txn, history));
    }

    /// Makes the named stream (`"nodes"`, `"way_nodes"`, ...) fail.
    pub fn fail_stream(&mut self, stream: &'static str) {
        self.failing_stream = Some(stream);
    }

    /// Stream usage counters.
    pub fn tracker(&self) -> &StreamTracker {
        &self.tracker
    }

    fn check(&self, stream: &str) -> ReplicationResult<()> {
        if self.failing_stream == Some(stream) {
            return Err(ReplicationError::source_failed(format!("{stream} query failed")));
        }
        Ok(())
    }

    fn select<E: OsmEntity + Clone>(
        rows: &[(u64, EntityHistory<E>)],
        predicates: &QueryPredicates,
    ) -> Vec<EntityHistory<E>> {
        let mut selected: Vec<EntityHistory<E>> = rows
            .iter()
            .filter(|(txn, _)| predicates.contains(*txn))
            .map(|(_, history)| history.clone())
            .collect();
        selected.sort_by_key(|history| (history.id(), history.version()));
        selected
    }

    fn entity_rows<E: OsmEntity + Clone>(
        rows: &[(u64, EntityHistory<E>)],
        predicates: &QueryPredicates,
        strip: fn(&mut E),
    ) -> Vec<EntityHistory<E>> {
        let mut selected = Self::select(rows, predicates);
        for history in &mut selected {
            history.entity.header_mut().tags.clear();
            strip(&mut history.entity);
        }
        selected
    }

    fn feature_rows<E: OsmEntity + Clone, F: Clone>(
        rows: &[(u64, EntityHistory<E>)],
        predicates: &QueryPredicates,
        features: fn(&E) -> &[F],
    ) -> Vec<FeatureRow<F>> {
        Self::select(rows, predicates)
            .iter()
            .flat_map(|history| {
                let (id, version) = (history.id(), history.version());
                features(&history.entity)
                    .iter()
                    .enumerate()
                    .map(move |(sequence, feature)| FeatureRow::new(id, version, sequence as i32, feature.clone()))
            })
            .collect()
    }
}

impl HistoryRowSource for MemoryRowSource {
    fn transaction_snapshot(&mut self) -> ReplicationResult<TransactionSnapshot> {
        self.check("snapshot")?;
        Ok(self.snapshot.clone())
    }

    fn system_time(&mut self) -> ReplicationResult<DateTime<Utc>> {
        Ok(self.clock)
    }

    fn nodes(&mut self, predicates: &QueryPredicates) -> ReplicationResult<BoxedIterator<EntityHistory<Node>>> {
        self.check("nodes")?;
        Ok(self.tracker.open(Self::entity_rows(&self.nodes, predicates, |_| {})))
    }

    fn ways(&mut self, predicates: &QueryPredicates) -> ReplicationResult<BoxedIterator<EntityHistory<Way>>> {
        self.check("ways")?;
        let rows = Self::entity_rows(&self.ways, predicates, |way| way.nodes.clear());
        Ok(self.tracker.open(rows))
    }

    fn relations(
        &mut self,
        predicates: &QueryPredicates,
    ) -> ReplicationResult<BoxedIterator<EntityHistory<Relation>>> {
        self.check("relations")?;
        let rows = Self::entity_rows(&self.relations, predicates, |relation| relation.members.clear());
        Ok(self.tracker.open(rows))
    }

    fn tags(
        &mut self,
        entity_type: EntityType,
        predicates: &QueryPredicates,
    ) -> ReplicationResult<BoxedIterator<FeatureRow<Tag>>> {
        self.check("tags")?;
        let rows = match entity_type {
            EntityType::Node => Self::feature_rows(&self.nodes, predicates, |node| node.header.tags.as_slice()),
            EntityType::Way => Self::feature_rows(&self.ways, predicates, |way| way.header.tags.as_slice()),
            EntityType::Relation => {
                Self::feature_rows(&self.relations, predicates, |relation| relation.header.tags.as_slice())
            }
        };
        Ok(self.tracker.open(rows))
    }

    fn way_nodes(&mut self, predicates: &QueryPredicates) -> ReplicationResult<BoxedIterator<FeatureRow<WayNode>>> {
        self.check("way_nodes")?;
        let rows = Self::feature_rows(&self.ways, predicates, |way| way.nodes.as_slice());
        Ok(self.tracker.open(rows))
    }

    fn relation_members(
        &mut self,
        predicates: &QueryPredicates,
    ) -> ReplicationResult<BoxedIterator<FeatureRow<RelationMember>>> {
        self.check("relation_members")?;
        let rows = Self::feature_rows(&self.relations, predicates, |relation| relation.members.as_slice());
        Ok(self.tracker.open(rows))
    }
}

/// A [`ReplicationSource`] replaying scripted snapshots and changes.
///
/// Each snapshot request takes the next scripted snapshot; the last one
/// is repeated once the script runs out. The clock advances by a fixed
/// tick on every read.
#[derive(Debug)]
pub struct ScriptedSnapshotSource {
    snapshots: VecDeque<TransactionSnapshot>,
    clock: DateTime<Utc>,
    tick: Duration,
    changes: BTreeMap<u64, Vec<ChangeContainer>>,
    queries: Vec<QueryPredicates>,
}

impl ScriptedSnapshotSource {
    /// Creates a source serving `snapshots` in order.
    pub fn new(snapshots: Vec<TransactionSnapshot>) -> Self {
        Self {
            snapshots: snapshots.into(),
            clock: utc(1_700_000_000),
            tick: Duration::seconds(60),
            changes: BTreeMap::new(),
            queries: Vec::new(),
        }
    }

    /// Sets how far the clock moves per read.
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Records a change written by `txn`.
    pub fn add_change(&mut self, txn: u64, change: ChangeContainer) {
        self.changes.entry(txn).or_default().push(change);
    }

    /// Every predicate set queried so far.
    pub fn queries(&self) -> &[QueryPredicates] {
        &self.queries
    }
}

impl ReplicationSource for ScriptedSnapshotSource {
    fn snapshot(&mut self) -> ReplicationResult<TransactionSnapshot> {
        if self.snapshots.len() > 1 {
            if let Some(snapshot) = self.snapshots.pop_front() {
                return Ok(snapshot);
            }
        }
        self.snapshots
            .front()
            .cloned()
            .ok_or_else(|| ReplicationError::source_failed("no snapshot scripted"))
    }

    fn system_time(&mut self) -> ReplicationResult<DateTime<Utc>> {
        self.clock += self.tick;
        Ok(self.clock)
    }

    fn changes(
        &mut self,
        predicates: &QueryPredicates,
        _full_history: bool,
    ) -> ReplicationResult<BoxedIterator<ChangeContainer>> {
        self.queries.push(predicates.clone());
        let mut selected: Vec<ChangeContainer> = self
            .changes
            .iter()
            .filter(|(txn, _)| predicates.contains(**txn))
            .flat_map(|(_, changes)| changes.iter().cloned())
            .collect();
        selected.sort_by_key(|change| (change.entity.entity_type(), change.entity.id(), change.entity.version()));
        Ok(Box::new(ReleasableVecIterator::new(selected)))
    }
}

#[derive(Debug, Default)]
struct SinkLog {
    pending: Vec<ChangeContainer>,
    batches: Vec<(u64, Vec<ChangeContainer>)>,
    released: bool,
}

/// Collects changes per completed batch. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemoryChangeSink {
    log: Arc<Mutex<SinkLog>>,
}

impl MemoryChangeSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed batches with their sequence numbers.
    pub fn batches(&self) -> Vec<(u64, Vec<ChangeContainer>)> {
        self.log.lock().batches.clone()
    }

    /// Every change of every completed batch.
    pub fn changes(&self) -> Vec<ChangeContainer> {
        self.log
            .lock()
            .batches
            .iter()
            .flat_map(|(_, changes)| changes.iter().cloned())
            .collect()
    }

    /// Changes received since the last completed batch.
    pub fn pending(&self) -> Vec<ChangeContainer> {
        self.log.lock().pending.clone()
    }

    /// Whether the sink was released.
    pub fn is_released(&self) -> bool {
        self.log.lock().released
    }
}

impl Release for MemoryChangeSink {
    fn release(&mut self) {
        let mut log = self.log.lock();
        log.pending.clear();
        log.released = true;
    }
}

impl ChangeSink for MemoryChangeSink {
    fn process(&mut self, change: ChangeContainer) -> ReplicationResult<()> {
        self.log.lock().pending.push(change);
        Ok(())
    }

    fn complete(&mut self, state: &ReplicationState) -> ReplicationResult<()> {
        let mut log = self.log.lock();
        let batch = std::mem::take(&mut log.pending);
        log.batches.push((state.sequence_number, batch));
        Ok(())
    }
}

/// Where a [`FailingChangeSink`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    /// When the change with this zero-based index arrives.
    Process(usize),
    /// When the batch is completed, after every change was accepted.
    Complete,
}

/// A sink that fails at a chosen point, keeping what it saw before.
#[derive(Debug)]
pub struct FailingChangeSink {
    fail_point: FailPoint,
    seen: Vec<ChangeContainer>,
}

impl FailingChangeSink {
    /// Creates a sink failing at `fail_point`.
    pub fn new(fail_point: FailPoint) -> Self {
        Self {
            fail_point,
            seen: Vec::new(),
        }
    }

    /// Changes accepted before the failure.
    pub fn seen(&self) -> &[ChangeContainer] {
        &self.seen
    }
}

impl Release for FailingChangeSink {
    fn release(&mut self) {}
}

impl ChangeSink for FailingChangeSink {
    fn process(&mut self, change: ChangeContainer) -> ReplicationResult<()> {
        if self.fail_point == FailPoint::Process(self.seen.len()) {
            return Err(ReplicationError::destination_failed(format!(
                "injected failure at change {}",
                self.seen.len()
            )));
        }
        self.seen.push(change);
        Ok(())
    }

    fn complete(&mut self, _state: &ReplicationState) -> ReplicationResult<()> {
        if self.fail_point == FailPoint::Complete {
            return Err(ReplicationError::destination_failed("injected failure at completion"));
        }
        Ok(())
    }
}
