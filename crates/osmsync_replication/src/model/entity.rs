//! Map entities: nodes, ways and relations.

use chrono::{DateTime, Utc};
use osmsync_codec::{ClassRegistry, CodecError, CodecResult, RecordReader, RecordWriter, Storeable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{BufRead, Write};

/// The three kinds of map entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// A point.
    Node,
    /// An ordered list of nodes.
    Way,
    /// A group of typed, roled members.
    Relation,
}

impl EntityType {
    /// Lowercase name of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Node => "node",
            EntityType::Way => "way",
            EntityType::Relation => "relation",
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            EntityType::Node => 0,
            EntityType::Way => 1,
            EntityType::Relation => 2,
        }
    }

    fn from_byte(byte: u8) -> CodecResult<Self> {
        match byte {
            0 => Ok(EntityType::Node),
            1 => Ok(EntityType::Way),
            2 => Ok(EntityType::Relation),
            other => Err(CodecError::unknown_variant(other.to_string(), "EntityType")),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Storeable for EntityType {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, _: &mut ClassRegistry) -> CodecResult<()> {
        writer.write_u8(self.to_byte())
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, _: &ClassRegistry) -> CodecResult<Self> {
        Self::from_byte(reader.read_u8()?)
    }
}

/// A key/value tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl Tag {
    /// Creates a tag.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Storeable for Tag {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, _: &mut ClassRegistry) -> CodecResult<()> {
        writer.write_str(&self.key)?;
        writer.write_str(&self.value)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, _: &ClassRegistry) -> CodecResult<Self> {
        Ok(Self {
            key: reader.read_string()?,
            value: reader.read_string()?,
        })
    }
}

/// A reference from a way to one of its nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WayNode {
    /// Referenced node id.
    pub node_id: i64,
}

impl WayNode {
    /// Creates a way node reference.
    pub fn new(node_id: i64) -> Self {
        Self { node_id }
    }
}

impl Storeable for WayNode {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, _: &mut ClassRegistry) -> CodecResult<()> {
        writer.write_i64(self.node_id)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, _: &ClassRegistry) -> CodecResult<Self> {
        Ok(Self {
            node_id: reader.read_i64()?,
        })
    }
}

/// A member of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationMember {
    /// Referenced entity id.
    pub member_id: i64,
    /// Referenced entity type.
    pub member_type: EntityType,
    /// Role of the member within the relation.
    pub role: String,
}

impl RelationMember {
    /// Creates a relation member.
    pub fn new(member_id: i64, member_type: EntityType, role: impl Into<String>) -> Self {
        Self {
            member_id,
            member_type,
            role: role.into(),
        }
    }
}

impl Storeable for RelationMember {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, registry: &mut ClassRegistry) -> CodecResult<()> {
        writer.write_i64(self.member_id)?;
        self.member_type.store(writer, registry)?;
        writer.write_str(&self.role)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, registry: &ClassRegistry) -> CodecResult<Self> {
        Ok(Self {
            member_id: reader.read_i64()?,
            member_type: EntityType::load(reader, registry)?,
            role: reader.read_string()?,
        })
    }
}

/// Fields shared by every entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityHeader {
    /// Entity id, unique within its type.
    pub id: i64,
    /// Version, starting at 1.
    pub version: i32,
    /// Time the version was created.
    pub timestamp: DateTime<Utc>,
    /// Changeset that created the version.
    pub changeset_id: i64,
    /// Tags, attached by the assembler.
    pub tags: Vec<Tag>,
}

impl EntityHeader {
    /// Creates a header with no tags.
    pub fn new(id: i64, version: i32, timestamp: DateTime<Utc>, changeset_id: i64) -> Self {
        Self {
            id,
            version,
            timestamp,
            changeset_id,
            tags: Vec::new(),
        }
    }
}

impl Storeable for EntityHeader {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, registry: &mut ClassRegistry) -> CodecResult<()> {
        writer.write_i64(self.id)?;
        writer.write_i32(self.version)?;
        write_timestamp(writer, &self.timestamp)?;
        writer.write_i64(self.changeset_id)?;
        self.tags.store(writer, registry)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, registry: &ClassRegistry) -> CodecResult<Self> {
        Ok(Self {
            id: reader.read_i64()?,
            version: reader.read_i32()?,
            timestamp: read_timestamp(reader)?,
            changeset_id: reader.read_i64()?,
            tags: Vec::load(reader, registry)?,
        })
    }
}

fn write_timestamp<W: Write>(writer: &mut RecordWriter<W>, timestamp: &DateTime<Utc>) -> CodecResult<()> {
    writer.write_i64(timestamp.timestamp_millis())
}

fn read_timestamp<R: BufRead>(reader: &mut RecordReader<R>) -> CodecResult<DateTime<Utc>> {
    let millis = reader.read_i64()?;
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| CodecError::decoding_failed(format!("timestamp out of range: {millis}")))
}

/// Access to the common fields of a concrete entity type.
pub trait OsmEntity: Storeable + Into<Entity> {
    /// The entity's type.
    const ENTITY_TYPE: EntityType;

    /// Shared fields.
    fn header(&self) -> &EntityHeader;

    /// Shared fields, mutably.
    fn header_mut(&mut self) -> &mut EntityHeader;
}

/// A point with coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Shared fields.
    pub header: EntityHeader,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Node {
    /// Creates a node.
    pub fn new(header: EntityHeader, latitude: f64, longitude: f64) -> Self {
        Self {
            header,
            latitude,
            longitude,
        }
    }
}

impl Storeable for Node {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, registry: &mut ClassRegistry) -> CodecResult<()> {
        self.header.store(writer, registry)?;
        writer.write_f64(self.latitude)?;
        writer.write_f64(self.longitude)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, registry: &ClassRegistry) -> CodecResult<Self> {
        Ok(Self {
            header: EntityHeader::load(reader, registry)?,
            latitude: reader.read_f64()?,
            longitude: reader.read_f64()?,
        })
    }
}

impl OsmEntity for Node {
    const ENTITY_TYPE: EntityType = EntityType::Node;

    fn header(&self) -> &EntityHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut EntityHeader {
        &mut self.header
    }
}

/// An ordered list of node references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Way {
    /// Shared fields.
    pub header: EntityHeader,
    /// Node references, attached by the assembler.
    pub nodes: Vec<WayNode>,
}

impl Way {
    /// Creates a way with no nodes.
    pub fn new(header: EntityHeader) -> Self {
        Self {
            header,
            nodes: Vec::new(),
        }
    }
}

impl Storeable for Way {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, registry: &mut ClassRegistry) -> CodecResult<()> {
        self.header.store(writer, registry)?;
        self.nodes.store(writer, registry)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, registry: &ClassRegistry) -> CodecResult<Self> {
        Ok(Self {
            header: EntityHeader::load(reader, registry)?,
            nodes: Vec::load(reader, registry)?,
        })
    }
}

impl OsmEntity for Way {
    const ENTITY_TYPE: EntityType = EntityType::Way;

    fn header(&self) -> &EntityHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut EntityHeader {
        &mut self.header
    }
}

/// A group of members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Shared fields.
    pub header: EntityHeader,
    /// Members, attached by the assembler.
    pub members: Vec<RelationMember>,
}

impl Relation {
    /// Creates a relation with no members.
    pub fn new(header: EntityHeader) -> Self {
        Self {
            header,
            members: Vec::new(),
        }
    }
}

impl Storeable for Relation {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, registry: &mut ClassRegistry) -> CodecResult<()> {
        self.header.store(writer, registry)?;
        self.members.store(writer, registry)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, registry: &ClassRegistry) -> CodecResult<Self> {
        Ok(Self {
            header: EntityHeader::load(reader, registry)?,
            members: Vec::load(reader, registry)?,
        })
    }
}

impl OsmEntity for Relation {
    const ENTITY_TYPE: EntityType = EntityType::Relation;

    fn header(&self) -> &EntityHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut EntityHeader {
        &mut self.header
    }
}

/// Any entity.
///
/// Stored with a class tag so nodes, ways and relations can share one
/// stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entity {
    /// A node.
    Node(Node),
    /// A way.
    Way(Way),
    /// A relation.
    Relation(Relation),
}

impl Entity {
    /// The entity's type.
    pub fn entity_type(&self) -> EntityType {
        match self {
            Entity::Node(_) => EntityType::Node,
            Entity::Way(_) => EntityType::Way,
            Entity::Relation(_) => EntityType::Relation,
        }
    }

    /// Shared fields.
    pub fn header(&self) -> &EntityHeader {
        match self {
            Entity::Node(node) => &node.header,
            Entity::Way(way) => &way.header,
            Entity::Relation(relation) => &relation.header,
        }
    }

    /// Entity id.
    pub fn id(&self) -> i64 {
        self.header().id
    }

    /// Entity version.
    pub fn version(&self) -> i32 {
        self.header().version
    }

    /// Version timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.header().timestamp
    }
}

impl From<Node> for Entity {
    fn from(node: Node) -> Self {
        Entity::Node(node)
    }
}

impl From<Way> for Entity {
    fn from(way: Way) -> Self {
        Entity::Way(way)
    }
}

impl From<Relation> for Entity {
    fn from(relation: Relation) -> Self {
        Entity::Relation(relation)
    }
}

impl Storeable for Entity {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, registry: &mut ClassRegistry) -> CodecResult<()> {
        match self {
            Entity::Node(node) => {
                registry.write_class(writer, "node")?;
                node.store(writer, registry)
            }
            Entity::Way(way) => {
                registry.write_class(writer, "way")?;
                way.store(writer, registry)
            }
            Entity::Relation(relation) => {
                registry.write_class(writer, "relation")?;
                relation.store(writer, registry)
            }
        }
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, registry: &ClassRegistry) -> CodecResult<Self> {
        match registry.read_class(reader)? {
            "node" => Ok(Entity::Node(Node::load(reader, registry)?)),
            "way" => Ok(Entity::Way(Way::load(reader, registry)?)),
            "relation" => Ok(Entity::Relation(Relation::load(reader, registry)?)),
            other => Err(CodecError::unknown_variant(other, "Entity")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn header(id: i64) -> EntityHeader {
        let mut header = EntityHeader::new(id, 2, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(), 77);
        header.tags.push(Tag::new("highway", "residential"));
        header
    }

    fn roundtrip<T: Storeable>(values: &[T]) -> Vec<T> {
        let mut registry = ClassRegistry::new();
        let mut writer = RecordWriter::new(Vec::new());
        for value in values {
            value.store(&mut writer, &mut registry).unwrap();
        }
        let bytes = writer.into_inner();
        let mut reader = RecordReader::new(bytes.as_slice());
        let mut out = Vec::new();
        while !reader.is_at_end().unwrap() {
            out.push(T::load(&mut reader, &registry).unwrap());
        }
        out
    }

    #[test]
    fn mixed_entity_stream() {
        let mut way = Way::new(header(2));
        way.nodes = vec![WayNode::new(10), WayNode::new(11)];
        let mut relation = Relation::new(header(3));
        relation.members = vec![
            RelationMember::new(2, EntityType::Way, "outer"),
            RelationMember::new(10, EntityType::Node, ""),
        ];
        let entities: Vec<Entity> = vec![
            Node::new(header(1), 51.5, -0.12).into(),
            way.into(),
            relation.into(),
            Node::new(header(4), -33.9, 151.2).into(),
        ];

        assert_eq!(roundtrip(&entities), entities);
    }

    #[test]
    fn entity_accessors() {
        let entity: Entity = Node::new(header(9), 0.0, 0.0).into();
        assert_eq!(entity.entity_type(), EntityType::Node);
        assert_eq!(entity.id(), 9);
        assert_eq!(entity.version(), 2);
        assert_eq!(entity.header().tags.len(), 1);
    }

    #[test]
    fn unknown_entity_type_byte_rejected() {
        let bytes = [7u8];
        let mut reader = RecordReader::new(&bytes[..]);
        assert!(EntityType::load(&mut reader, &ClassRegistry::new()).is_err());
    }

    #[test]
    fn entity_type_names() {
        assert_eq!(EntityType::Relation.to_string(), "relation");
        assert!(EntityType::Node < EntityType::Way);
    }
}
