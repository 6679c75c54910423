//! Versioned history rows.

use super::entity::{Entity, OsmEntity};
use osmsync_codec::{ClassRegistry, CodecResult, RecordReader, RecordWriter, Storeable};
use std::io::{BufRead, Write};

/// One version of an entity as recorded in a full-history table.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityHistory<E> {
    /// The entity as of this version.
    pub entity: E,
    /// False if this version deleted the entity.
    pub visible: bool,
}

impl<E> EntityHistory<E> {
    /// Creates a history row.
    pub fn new(entity: E, visible: bool) -> Self {
        Self { entity, visible }
    }
}

impl<E: OsmEntity> EntityHistory<E> {
    /// Entity id.
    pub fn id(&self) -> i64 {
        self.entity.header().id
    }

    /// Entity version.
    pub fn version(&self) -> i32 {
        self.entity.header().version
    }

    /// Converts into a history row of the [`Entity`] union.
    pub fn into_entity(self) -> EntityHistory<Entity> {
        EntityHistory {
            entity: self.entity.into(),
            visible: self.visible,
        }
    }
}

impl<E: Storeable> Storeable for EntityHistory<E> {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, registry: &mut ClassRegistry) -> CodecResult<()> {
        self.entity.store(writer, registry)?;
        writer.write_bool(self.visible)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, registry: &ClassRegistry) -> CodecResult<Self> {
        Ok(Self {
            entity: E::load(reader, registry)?,
            visible: reader.read_bool()?,
        })
    }
}

/// A child row (tag, way node, relation member) keyed to its owner.
///
/// Rows of one feature stream are ordered by
/// `(entity_id, entity_version, sequence)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow<F> {
    /// Owning entity id.
    pub entity_id: i64,
    /// Owning entity version.
    pub entity_version: i32,
    /// Position within the owner, for ordered features.
    pub sequence: i32,
    /// The feature.
    pub feature: F,
}

impl<F> FeatureRow<F> {
    /// Creates a feature row.
    pub fn new(entity_id: i64, entity_version: i32, sequence: i32, feature: F) -> Self {
        Self {
            entity_id,
            entity_version,
            sequence,
            feature,
        }
    }
}

impl<F: Storeable> Storeable for FeatureRow<F> {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, registry: &mut ClassRegistry) -> CodecResult<()> {
        writer.write_i64(self.entity_id)?;
        writer.write_i32(self.entity_version)?;
        writer.write_i32(self.sequence)?;
        self.feature.store(writer, registry)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, registry: &ClassRegistry) -> CodecResult<Self> {
        Ok(Self {
            entity_id: reader.read_i64()?,
            entity_version: reader.read_i32()?,
            sequence: reader.read_i32()?,
            feature: F::load(reader, registry)?,
        })
    }
}
