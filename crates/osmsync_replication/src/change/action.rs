//! Change classification.

use crate::model::Entity;
use osmsync_codec::{ClassRegistry, CodecError, CodecResult, RecordReader, RecordWriter, Storeable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{BufRead, Write};

/// What a change did to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    /// The entity did not exist before the window.
    Create,
    /// The entity existed before and still exists.
    Modify,
    /// The entity existed before and was deleted.
    Delete,
}

impl ChangeAction {
    /// Classifies a change from the entity's final visibility and whether
    /// it existed before the window.
    ///
    /// Returns `None` for an entity created and deleted within the window.
    pub fn derive(visible: bool, created_previously: bool) -> Option<Self> {
        match (visible, created_previously) {
            (true, true) => Some(ChangeAction::Modify),
            (true, false) => Some(ChangeAction::Create),
            (false, true) => Some(ChangeAction::Delete),
            (false, false) => None,
        }
    }

    /// Lowercase name of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeAction::Create => "create",
            ChangeAction::Modify => "modify",
            ChangeAction::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Storeable for ChangeAction {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, _: &mut ClassRegistry) -> CodecResult<()> {
        let byte = match self {
            ChangeAction::Create => 0,
            ChangeAction::Modify => 1,
            ChangeAction::Delete => 2,
        };
        writer.write_u8(byte)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, _: &ClassRegistry) -> CodecResult<Self> {
        match reader.read_u8()? {
            0 => Ok(ChangeAction::Create),
            1 => Ok(ChangeAction::Modify),
            2 => Ok(ChangeAction::Delete),
            other => Err(CodecError::unknown_variant(other.to_string(), "ChangeAction")),
        }
    }
}

/// An entity paired with the change applied to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeContainer {
    /// The entity as of the change.
    pub entity: Entity,
    /// The change.
    pub action: ChangeAction,
}

impl ChangeContainer {
    /// Creates a change.
    pub fn new(entity: Entity, action: ChangeAction) -> Self {
        Self { entity, action }
    }
}

impl Storeable for ChangeContainer {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, registry: &mut ClassRegistry) -> CodecResult<()> {
        self.entity.store(writer, registry)?;
        self.action.store(writer, registry)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, registry: &ClassRegistry) -> CodecResult<Self> {
        Ok(Self {
            entity: Entity::load(reader, registry)?,
            action: ChangeAction::load(reader, registry)?,
        })
    }
}
