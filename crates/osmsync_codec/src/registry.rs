//! Per-stream class registry for heterogeneous record streams.

use crate::decoder::RecordReader;
use crate::encoder::RecordWriter;
use crate::error::{CodecError, CodecResult};
use std::io::{BufRead, Write};

/// Maximum number of distinct classes a single stream can hold.
pub const MAX_CLASS_COUNT: usize = 127;

/// Maps record classes to one-byte tags within a single stream.
///
/// A tag is assigned the first time a class is written and is only
/// meaningful to readers of the same stream; nothing is persisted across
/// stores. The registry lives in memory alongside the store, so a reader
/// must be handed the registry the writer filled.
///
/// Closed enums use it like this:
///
/// ```
/// use osmsync_codec::{ClassRegistry, CodecError, CodecResult, RecordReader, RecordWriter, Storeable};
/// use std::io::{BufRead, Write};
///
/// #[derive(Debug, PartialEq)]
/// enum Shape {
///     Point(i64),
///     Label(String),
/// }
///
/// impl Storeable for Shape {
///     fn store<W: Write>(&self, w: &mut RecordWriter<W>, reg: &mut ClassRegistry) -> CodecResult<()> {
///         match self {
///             Shape::Point(v) => { reg.write_class(w, "point")?; w.write_i64(*v) }
///             Shape::Label(s) => { reg.write_class(w, "label")?; w.write_str(s) }
///         }
///     }
///
///     fn load<R: BufRead>(r: &mut RecordReader<R>, reg: &ClassRegistry) -> CodecResult<Self> {
///         match reg.read_class(r)? {
///             "point" => Ok(Shape::Point(r.read_i64()?)),
///             "label" => Ok(Shape::Label(r.read_string()?)),
///             other => Err(CodecError::unknown_variant(other, "Shape")),
///         }
///     }
/// }
///
/// let mut registry = ClassRegistry::new();
/// let mut writer = RecordWriter::new(Vec::new());
/// Shape::Label("x".into()).store(&mut writer, &mut registry).unwrap();
/// Shape::Point(3).store(&mut writer, &mut registry).unwrap();
/// let bytes = writer.into_inner();
///
/// let mut reader = RecordReader::new(bytes.as_slice());
/// assert_eq!(Shape::load(&mut reader, &registry).unwrap(), Shape::Label("x".into()));
/// assert_eq!(Shape::load(&mut reader, &registry).unwrap(), Shape::Point(3));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: Vec<&'static str>,
}

impl ClassRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the tag for `name`, assigning the next free tag on first sight.
    #[allow(clippy::cast_possible_truncation)]
    pub fn tag_for(&mut self, name: &'static str) -> CodecResult<u8> {
        if let Some(index) = self.classes.iter().position(|c| *c == name) {
            return Ok(index as u8);
        }
        if self.classes.len() >= MAX_CLASS_COUNT {
            return Err(CodecError::ClassLimitExceeded {
                limit: MAX_CLASS_COUNT,
            });
        }
        self.classes.push(name);
        Ok((self.classes.len() - 1) as u8)
    }

    /// Returns the class name registered under `tag`.
    pub fn name_for(&self, tag: u8) -> CodecResult<&'static str> {
        self.classes
            .get(usize::from(tag))
            .copied()
            .ok_or(CodecError::UnknownClassTag { tag })
    }

    /// Writes the tag for `name`, registering it if needed.
    pub fn write_class<W: Write>(
        &mut self,
        writer: &mut RecordWriter<W>,
        name: &'static str,
    ) -> CodecResult<()> {
        let tag = self.tag_for(name)?;
        writer.write_u8(tag)
    }

    /// Reads a tag and resolves it to its class name.
    pub fn read_class<R: BufRead>(&self, reader: &mut RecordReader<R>) -> CodecResult<&'static str> {
        let tag = reader.read_u8()?;
        self.name_for(tag)
    }

    /// Number of classes registered so far.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns true if no class has been registered.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: [&str; 128] = [
        "c0", "c1", "c2", "c3", "c4", "c5", "c6", "c7", "c8", "c9", "c10", "c11", "c12", "c13",
        "c14", "c15", "c16", "c17", "c18", "c19", "c20", "c21", "c22", "c23", "c24", "c25", "c26",
        "c27", "c28", "c29", "c30", "c31", "c32", "c33", "c34", "c35", "c36", "c37", "c38", "c39",
        "c40", "c41", "c42", "c43", "c44", "c45", "c46", "c47", "c48", "c49", "c50", "c51", "c52",
        "c53", "c54", "c55", "c56", "c57", "c58", "c59", "c60", "c61", "c62", "c63", "c64", "c65",
        "c66", "c67", "c68", "c69", "c70", "c71", "c72", "c73", "c74", "c75", "c76", "c77", "c78",
        "c79", "c80", "c81", "c82", "c83", "c84", "c85", "c86", "c87", "c88", "c89", "c90", "c91",
        "c92", "c93", "c94", "c95", "c96", "c97", "c98", "c99", "c100", "c101", "c102", "c103",
        "c104", "c105", "c106", "c107", "c108", "c109", "c110", "c111", "c112", "c113", "c114",
        "c115", "c116", "c117", "c118", "c119", "c120", "c121", "c122", "c123", "c124", "c125",
        "c126", "c127",
    ];

    #[test]
    fn tags_assigned_on_first_sight() {
        let mut registry = ClassRegistry::new();
        assert_eq!(registry.tag_for("way").unwrap(), 0);
        assert_eq!(registry.tag_for("node").unwrap(), 1);
        assert_eq!(registry.tag_for("way").unwrap(), 0);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.name_for(1).unwrap(), "node");
    }

    #[test]
    fn unknown_tag_rejected() {
        let registry = ClassRegistry::new();
        assert!(matches!(
            registry.name_for(4),
            Err(CodecError::UnknownClassTag { tag: 4 })
        ));
    }

    #[test]
    fn limit_is_127_classes() {
        let mut registry = ClassRegistry::new();
        for name in NAMES.iter().take(MAX_CLASS_COUNT) {
            registry.tag_for(*name).unwrap();
        }
        assert!(matches!(
            registry.tag_for(NAMES[127]),
            Err(CodecError::ClassLimitExceeded { limit: 127 })
        ));
        // Already-registered classes still resolve.
        assert_eq!(registry.tag_for(NAMES[126]).unwrap(), 126);
    }
}
