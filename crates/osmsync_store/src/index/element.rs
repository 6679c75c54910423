//! Fixed-width index elements.

use osmsync_codec::{ClassRegistry, CodecResult, RecordReader, RecordWriter, Storeable};
use std::fmt;
use std::io::{BufRead, Write};

/// An element of an [`crate::IndexStore`].
///
/// Every element of one index must encode to the same number of bytes;
/// the index derives positions from that width.
pub trait IndexElement: Storeable {
    /// The ordered lookup key.
    type Key: Ord + Copy + fmt::Debug;

    /// Returns this element's key.
    fn key(&self) -> Self::Key;
}

/// An index element mapping an `i64` key to an `i64` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongLongIndexElement {
    /// Lookup key.
    pub key: i64,
    /// Associated value.
    pub value: i64,
}

impl LongLongIndexElement {
    /// Creates a new element.
    pub fn new(key: i64, value: i64) -> Self {
        Self { key, value }
    }
}

impl Storeable for LongLongIndexElement {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, _: &mut ClassRegistry) -> CodecResult<()> {
        writer.write_i64(self.key)?;
        writer.write_i64(self.value)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, _: &ClassRegistry) -> CodecResult<Self> {
        Ok(Self {
            key: reader.read_i64()?,
            value: reader.read_i64()?,
        })
    }
}

impl IndexElement for LongLongIndexElement {
    type Key = i64;

    fn key(&self) -> i64 {
        self.key
    }
}

/// An index element mapping an `i32` key to an `i64` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerLongIndexElement {
    /// Lookup key.
    pub key: i32,
    /// Associated value.
    pub value: i64,
}

impl IntegerLongIndexElement {
    /// Creates a new element.
    pub fn new(key: i32, value: i64) -> Self {
        Self { key, value }
    }
}

impl Storeable for IntegerLongIndexElement {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, _: &mut ClassRegistry) -> CodecResult<()> {
        writer.write_i32(self.key)?;
        writer.write_i64(self.value)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, _: &ClassRegistry) -> CodecResult<Self> {
        Ok(Self {
            key: reader.read_i32()?,
            value: reader.read_i64()?,
        })
    }
}

impl IndexElement for IntegerLongIndexElement {
    type Key = i32;

    fn key(&self) -> i32 {
        self.key
    }
}
