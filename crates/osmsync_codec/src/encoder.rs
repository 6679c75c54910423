//! Record writer.

use crate::error::CodecResult;
use std::io::Write;

/// Writes record fields as a flat sequence of little-endian primitives.
///
/// Fields carry no tags and records carry no length prefix: a reader must
/// request exactly the same primitives in exactly the same order. Strings
/// are the one self-sized field (a `u32` byte count followed by UTF-8).
///
/// The writer takes `W` by value, so a short-lived writer over `&mut W`
/// works as well as one that owns its sink.
pub struct RecordWriter<W: Write> {
    inner: W,
}

impl<W: Write> RecordWriter<W> {
    /// Create a new writer over `inner`.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write a boolean as a single byte.
    pub fn write_bool(&mut self, value: bool) -> CodecResult<()> {
        self.write_u8(u8::from(value))
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8) -> CodecResult<()> {
        self.put(&[value])
    }

    /// Write a 32-bit signed integer.
    pub fn write_i32(&mut self, value: i32) -> CodecResult<()> {
        self.put(&value.to_le_bytes())
    }

    /// Write a 64-bit signed integer.
    pub fn write_i64(&mut self, value: i64) -> CodecResult<()> {
        self.put(&value.to_le_bytes())
    }

    /// Write a 64-bit float.
    pub fn write_f64(&mut self, value: f64) -> CodecResult<()> {
        self.put(&value.to_le_bytes())
    }

    /// Write a UTF-8 string prefixed with its byte length.
    #[allow(clippy::cast_possible_truncation)]
    pub fn write_str(&mut self, value: &str) -> CodecResult<()> {
        let len = value.len();
        if len as u64 > crate::decoder::MAX_STRING_LENGTH {
            return Err(crate::CodecError::StringTooLong {
                len: len as u64,
                limit: crate::decoder::MAX_STRING_LENGTH,
            });
        }
        self.put(&(len as u32).to_le_bytes())?;
        self.put(value.as_bytes())
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> CodecResult<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Get a mutable reference to the underlying sink.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consume the writer and return the underlying sink.
    pub fn into_inner(self) -> W {
        self.inner
    }

    #[inline]
    fn put(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_little_endian() {
        let mut writer = RecordWriter::new(Vec::new());
        writer.write_i32(1).unwrap();
        writer.write_bool(true).unwrap();
        writer.write_u8(0xab).unwrap();
        assert_eq!(writer.into_inner(), vec![1, 0, 0, 0, 1, 0xab]);
    }

    #[test]
    fn string_has_length_prefix() {
        let mut writer = RecordWriter::new(Vec::new());
        writer.write_str("hé").unwrap();
        assert_eq!(writer.into_inner(), vec![3, 0, 0, 0, b'h', 0xc3, 0xa9]);
    }

    #[test]
    fn writes_through_borrowed_sink() {
        let mut sink = Vec::new();
        {
            let mut writer = RecordWriter::new(&mut sink);
            writer.write_i64(-1).unwrap();
        }
        assert_eq!(sink, vec![0xff; 8]);
    }
}
