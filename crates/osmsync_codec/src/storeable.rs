//! The `Storeable` trait and implementations for common field types.

use crate::decoder::RecordReader;
use crate::encoder::RecordWriter;
use crate::error::{CodecError, CodecResult};
use crate::registry::ClassRegistry;
use std::io::{BufRead, Write};

/// A value that can be written to and read back from a record stream.
///
/// `store` and `load` must visit fields in the same order. Nested owned
/// sub-records are written inline by calling their own `store`, and the
/// registry is threaded through so heterogeneous children resolve their
/// tags against the same stream.
pub trait Storeable: Sized {
    /// Writes this value's fields.
    fn store<W: Write>(
        &self,
        writer: &mut RecordWriter<W>,
        registry: &mut ClassRegistry,
    ) -> CodecResult<()>;

    /// Reads a value written by [`Storeable::store`].
    fn load<R: BufRead>(reader: &mut RecordReader<R>, registry: &ClassRegistry)
        -> CodecResult<Self>;
}

impl Storeable for bool {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, _: &mut ClassRegistry) -> CodecResult<()> {
        writer.write_bool(*self)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, _: &ClassRegistry) -> CodecResult<Self> {
        reader.read_bool()
    }
}

impl Storeable for u8 {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, _: &mut ClassRegistry) -> CodecResult<()> {
        writer.write_u8(*self)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, _: &ClassRegistry) -> CodecResult<Self> {
        reader.read_u8()
    }
}

impl Storeable for i32 {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, _: &mut ClassRegistry) -> CodecResult<()> {
        writer.write_i32(*self)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, _: &ClassRegistry) -> CodecResult<Self> {
        reader.read_i32()
    }
}

impl Storeable for i64 {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, _: &mut ClassRegistry) -> CodecResult<()> {
        writer.write_i64(*self)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, _: &ClassRegistry) -> CodecResult<Self> {
        reader.read_i64()
    }
}

impl Storeable for f64 {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, _: &mut ClassRegistry) -> CodecResult<()> {
        writer.write_f64(*self)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, _: &ClassRegistry) -> CodecResult<Self> {
        reader.read_f64()
    }
}

impl Storeable for String {
    fn store<W: Write>(&self, writer: &mut RecordWriter<W>, _: &mut ClassRegistry) -> CodecResult<()> {
        writer.write_str(self)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, _: &ClassRegistry) -> CodecResult<Self> {
        reader.read_string()
    }
}

impl<T: Storeable> Storeable for Option<T> {
    fn store<W: Write>(
        &self,
        writer: &mut RecordWriter<W>,
        registry: &mut ClassRegistry,
    ) -> CodecResult<()> {
        match self {
            Some(value) => {
                writer.write_bool(true)?;
                value.store(writer, registry)
            }
            None => writer.write_bool(false),
        }
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, registry: &ClassRegistry) -> CodecResult<Self> {
        if reader.read_bool()? {
            Ok(Some(T::load(reader, registry)?))
        } else {
            Ok(None)
        }
    }
}

impl<T: Storeable> Storeable for Vec<T> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn store<W: Write>(
        &self,
        writer: &mut RecordWriter<W>,
        registry: &mut ClassRegistry,
    ) -> CodecResult<()> {
        writer.write_i32(self.len() as i32)?;
        for item in self {
            item.store(writer, registry)?;
        }
        Ok(())
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, registry: &ClassRegistry) -> CodecResult<Self> {
        let count = reader.read_i32()?;
        let count = usize::try_from(count)
            .map_err(|_| CodecError::decoding_failed(format!("negative element count {count}")))?;
        // Cap the pre-allocation; a corrupt count still fails on the first short read.
        let mut items = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            items.push(T::load(reader, registry)?);
        }
        Ok(items)
    }
}

impl<A: Storeable, B: Storeable> Storeable for (A, B) {
    fn store<W: Write>(
        &self,
        writer: &mut RecordWriter<W>,
        registry: &mut ClassRegistry,
    ) -> CodecResult<()> {
        self.0.store(writer, registry)?;
        self.1.store(writer, registry)
    }

    fn load<R: BufRead>(reader: &mut RecordReader<R>, registry: &ClassRegistry) -> CodecResult<Self> {
        let a = A::load(reader, registry)?;
        let b = B::load(reader, registry)?;
        Ok((a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encode<T: Storeable>(value: &T, registry: &mut ClassRegistry) -> Vec<u8> {
        let mut writer = RecordWriter::new(Vec::new());
        value.store(&mut writer, registry).unwrap();
        writer.into_inner()
    }

    #[test]
    fn nested_vectors_roundtrip() {
        let value: Vec<(i64, Vec<String>)> = vec![
            (1, vec!["a".into(), "b".into()]),
            (2, Vec::new()),
            (3, vec!["c".into()]),
        ];
        let mut registry = ClassRegistry::new();
        let bytes = encode(&value, &mut registry);

        let mut reader = RecordReader::new(bytes.as_slice());
        let decoded = Vec::<(i64, Vec<String>)>::load(&mut reader, &registry).unwrap();
        assert_eq!(decoded, value);
        assert!(reader.is_at_end().unwrap());
    }

    #[test]
    fn option_roundtrip() {
        let mut registry = ClassRegistry::new();
        for value in [Some(9i32), None] {
            let bytes = encode(&value, &mut registry);
            let mut reader = RecordReader::new(bytes.as_slice());
            assert_eq!(Option::<i32>::load(&mut reader, &registry).unwrap(), value);
        }
    }

    #[test]
    fn negative_count_rejected() {
        let bytes = (-1i32).to_le_bytes();
        let mut reader = RecordReader::new(&bytes[..]);
        let result = Vec::<i64>::load(&mut reader, &ClassRegistry::new());
        assert!(matches!(result, Err(CodecError::DecodingFailed { .. })));
    }

    #[test]
    fn field_order_mismatch_misreads() {
        // No field tags: reading (i32, i64) where (i64, i32) was written yields garbage,
        // not an error, as long as the byte count matches.
        let mut registry = ClassRegistry::new();
        let bytes = encode(&(1i64, 2i32), &mut registry);
        let mut reader = RecordReader::new(bytes.as_slice());
        let swapped = <(i32, i64)>::load(&mut reader, &registry).unwrap();
        assert_ne!(swapped, (2, 1));
    }

    proptest! {
        #[test]
        fn sequence_of_records_roundtrips(values in prop::collection::vec((any::<i64>(), ".{0,12}", any::<bool>()), 0..40)) {
            let mut registry = ClassRegistry::new();
            let mut writer = RecordWriter::new(Vec::new());
            for (id, name, flag) in &values {
                id.store(&mut writer, &mut registry).unwrap();
                name.store(&mut writer, &mut registry).unwrap();
                flag.store(&mut writer, &mut registry).unwrap();
            }
            let bytes = writer.into_inner();

            let mut reader = RecordReader::new(bytes.as_slice());
            let mut decoded = Vec::new();
            while !reader.is_at_end().unwrap() {
                let id = i64::load(&mut reader, &registry).unwrap();
                let name = String::load(&mut reader, &registry).unwrap();
                let flag = bool::load(&mut reader, &registry).unwrap();
                decoded.push((id, name, flag));
            }
            prop_assert_eq!(decoded, values);
        }
    }
}
