//! Record reader.

use crate::error::{CodecError, CodecResult};
use std::io::BufRead;

/// Maximum allowed string length.
/// Guards allocation when a corrupt length prefix is read.
pub(crate) const MAX_STRING_LENGTH: u64 = 256 * 1024 * 1024;

/// Reads record fields written by [`crate::RecordWriter`].
///
/// The reader needs [`BufRead`] so it can tell a clean end of stream
/// (nothing left at a record boundary) from a record cut short.
pub struct RecordReader<R: BufRead> {
    inner: R,
}

impl<R: BufRead> RecordReader<R> {
    /// Create a new reader over `inner`.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Returns true when no bytes remain.
    ///
    /// Call this only at a record boundary; end of stream anywhere else is
    /// reported by the field readers as [`CodecError::UnexpectedEof`].
    pub fn is_at_end(&mut self) -> CodecResult<bool> {
        Ok(self.inner.fill_buf()?.is_empty())
    }

    /// Read a boolean.
    pub fn read_bool(&mut self) -> CodecResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::decoding_failed(format!(
                "invalid boolean byte {other:#04x}"
            ))),
        }
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> CodecResult<u8> {
        let mut buf = [0u8; 1];
        self.take(&mut buf)?;
        Ok(buf[0])
    }

    /// Read a 32-bit signed integer.
    pub fn read_i32(&mut self) -> CodecResult<i32> {
        let mut buf = [0u8; 4];
        self.take(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    /// Read a 64-bit signed integer.
    pub fn read_i64(&mut self) -> CodecResult<i64> {
        let mut buf = [0u8; 8];
        self.take(&mut buf)?;
        Ok(i64::from_le_bytes(buf))
    }

    /// Read a 64-bit float.
    pub fn read_f64(&mut self) -> CodecResult<f64> {
        let mut buf = [0u8; 8];
        self.take(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> CodecResult<String> {
        let mut len_buf = [0u8; 4];
        self.take(&mut len_buf)?;
        let len = u64::from(u32::from_le_bytes(len_buf));
        if len > MAX_STRING_LENGTH {
            return Err(CodecError::StringTooLong {
                len,
                limit: MAX_STRING_LENGTH,
            });
        }

        #[allow(clippy::cast_possible_truncation)]
        let mut bytes = vec![0u8; len as usize];
        self.take(&mut bytes)?;
        String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
    }

    /// Get a mutable reference to the underlying source.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the reader and return the underlying source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    #[inline]
    fn take(&mut self, buf: &mut [u8]) -> CodecResult<()> {
        self.inner.read_exact(buf).map_err(CodecError::from_read)
    }
}
