//! Byte-level reader with bounded little-endian operations.

use crate::error::{ByteError, ByteResult};

/// A cursor for decoding little-endian binary data from a byte slice.
///
/// All read operations are bounds-checked and return errors on failure.
/// The reader never panics on malformed input.
#[derive(Debug)]
pub struct ByteReader<'a> {
    /// The underlying byte buffer.
    data: &'a [u8],
    /// Current byte position.
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a new `ByteReader` from a byte slice.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current byte position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of bytes remaining to read.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns `true` if there are no more bytes to read.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrows the next `count` bytes and advances past them.
    ///
    /// # Errors
    ///
    /// Returns [`ByteError::Truncated`] if fewer than `count` bytes remain.
    pub fn read_bytes(&mut self, count: usize) -> ByteResult<&'a [u8]> {
        if self.remaining() < count {
            return Err(ByteError::Truncated {
                needed: count,
                available: self.remaining(),
            });
        }
        let start = self.pos;
        self.pos += count;
        Ok(&self.data[start..self.pos])
    }

    /// Advances past `count` bytes without inspecting them.
    ///
    /// # Errors
    ///
    /// Returns [`ByteError::Truncated`] if fewer than `count` bytes remain.
    pub fn skip(&mut self, count: usize) -> ByteResult<()> {
        self.read_bytes(count).map(|_| ())
    }

    fn read_array<const N: usize>(&mut self) -> ByteResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Reads an unsigned 8-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`ByteError::Truncated`] if no bytes remain.
    pub fn read_u8(&mut self) -> ByteResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Reads a signed 8-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`ByteError::Truncated`] if no bytes remain.
    pub fn read_i8(&mut self) -> ByteResult<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Reads a little-endian unsigned 16-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`ByteError::Truncated`] if fewer than 2 bytes remain.
    pub fn read_u16(&mut self) -> ByteResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian signed 16-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`ByteError::Truncated`] if fewer than 2 bytes remain.
    pub fn read_i16(&mut self) -> ByteResult<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian unsigned 32-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`ByteError::Truncated`] if fewer than 4 bytes remain.
    pub fn read_u32(&mut self) -> ByteResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian signed 32-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`ByteError::Truncated`] if fewer than 4 bytes remain.
    pub fn read_i32(&mut self) -> ByteResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian unsigned 64-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`ByteError::Truncated`] if fewer than 8 bytes remain.
    pub fn read_u64(&mut self) -> ByteResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian signed 64-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`ByteError::Truncated`] if fewer than 8 bytes remain.
    pub fn read_i64(&mut self) -> ByteResult<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian IEEE-754 32-bit float.
    ///
    /// # Errors
    ///
    /// Returns [`ByteError::Truncated`] if fewer than 4 bytes remain.
    pub fn read_f32(&mut self) -> ByteResult<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    /// Reads a length-prefixed UTF-8 string.
    ///
    /// The prefix is a little-endian `u16` byte count; a zero-length string
    /// is valid and decodes to `""`.
    ///
    /// # Errors
    ///
    /// Returns [`ByteError::Truncated`] if the prefix or payload is cut
    /// short, and [`ByteError::InvalidUtf8`] if the payload is not
    /// well-formed UTF-8.
    pub fn read_string(&mut self) -> ByteResult<String> {
        let len = self.read_u16()? as usize;
        let position = self.pos;
        let bytes = self.read_bytes(len)?;
        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(s.to_owned()),
            Err(_) => Err(ByteError::InvalidUtf8 { position }),
        }
    }
}
