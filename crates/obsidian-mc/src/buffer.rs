//! Read/write cursor used by packets to encode and decode themselves.
//!
//! A [`Buffer`] appends writes to the end of its backing store and serves
//! reads from an independent read position, so a packet written into a
//! buffer can be read straight back out of it.
//!
//! Fixed-width integers and floats are big-endian. Reads never leave the
//! cursor partially advanced: an accessor either consumes exactly the bytes
//! of its value or fails and leaves the position where it started.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::error::{ProtocolError, Result};
use crate::varint::{
    decode_varint, decode_varlong, varint_len, varlong_len, write_varint, write_varlong,
};

/// Maximum string length (in characters) allowed by the protocol.
pub const MAX_STRING_LENGTH: usize = 32767;

/// A growable (or fixed-capacity) byte buffer with a read cursor.
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    data: BytesMut,
    read_pos: usize,
    limit: Option<usize>,
}

impl Buffer {
    /// Create an empty, growable buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer that rejects writes past `capacity` bytes.
    #[must_use]
    pub fn with_fixed_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            read_pos: 0,
            limit: Some(capacity),
        }
    }

    /// Total bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes not yet read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.read_pos
    }

    /// Current read position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.read_pos
    }

    /// The unread bytes.
    #[must_use]
    pub fn unread(&self) -> &[u8] {
        &self.data[self.read_pos..]
    }

    /// All written bytes, read or not.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer, returning its unread bytes.
    #[must_use]
    pub fn into_bytes(mut self) -> Bytes {
        self.data.advance(self.read_pos);
        self.data.freeze()
    }

    /// Discard everything not yet read.
    pub fn skip_remaining(&mut self) -> usize {
        let skipped = self.remaining();
        self.read_pos = self.data.len();
        skipped
    }

    /// Run a composite read, restoring the read position if it fails.
    fn transaction<T>(&mut self, read: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let start = self.read_pos;
        let result = read(self);
        if result.is_err() {
            self.read_pos = start;
        }
        result
    }

    /// Borrow the next `n` unread bytes and advance past them.
    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(ProtocolError::Underrun {
                needed: n,
                remaining,
            });
        }
        let start = self.read_pos;
        self.read_pos += n;
        Ok(&self.data[start..start + n])
    }

    /// Ensure `n` more bytes fit before writing them.
    fn reserve(&mut self, n: usize) -> Result<()> {
        if let Some(limit) = self.limit {
            let available = limit.saturating_sub(self.data.len());
            if n > available {
                return Err(ProtocolError::Overrun {
                    needed: n,
                    available,
                });
            }
        }
        Ok(())
    }

    /// Read an unsigned byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Write an unsigned byte.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.reserve(1)?;
        self.data.put_u8(value);
        Ok(())
    }

    /// Read a signed byte.
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?.get_i8())
    }

    /// Write a signed byte.
    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.reserve(1)?;
        self.data.put_i8(value);
        Ok(())
    }

    /// Read a boolean (0x00 or 0x01).
    pub fn read_bool(&mut self) -> Result<bool> {
        self.transaction(|buf| match buf.read_u8()? {
            0x00 => Ok(false),
            0x01 => Ok(true),
            other => Err(ProtocolError::InvalidBool(other)),
        })
    }

    /// Write a boolean as 0x00 or 0x01.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(u8::from(value))
    }

    /// Read a big-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.take(2)?.get_u16())
    }

    /// Write a big-endian `u16`.
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.reserve(2)?;
        self.data.put_u16(value);
        Ok(())
    }

    /// Read a big-endian `i16`.
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.take(2)?.get_i16())
    }

    /// Write a big-endian `i16`.
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.reserve(2)?;
        self.data.put_i16(value);
        Ok(())
    }

    /// Read a big-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.take(4)?.get_i32())
    }

    /// Write a big-endian `i32`.
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.reserve(4)?;
        self.data.put_i32(value);
        Ok(())
    }

    /// Read a big-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.take(8)?.get_i64())
    }

    /// Write a big-endian `i64`.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.reserve(8)?;
        self.data.put_i64(value);
        Ok(())
    }

    /// Read a big-endian IEEE 754 `f32`.
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(self.take(4)?.get_f32())
    }

    /// Write a big-endian IEEE 754 `f32`.
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.reserve(4)?;
        self.data.put_f32(value);
        Ok(())
    }

    /// Read a big-endian IEEE 754 `f64`.
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(self.take(8)?.get_f64())
    }

    /// Write a big-endian IEEE 754 `f64`.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.reserve(8)?;
        self.data.put_f64(value);
        Ok(())
    }

    /// Read a `VarInt`.
    ///
    /// # Errors
    ///
    /// Fails with [`ProtocolError::Underrun`] if the buffer ends mid-value
    /// and [`ProtocolError::VarIntTooLong`] on a malformed encoding.
    pub fn read_varint(&mut self) -> Result<i32> {
        match decode_varint(self.unread())? {
            Some((value, len)) => {
                self.read_pos += len;
                Ok(value)
            }
            None => Err(ProtocolError::Underrun {
                needed: self.remaining() + 1,
                remaining: self.remaining(),
            }),
        }
    }

    /// Write a `VarInt`.
    pub fn write_varint(&mut self, value: i32) -> Result<()> {
        self.reserve(varint_len(value))?;
        write_varint(&mut self.data, value);
        Ok(())
    }

    /// Read a `VarLong`.
    pub fn read_varlong(&mut self) -> Result<i64> {
        match decode_varlong(self.unread())? {
            Some((value, len)) => {
                self.read_pos += len;
                Ok(value)
            }
            None => Err(ProtocolError::Underrun {
                needed: self.remaining() + 1,
                remaining: self.remaining(),
            }),
        }
    }

    /// Write a `VarLong`.
    pub fn write_varlong(&mut self, value: i64) -> Result<()> {
        self.reserve(varlong_len(value))?;
        write_varlong(&mut self.data, value);
        Ok(())
    }

    /// Read a non-negative `VarInt` length prefix.
    fn read_length(&mut self) -> Result<usize> {
        let len = self.read_varint()?;
        usize::try_from(len).map_err(|_| ProtocolError::NegativeLength(len))
    }

    /// Write a `VarInt` length prefix.
    fn write_length(&mut self, len: usize) -> Result<()> {
        let len = i32::try_from(len).map_err(|_| ProtocolError::PacketTooLong {
            len,
            max: i32::MAX as usize,
        })?;
        self.write_varint(len)
    }

    /// Read a Minecraft string: `[VarInt byte length][UTF-8 bytes]`.
    ///
    /// The byte length is checked against `max_len * 4` before any bytes
    /// are copied, and the decoded character count against `max_len`.
    ///
    /// # Errors
    ///
    /// Returns an error if the string exceeds the maximum length, is not
    /// valid UTF-8, or the buffer ends early.
    pub fn read_string(&mut self, max_len: usize) -> Result<String> {
        self.transaction(|buf| {
            let len = buf.read_length()?;

            // Max 4 bytes per char in UTF-8
            let max_bytes = max_len.saturating_mul(4);
            if len > max_bytes {
                return Err(ProtocolError::StringTooLong {
                    len,
                    max: max_bytes,
                });
            }

            let bytes = buf.take(len)?;
            let s = std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)?;

            let chars = s.chars().count();
            if chars > max_len {
                return Err(ProtocolError::StringTooLong {
                    len: chars,
                    max: max_len,
                });
            }

            Ok(s.to_owned())
        })
    }

    /// Write a Minecraft string, refusing strings longer than `max_len` characters.
    pub fn write_string(&mut self, s: &str, max_len: usize) -> Result<()> {
        let chars = s.chars().count();
        if chars > max_len {
            return Err(ProtocolError::StringTooLong {
                len: chars,
                max: max_len,
            });
        }

        self.reserve(varint_len_for(s.len()) + s.len())?;
        self.write_length(s.len())?;
        self.data.put_slice(s.as_bytes());
        Ok(())
    }

    /// Read a UUID (16 bytes, most significant first).
    pub fn read_uuid(&mut self) -> Result<Uuid> {
        let bytes = self.take(16)?;
        let mut raw = [0u8; 16];
        raw.copy_from_slice(bytes);
        Ok(Uuid::from_bytes(raw))
    }

    /// Write a UUID.
    pub fn write_uuid(&mut self, uuid: Uuid) -> Result<()> {
        self.reserve(16)?;
        self.data.put_slice(uuid.as_bytes());
        Ok(())
    }

    /// Read a `VarInt`-length-prefixed byte array of at most `max_len` bytes.
    pub fn read_byte_array(&mut self, max_len: usize) -> Result<Bytes> {
        self.transaction(|buf| {
            let len = buf.read_length()?;
            if len > max_len {
                return Err(ProtocolError::ArrayTooLong { len, max: max_len });
            }
            Ok(Bytes::copy_from_slice(buf.take(len)?))
        })
    }

    /// Write a `VarInt`-length-prefixed byte array.
    pub fn write_byte_array(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(varint_len_for(bytes.len()) + bytes.len())?;
        self.write_length(bytes.len())?;
        self.data.put_slice(bytes);
        Ok(())
    }

    /// Read a `VarInt`-count-prefixed array of at most `max_len` elements.
    ///
    /// If any element fails, the whole array read is rolled back.
    pub fn read_array<T>(
        &mut self,
        max_len: usize,
        mut read: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        self.transaction(|buf| {
            let len = buf.read_length()?;
            if len > max_len {
                return Err(ProtocolError::ArrayTooLong { len, max: max_len });
            }
            // Each element is at least one byte; don't trust the count further.
            let mut items = Vec::with_capacity(len.min(buf.remaining()));
            for _ in 0..len {
                items.push(read(buf)?);
            }
            Ok(items)
        })
    }

    /// Write a `VarInt`-count-prefixed array.
    ///
    /// If any element fails, everything this call wrote is removed again.
    pub fn write_array<T>(
        &mut self,
        items: &[T],
        mut write: impl FnMut(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        let start = self.data.len();
        let result = self.write_length(items.len()).and_then(|()| {
            items.iter().try_for_each(|item| write(self, item))
        });
        if result.is_err() {
            self.data.truncate(start);
        }
        result
    }

    /// Read every unread byte.
    pub fn read_remaining(&mut self) -> Bytes {
        let start = self.read_pos;
        self.read_pos = self.data.len();
        Bytes::copy_from_slice(&self.data[start..])
    }

    /// Append raw bytes with no length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(bytes.len())?;
        self.data.put_slice(bytes);
        Ok(())
    }
}

impl From<BytesMut> for Buffer {
    fn from(data: BytesMut) -> Self {
        Self {
            data,
            read_pos: 0,
            limit: None,
        }
    }
}

impl From<&[u8]> for Buffer {
    fn from(data: &[u8]) -> Self {
        Self::from(BytesMut::from(data))
    }
}

/// Encoded size of a length prefix, saturating for lengths no frame can hold.
fn varint_len_for(len: usize) -> usize {
    i32::try_from(len).map_or(5, varint_len)
}
