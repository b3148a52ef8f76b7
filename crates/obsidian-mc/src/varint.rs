//! `VarInt` and `VarLong` encoding/decoding for Minecraft protocol.
//!
//! Minecraft uses a variable-length integer encoding where each byte
//! uses 7 bits for data and 1 bit to indicate if more bytes follow.

use bytes::BufMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{ProtocolError, Result};

/// Segment bits mask (lower 7 bits).
const SEGMENT_BITS: u8 = 0x7F;

/// Continue bit (high bit).
const CONTINUE_BIT: u8 = 0x80;

/// Maximum encoded size of a `VarInt`.
pub const MAX_VARINT_LEN: usize = 5;

/// Maximum encoded size of a `VarLong`.
pub const MAX_VARLONG_LEN: usize = 10;

/// Read a `VarInt` from an async reader.
///
/// # Errors
///
/// Returns an error if:
/// - An I/O error occurs
/// - The `VarInt` is longer than 5 bytes
pub async fn read_varint<R: AsyncRead + Unpin>(reader: &mut R) -> Result<i32> {
    let first = reader.read_u8().await?;
    read_varint_continued(first, reader).await
}

/// Finish reading a `VarInt` whose first byte has already been consumed.
///
/// # Errors
///
/// Returns an error if:
/// - An I/O error occurs
/// - The `VarInt` is longer than 5 bytes
pub async fn read_varint_continued<R: AsyncRead + Unpin>(first: u8, reader: &mut R) -> Result<i32> {
    let mut value = i32::from(first & SEGMENT_BITS);
    let mut byte = first;
    let mut position: u32 = 0;

    while byte & CONTINUE_BIT != 0 {
        position += 7;
        if position >= 32 {
            return Err(ProtocolError::VarIntTooLong);
        }

        byte = reader.read_u8().await?;
        value |= i32::from(byte & SEGMENT_BITS) << position;
    }

    Ok(value)
}

/// Decode a `VarInt` from the front of a byte slice without consuming it.
///
/// Returns the value and its encoded length, or `None` if the slice ends
/// before the terminating byte.
///
/// # Errors
///
/// Returns [`ProtocolError::VarIntTooLong`] if five bytes all carry the
/// continue bit.
pub fn decode_varint(bytes: &[u8]) -> Result<Option<(i32, usize)>> {
    let mut value: i32 = 0;

    for (i, &byte) in bytes.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= i32::from(byte & SEGMENT_BITS) << (7 * i);
        if byte & CONTINUE_BIT == 0 {
            return Ok(Some((value, i + 1)));
        }
    }

    if bytes.len() >= MAX_VARINT_LEN {
        Err(ProtocolError::VarIntTooLong)
    } else {
        Ok(None)
    }
}

/// Decode a `VarLong` from the front of a byte slice without consuming it.
///
/// # Errors
///
/// Returns [`ProtocolError::VarLongTooLong`] if ten bytes all carry the
/// continue bit.
pub fn decode_varlong(bytes: &[u8]) -> Result<Option<(i64, usize)>> {
    let mut value: i64 = 0;

    for (i, &byte) in bytes.iter().take(MAX_VARLONG_LEN).enumerate() {
        value |= i64::from(byte & SEGMENT_BITS) << (7 * i);
        if byte & CONTINUE_BIT == 0 {
            return Ok(Some((value, i + 1)));
        }
    }

    if bytes.len() >= MAX_VARLONG_LEN {
        Err(ProtocolError::VarLongTooLong)
    } else {
        Ok(None)
    }
}

/// Write a `VarInt` to a buffer.
///
/// Returns the number of bytes written.
#[allow(clippy::cast_sign_loss)]
pub fn write_varint(buf: &mut impl BufMut, value: i32) -> usize {
    let mut value = value as u32;
    let mut bytes_written = 0;

    loop {
        #[allow(clippy::cast_possible_truncation)]
        let byte = (value & u32::from(SEGMENT_BITS)) as u8;
        value >>= 7;
        bytes_written += 1;

        if value == 0 {
            buf.put_u8(byte);
            return bytes_written;
        }
        buf.put_u8(byte | CONTINUE_BIT);
    }
}

/// Write a `VarLong` to a buffer.
///
/// Returns the number of bytes written.
#[allow(clippy::cast_sign_loss)]
pub fn write_varlong(buf: &mut impl BufMut, value: i64) -> usize {
    let mut value = value as u64;
    let mut bytes_written = 0;

    loop {
        #[allow(clippy::cast_possible_truncation)]
        let byte = (value & u64::from(SEGMENT_BITS)) as u8;
        value >>= 7;
        bytes_written += 1;

        if value == 0 {
            buf.put_u8(byte);
            return bytes_written;
        }
        buf.put_u8(byte | CONTINUE_BIT);
    }
}

/// Calculate the number of bytes needed to encode a `VarInt`.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn varint_len(value: i32) -> usize {
    let value = value as u32;

    if value == 0 {
        return 1;
    }

    let bits_needed = 32 - value.leading_zeros();
    (bits_needed as usize).div_ceil(7)
}

/// Calculate the number of bytes needed to encode a `VarLong`.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn varlong_len(value: i64) -> usize {
    let value = value as u64;

    if value == 0 {
        return 1;
    }

    let bits_needed = 64 - value.leading_zeros();
    (bits_needed as usize).div_ceil(7)
}
