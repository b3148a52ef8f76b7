//! Packet framing codec for Minecraft protocol.
//!
//! Minecraft packets are framed as:
//! - `[VarInt length][VarInt packet_id][payload...]`
//!
//! The length includes the packet ID and payload, but not itself.

use std::io;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::buffer::Buffer;
use crate::error::{ProtocolError, Result};
use crate::varint::{read_varint_continued, varint_len, write_varint};

/// Maximum packet size (2 MiB, same as vanilla).
pub const MAX_PACKET_SIZE: usize = 2 * 1024 * 1024;

/// A raw packet with its ID and payload.
#[derive(Debug, Clone)]
pub struct RawPacket {
    /// The packet ID.
    pub id: i32,
    /// The packet payload (without the packet ID).
    pub payload: Buffer,
}

impl RawPacket {
    /// Create a new raw packet with the given ID and payload.
    #[must_use]
    pub const fn new(id: i32, payload: Buffer) -> Self {
        Self { id, payload }
    }

    /// Create a new raw packet with the given ID and an empty payload.
    #[must_use]
    pub fn empty(id: i32) -> Self {
        Self {
            id,
            payload: Buffer::new(),
        }
    }
}

/// Read one frame from an async reader.
///
/// Returns `Ok(None)` if the stream ends cleanly on a frame boundary.
///
/// # Errors
///
/// Returns an error if:
/// - An I/O error occurs, including EOF in the middle of a frame
/// - The frame length is not positive or exceeds [`MAX_PACKET_SIZE`]
/// - The packet ID is malformed
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<RawPacket>> {
    let first = match reader.read_u8().await {
        Ok(byte) => byte,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let length = read_varint_continued(first, reader).await?;
    if length <= 0 {
        return Err(ProtocolError::InvalidFrameLength(length));
    }

    #[allow(clippy::cast_sign_loss)]
    let length = length as usize;
    if length > MAX_PACKET_SIZE {
        return Err(ProtocolError::PacketTooLong {
            len: length,
            max: MAX_PACKET_SIZE,
        });
    }

    // Read the entire packet data (packet_id + payload)
    let mut data = BytesMut::zeroed(length);
    reader.read_exact(&mut data).await?;

    let mut payload = Buffer::from(data);
    let id = payload.read_varint()?;

    Ok(Some(RawPacket { id, payload }))
}

/// Build a complete frame for `id` and the unread bytes of `payload`.
///
/// # Errors
///
/// Returns [`ProtocolError::PacketTooLong`] if the frame would exceed
/// [`MAX_PACKET_SIZE`].
pub fn encode_frame(id: i32, payload: &Buffer) -> Result<BytesMut> {
    let body = payload.unread();
    let total_len = varint_len(id) + body.len();
    if total_len > MAX_PACKET_SIZE {
        return Err(ProtocolError::PacketTooLong {
            len: total_len,
            max: MAX_PACKET_SIZE,
        });
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let total_len_i32 = total_len as i32;

    let mut buf = BytesMut::with_capacity(varint_len(total_len_i32) + total_len);
    write_varint(&mut buf, total_len_i32);
    write_varint(&mut buf, id);
    buf.put_slice(body);

    Ok(buf)
}

/// Write a raw packet to an async writer as a single frame.
///
/// # Errors
///
/// Returns an error if the packet is too large or an I/O error occurs.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, packet: &RawPacket) -> Result<()> {
    let frame = encode_frame(packet.id, &packet.payload)?;
    writer.write_all(&frame).await?;
    Ok(())
}
