//! Protocol error types.

use std::io;

use thiserror::Error;

use crate::registry::RegistryError;

/// Errors that can occur when reading or writing Minecraft protocol data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A read needed more bytes than the buffer holds.
    #[error("Buffer underrun: needed {needed} bytes, {remaining} remaining")]
    Underrun {
        /// Bytes the accessor required.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// A write exceeded the capacity of a fixed-size buffer.
    #[error("Buffer overrun: needed {needed} bytes, {available} available")]
    Overrun {
        /// Bytes the accessor tried to write.
        needed: usize,
        /// Bytes of capacity left.
        available: usize,
    },

    /// A `VarInt` was too long (more than 5 bytes).
    #[error("VarInt too long")]
    VarIntTooLong,

    /// A `VarLong` was too long (more than 10 bytes).
    #[error("VarLong too long")]
    VarLongTooLong,

    /// A boolean byte was neither 0x00 nor 0x01.
    #[error("Invalid boolean byte: {0:#04x}")]
    InvalidBool(u8),

    /// A length prefix was negative.
    #[error("Negative length: {0}")]
    NegativeLength(i32),

    /// A string exceeded the maximum length.
    #[error("String too long: {len} (max {max})")]
    StringTooLong {
        /// The actual length of the string.
        len: usize,
        /// The maximum allowed length.
        max: usize,
    },

    /// A string was not valid UTF-8.
    #[error("Invalid UTF-8 in string")]
    InvalidUtf8,

    /// A length-prefixed array exceeded its cap.
    #[error("Array too long: {len} elements (max {max})")]
    ArrayTooLong {
        /// The declared element count.
        len: usize,
        /// The maximum allowed count.
        max: usize,
    },

    /// A packet exceeded the maximum length.
    #[error("Packet too long: {len} bytes (max {max})")]
    PacketTooLong {
        /// The actual length of the packet.
        len: usize,
        /// The maximum allowed length.
        max: usize,
    },

    /// A frame declared a length that cannot hold a packet ID.
    #[error("Invalid frame length: {0}")]
    InvalidFrameLength(i32),

    /// A packet decoded successfully but left bytes in its frame.
    #[error("{kind} left {remaining} unread bytes in its frame")]
    TrailingBytes {
        /// The packet kind that was decoded.
        kind: &'static str,
        /// Bytes left over.
        remaining: usize,
    },

    /// An invalid next state was received in a handshake.
    #[error("Invalid next state: {0}")]
    InvalidNextState(i32),

    /// A registry lookup or construction failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ProtocolError {
    /// Whether this error is an inbound packet ID the registry does not know.
    ///
    /// Such packets are skipped rather than treated as fatal.
    #[must_use]
    pub const fn is_unknown_packet(&self) -> bool {
        matches!(self, Self::Registry(RegistryError::UnknownPacketId { .. }))
    }
}

/// Result type alias using [`ProtocolError`].
pub type Result<T> = std::result::Result<T, ProtocolError>;
