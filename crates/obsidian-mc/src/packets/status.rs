//! Status protocol packets.
//!
//! The status protocol is used by clients to query server information
//! without joining. This packet format is stable across all supported
//! protocol versions.

use crate::buffer::{Buffer, MAX_STRING_LENGTH};
use crate::error::Result;
use crate::packets::traits::{Packet, PacketKind};
use crate::state::{ConnectionState, Direction};
use crate::version::ProtocolVersion;

/// Status Request packet (client -> server).
///
/// This is an empty packet that requests server status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusRequest;

impl Packet for StatusRequest {
    const KIND: PacketKind = PacketKind::new("status/serverbound/request");
    const STATE: ConnectionState = ConnectionState::Status;
    const DIRECTION: Direction = Direction::ServerBound;

    fn decode(_buf: &mut Buffer, _version: ProtocolVersion) -> Result<Self> {
        Ok(Self)
    }

    fn encode(&self, _buf: &mut Buffer, _version: ProtocolVersion) -> Result<()> {
        Ok(())
    }
}

/// Status Response packet (server -> client).
///
/// Contains a JSON object with server information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    /// JSON response containing server status.
    pub json: String,
}

impl StatusResponse {
    /// Create a new status response with the given JSON.
    #[must_use]
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }
}

impl Packet for StatusResponse {
    const KIND: PacketKind = PacketKind::new("status/clientbound/response");
    const STATE: ConnectionState = ConnectionState::Status;
    const DIRECTION: Direction = Direction::ClientBound;

    fn decode(buf: &mut Buffer, _version: ProtocolVersion) -> Result<Self> {
        let json = buf.read_string(MAX_STRING_LENGTH)?;
        Ok(Self { json })
    }

    fn encode(&self, buf: &mut Buffer, _version: ProtocolVersion) -> Result<()> {
        buf.write_string(&self.json, MAX_STRING_LENGTH)
    }
}

/// Ping packet (client -> server).
///
/// Client sends a timestamp, server echoes it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping {
    /// Arbitrary payload (usually a timestamp).
    pub payload: i64,
}

impl Ping {
    /// Create a new ping with the given payload.
    #[must_use]
    pub const fn new(payload: i64) -> Self {
        Self { payload }
    }
}

impl Packet for Ping {
    const KIND: PacketKind = PacketKind::new("status/serverbound/ping");
    const STATE: ConnectionState = ConnectionState::Status;
    const DIRECTION: Direction = Direction::ServerBound;

    fn decode(buf: &mut Buffer, _version: ProtocolVersion) -> Result<Self> {
        Ok(Self {
            payload: buf.read_i64()?,
        })
    }

    fn encode(&self, buf: &mut Buffer, _version: ProtocolVersion) -> Result<()> {
        buf.write_i64(self.payload)
    }
}

/// Pong packet (server -> client).
///
/// Server echoes back the ping payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pong {
    /// The payload from the ping packet.
    pub payload: i64,
}

impl Pong {
    /// Create a new pong with the given payload.
    #[must_use]
    pub const fn new(payload: i64) -> Self {
        Self { payload }
    }
}

impl Packet for Pong {
    const KIND: PacketKind = PacketKind::new("status/clientbound/pong");
    const STATE: ConnectionState = ConnectionState::Status;
    const DIRECTION: Direction = Direction::ClientBound;

    fn decode(buf: &mut Buffer, _version: ProtocolVersion) -> Result<Self> {
        Ok(Self {
            payload: buf.read_i64()?,
        })
    }

    fn encode(&self, buf: &mut Buffer, _version: ProtocolVersion) -> Result<()> {
        buf.write_i64(self.payload)
    }
}
