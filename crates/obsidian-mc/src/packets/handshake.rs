//! Handshake packet definitions.
//!
//! The handshake is the first packet sent by the client and determines
//! whether this is a status ping or a login attempt.

use crate::buffer::Buffer;
use crate::error::{ProtocolError, Result};
use crate::packets::traits::{Packet, PacketKind};
use crate::state::{ConnectionState, Direction};
use crate::version::ProtocolVersion;

/// Maximum server address length.
const MAX_SERVER_ADDRESS: usize = 255;

/// The next state after handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextState {
    /// Status request (server list ping).
    Status = 1,
    /// Login request.
    Login = 2,
}

impl NextState {
    /// The connection state this request moves to.
    #[must_use]
    pub const fn state(self) -> ConnectionState {
        match self {
            Self::Status => ConnectionState::Status,
            Self::Login => ConnectionState::Login,
        }
    }
}

impl TryFrom<i32> for NextState {
    type Error = ProtocolError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            1 => Ok(Self::Status),
            2 => Ok(Self::Login),
            _ => Err(ProtocolError::InvalidNextState(value)),
        }
    }
}

/// Handshake packet sent by the client.
///
/// This is always the first packet in a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// The protocol version the client is using.
    pub protocol_version: ProtocolVersion,
    /// The server address the client connected to.
    pub server_address: String,
    /// The server port the client connected to.
    pub server_port: u16,
    /// The next state: Status (1) or Login (2).
    pub next_state: NextState,
}

impl Packet for Handshake {
    const KIND: PacketKind = PacketKind::new("handshaking/serverbound/handshake");
    const STATE: ConnectionState = ConnectionState::Handshaking;
    const DIRECTION: Direction = Direction::ServerBound;

    fn decode(buf: &mut Buffer, _version: ProtocolVersion) -> Result<Self> {
        let protocol_version = ProtocolVersion::from_raw(buf.read_varint()?);
        let server_address = buf.read_string(MAX_SERVER_ADDRESS)?;
        let server_port = buf.read_u16()?;
        let next_state = NextState::try_from(buf.read_varint()?)?;

        Ok(Self {
            protocol_version,
            server_address,
            server_port,
            next_state,
        })
    }

    fn encode(&self, buf: &mut Buffer, _version: ProtocolVersion) -> Result<()> {
        buf.write_varint(self.protocol_version.as_raw())?;
        buf.write_string(&self.server_address, MAX_SERVER_ADDRESS)?;
        buf.write_u16(self.server_port)?;
        buf.write_varint(self.next_state as i32)
    }
}
