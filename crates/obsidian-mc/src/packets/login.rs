//! Login protocol packets.
//!
//! Offline-mode login: the client announces a username, the server either
//! refuses it with a reason or confirms it with the session UUID.

use uuid::Uuid;

use crate::buffer::Buffer;
use crate::error::Result;
use crate::packets::traits::{Packet, PacketKind};
use crate::state::{ConnectionState, Direction};
use crate::version::ProtocolVersion;

/// Maximum username length (16 characters).
pub const MAX_USERNAME_LENGTH: usize = 16;

/// Maximum disconnect reason length.
const MAX_DISCONNECT_REASON_LENGTH: usize = 262_144;

// =============================================================================
// LoginStart (Client -> Server)
// =============================================================================

/// Login Start packet (client -> server).
///
/// Sent by the client to begin the login process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginStart {
    /// The player's username.
    pub name: String,
}

impl LoginStart {
    /// Create a new login start packet.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Packet for LoginStart {
    const KIND: PacketKind = PacketKind::new("login/serverbound/start");
    const STATE: ConnectionState = ConnectionState::Login;
    const DIRECTION: Direction = Direction::ServerBound;

    fn decode(buf: &mut Buffer, _version: ProtocolVersion) -> Result<Self> {
        let name = buf.read_string(MAX_USERNAME_LENGTH)?;
        Ok(Self { name })
    }

    fn encode(&self, buf: &mut Buffer, _version: ProtocolVersion) -> Result<()> {
        buf.write_string(&self.name, MAX_USERNAME_LENGTH)
    }
}

// =============================================================================
// LoginSuccess (Server -> Client)
// =============================================================================

/// Login Success packet (server -> client).
///
/// Sent when login is complete. Client should transition to Play state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSuccess {
    /// The player's UUID.
    pub uuid: Uuid,
    /// The player's username.
    pub username: String,
}

impl LoginSuccess {
    /// Create a new login success packet.
    #[must_use]
    pub fn new(uuid: Uuid, username: impl Into<String>) -> Self {
        Self {
            uuid,
            username: username.into(),
        }
    }
}

impl Packet for LoginSuccess {
    const KIND: PacketKind = PacketKind::new("login/clientbound/success");
    const STATE: ConnectionState = ConnectionState::Login;
    const DIRECTION: Direction = Direction::ClientBound;

    fn decode(buf: &mut Buffer, _version: ProtocolVersion) -> Result<Self> {
        let uuid = buf.read_uuid()?;
        let username = buf.read_string(MAX_USERNAME_LENGTH)?;
        Ok(Self { uuid, username })
    }

    fn encode(&self, buf: &mut Buffer, _version: ProtocolVersion) -> Result<()> {
        buf.write_uuid(self.uuid)?;
        buf.write_string(&self.username, MAX_USERNAME_LENGTH)
    }
}

// =============================================================================
// LoginDisconnect (Server -> Client)
// =============================================================================

/// Login Disconnect packet (server -> client).
///
/// Sent when the server disconnects the client during login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginDisconnect {
    /// The disconnect reason (JSON chat component).
    pub reason: String,
}

impl LoginDisconnect {
    /// Create a disconnect packet from a JSON chat component.
    #[must_use]
    pub fn from_json(json: impl Into<String>) -> Self {
        Self {
            reason: json.into(),
        }
    }
}

impl Packet for LoginDisconnect {
    const KIND: PacketKind = PacketKind::new("login/clientbound/disconnect");
    const STATE: ConnectionState = ConnectionState::Login;
    const DIRECTION: Direction = Direction::ClientBound;

    fn decode(buf: &mut Buffer, _version: ProtocolVersion) -> Result<Self> {
        let reason = buf.read_string(MAX_DISCONNECT_REASON_LENGTH)?;
        Ok(Self { reason })
    }

    fn encode(&self, buf: &mut Buffer, _version: ProtocolVersion) -> Result<()> {
        buf.write_string(&self.reason, MAX_DISCONNECT_REASON_LENGTH)
    }
}
