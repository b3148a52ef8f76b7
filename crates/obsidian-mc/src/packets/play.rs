//! Play state packets.
//!
//! Only the packets the network core itself sends or answers live here;
//! gameplay extensions register their own kinds on top.

use crate::buffer::Buffer;
use crate::error::Result;
use crate::packets::traits::{Packet, PacketKind};
use crate::state::{ConnectionState, Direction};
use crate::version::ProtocolVersion;

/// Maximum chat component length.
const MAX_CHAT_LENGTH: usize = 262_144;

/// Keep Alive packet (server -> client).
///
/// The client must echo `id` back in a [`ServerboundKeepAlive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientboundKeepAlive {
    /// Arbitrary ID to be echoed.
    pub id: i64,
}

impl Packet for ClientboundKeepAlive {
    const KIND: PacketKind = PacketKind::new("play/clientbound/keep_alive");
    const STATE: ConnectionState = ConnectionState::Play;
    const DIRECTION: Direction = Direction::ClientBound;

    fn decode(buf: &mut Buffer, _version: ProtocolVersion) -> Result<Self> {
        Ok(Self { id: buf.read_i64()? })
    }

    fn encode(&self, buf: &mut Buffer, _version: ProtocolVersion) -> Result<()> {
        buf.write_i64(self.id)
    }
}

/// Keep Alive packet (client -> server).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerboundKeepAlive {
    /// ID echoed from the matching [`ClientboundKeepAlive`].
    pub id: i64,
}

impl Packet for ServerboundKeepAlive {
    const KIND: PacketKind = PacketKind::new("play/serverbound/keep_alive");
    const STATE: ConnectionState = ConnectionState::Play;
    const DIRECTION: Direction = Direction::ServerBound;

    fn decode(buf: &mut Buffer, _version: ProtocolVersion) -> Result<Self> {
        Ok(Self { id: buf.read_i64()? })
    }

    fn encode(&self, buf: &mut Buffer, _version: ProtocolVersion) -> Result<()> {
        buf.write_i64(self.id)
    }
}

/// Disconnect packet (server -> client) for the play state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayDisconnect {
    /// The disconnect reason (JSON chat component).
    pub reason: String,
}

impl PlayDisconnect {
    /// Create a disconnect packet from a JSON chat component.
    #[must_use]
    pub fn from_json(json: impl Into<String>) -> Self {
        Self {
            reason: json.into(),
        }
    }
}

impl Packet for PlayDisconnect {
    const KIND: PacketKind = PacketKind::new("play/clientbound/disconnect");
    const STATE: ConnectionState = ConnectionState::Play;
    const DIRECTION: Direction = Direction::ClientBound;

    fn decode(buf: &mut Buffer, _version: ProtocolVersion) -> Result<Self> {
        let reason = buf.read_string(MAX_CHAT_LENGTH)?;
        Ok(Self { reason })
    }

    fn encode(&self, buf: &mut Buffer, _version: ProtocolVersion) -> Result<()> {
        buf.write_string(&self.reason, MAX_CHAT_LENGTH)
    }
}

/// Server Difficulty packet (server -> client).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerDifficulty {
    /// 0 peaceful, 1 easy, 2 normal, 3 hard.
    pub difficulty: u8,
    /// Whether the client may change it.
    pub locked: bool,
}

impl Packet for ServerDifficulty {
    const KIND: PacketKind = PacketKind::new("play/clientbound/server_difficulty");
    const STATE: ConnectionState = ConnectionState::Play;
    const DIRECTION: Direction = Direction::ClientBound;

    fn decode(buf: &mut Buffer, _version: ProtocolVersion) -> Result<Self> {
        let difficulty = buf.read_u8()?;
        let locked = buf.read_bool()?;
        Ok(Self { difficulty, locked })
    }

    fn encode(&self, buf: &mut Buffer, _version: ProtocolVersion) -> Result<()> {
        buf.write_u8(self.difficulty)?;
        buf.write_bool(self.locked)
    }
}

/// Player Position And Look packet (server -> client).
///
/// Bits of `flags` mark the matching field as relative to the current value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerPositionAndLook {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate (feet).
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
    /// Yaw in degrees.
    pub yaw: f32,
    /// Pitch in degrees.
    pub pitch: f32,
    /// Relative-field bit set.
    pub flags: u8,
    /// ID the client confirms the teleport with.
    pub teleport_id: i32,
}

impl Packet for PlayerPositionAndLook {
    const KIND: PacketKind = PacketKind::new("play/clientbound/position_and_look");
    const STATE: ConnectionState = ConnectionState::Play;
    const DIRECTION: Direction = Direction::ClientBound;

    fn decode(buf: &mut Buffer, _version: ProtocolVersion) -> Result<Self> {
        Ok(Self {
            x: buf.read_f64()?,
            y: buf.read_f64()?,
            z: buf.read_f64()?,
            yaw: buf.read_f32()?,
            pitch: buf.read_f32()?,
            flags: buf.read_u8()?,
            teleport_id: buf.read_varint()?,
        })
    }

    fn encode(&self, buf: &mut Buffer, _version: ProtocolVersion) -> Result<()> {
        buf.write_f64(self.x)?;
        buf.write_f64(self.y)?;
        buf.write_f64(self.z)?;
        buf.write_f32(self.yaw)?;
        buf.write_f32(self.pitch)?;
        buf.write_u8(self.flags)?;
        buf.write_varint(self.teleport_id)
    }
}
