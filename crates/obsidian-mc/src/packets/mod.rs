//! Minecraft protocol packets.
//!
//! Packets are organized by connection state:
//! - Handshake: Initial connection state
//! - Status: Server list ping
//! - Login: Offline-mode login
//! - Play: Keep-alive, disconnect and the few clientbound packets the core sends
//!
//! IDs are not part of the packet types. The [`baseline`] table holds the IDs
//! that never change; version modules such as [`v1_16`] layer their own on top.

pub mod handshake;
pub mod login;
pub mod play;
pub mod status;
pub mod traits;
pub mod v1_16;

pub use handshake::{Handshake, NextState};
pub use login::{LoginDisconnect, LoginStart, LoginSuccess};
pub use play::{
    ClientboundKeepAlive, PlayDisconnect, PlayerPositionAndLook, ServerDifficulty,
    ServerboundKeepAlive,
};
pub use status::{Ping, Pong, StatusRequest, StatusResponse};
pub use traits::{AnyPacket, DecodeFn, Packet, PacketKind};

use crate::registry::{PacketRegistry, PacketTable, RegistryError};

/// Packet IDs shared by every supported version.
#[must_use]
pub fn baseline() -> PacketTable {
    PacketTable::new()
        // handshaking
        .with::<Handshake>(0x00)
        // status
        .with::<StatusRequest>(0x00)
        .with::<Ping>(0x01)
        .with::<StatusResponse>(0x00)
        .with::<Pong>(0x01)
        // login
        .with::<LoginStart>(0x00)
        .with::<LoginDisconnect>(0x00)
        .with::<LoginSuccess>(0x02)
}

/// Build the registry with every built-in version.
///
/// # Errors
///
/// Only fails if a built-in table is inconsistent.
pub fn default_registry() -> Result<PacketRegistry, RegistryError> {
    let mut registry = PacketRegistry::new();
    registry.register_baseline(baseline())?;
    registry.register_version(v1_16::VERSION, v1_16::overrides())?;
    registry.alias_versions(v1_16::VERSION, &v1_16::ALIASES)?;
    Ok(registry)
}
