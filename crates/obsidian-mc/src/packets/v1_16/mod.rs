//! Protocol 735 (Minecraft 1.16) packet IDs.
//!
//! 1.16.1 through 1.16.5 reuse this table unchanged; see
//! [`default_registry`](super::default_registry).

use crate::packets::play::{
    ClientboundKeepAlive, PlayDisconnect, PlayerPositionAndLook, ServerDifficulty,
    ServerboundKeepAlive,
};
use crate::registry::PacketTable;
use crate::version::ProtocolVersion;

/// The version these overrides are registered under.
pub const VERSION: ProtocolVersion = ProtocolVersion::V1_16;

/// Versions that share the 1.16 table.
pub const ALIASES: [ProtocolVersion; 4] = [
    ProtocolVersion::V1_16_1,
    ProtocolVersion::V1_16_2,
    ProtocolVersion::V1_16_3,
    ProtocolVersion::V1_16_4,
];

/// Play state IDs layered over the baseline.
#[must_use]
pub fn overrides() -> PacketTable {
    PacketTable::new()
        // clientbound
        .with::<ServerDifficulty>(0x0D)
        .with::<PlayDisconnect>(0x19)
        .with::<ClientboundKeepAlive>(0x1F)
        .with::<PlayerPositionAndLook>(0x34)
        // serverbound
        .with::<ServerboundKeepAlive>(0x10)
}
