//! Minecraft protocol implementation for Obsidian.
//!
//! This crate provides the wire-level pieces of the server: a
//! [`Buffer`] for primitive reads and writes, frame encoding in [`codec`],
//! the [`Packet`] contract, and the versioned [`PacketRegistry`] that maps
//! packet kinds to IDs.

pub mod buffer;
pub mod codec;
pub mod error;
pub mod packets;
pub mod registry;
pub mod state;
pub mod varint;
pub mod version;

pub use buffer::Buffer;
pub use codec::RawPacket;
pub use error::{ProtocolError, Result};
pub use packets::{AnyPacket, Packet, PacketKind, default_registry};
pub use registry::{PacketRegistry, PacketTable, RegistryError};
pub use state::{ConnectionState, Direction};
pub use version::ProtocolVersion;
