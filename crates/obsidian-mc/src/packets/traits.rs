//! Packet traits for serialization and deserialization.
//!
//! These traits provide a common interface for reading and writing
//! Minecraft protocol packets across different protocol versions.

use std::any::Any;
use std::fmt;

use crate::buffer::Buffer;
use crate::error::Result;
use crate::registry::PacketRegistry;
use crate::state::{ConnectionState, Direction};
use crate::version::ProtocolVersion;

/// Stable identity of a packet kind, used as the registry key.
///
/// Every packet type declares its own kind; two types must never share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PacketKind(&'static str);

impl PacketKind {
    /// Create a kind from a unique name (e.g. `"status/ping"`).
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The kind's name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A Minecraft protocol packet.
///
/// A packet knows its kind and the (state, direction) it travels in, and can
/// read and write its fields. It never knows its own numeric ID: that is
/// resolved through a [`PacketRegistry`] for the active protocol version.
pub trait Packet: fmt::Debug + Send + Sync + Sized + 'static {
    /// Registry identity of this packet type.
    const KIND: PacketKind;

    /// The connection state this packet belongs to.
    const STATE: ConnectionState;

    /// The direction this packet flows in.
    const DIRECTION: Direction;

    /// Read the packet from a buffer.
    ///
    /// Fields are read in wire order; bytes after the last field are left
    /// for the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet data is malformed.
    fn decode(buf: &mut Buffer, version: ProtocolVersion) -> Result<Self>;

    /// Write the packet to a buffer, in the same field order as [`decode`](Self::decode).
    ///
    /// # Errors
    ///
    /// Returns an error if a field exceeds its protocol cap or the buffer
    /// has a fixed capacity that is exceeded.
    fn encode(&self, buf: &mut Buffer, version: ProtocolVersion) -> Result<()>;

    /// Look up this packet's ID for `version`.
    ///
    /// # Errors
    ///
    /// Returns a `NoMapping` registry error if `version` has no ID for this kind.
    fn resolve_id(&self, registry: &PacketRegistry, version: ProtocolVersion) -> Result<i32> {
        Ok(registry.lookup_id(version, Self::STATE, Self::DIRECTION, Self::KIND)?)
    }
}

/// Object-safe view of a [`Packet`], used where the concrete type is only
/// known at runtime (inbound decode, broadcast).
pub trait AnyPacket: fmt::Debug + Send + Sync + 'static {
    /// Registry identity of the packet.
    fn kind(&self) -> PacketKind;

    /// The connection state the packet belongs to.
    fn state(&self) -> ConnectionState;

    /// The direction the packet flows in.
    fn direction(&self) -> Direction;

    /// Write the packet to a buffer.
    ///
    /// # Errors
    ///
    /// See [`Packet::encode`].
    fn encode_dyn(&self, buf: &mut Buffer, version: ProtocolVersion) -> Result<()>;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

impl<P: Packet> AnyPacket for P {
    fn kind(&self) -> PacketKind {
        P::KIND
    }

    fn state(&self) -> ConnectionState {
        P::STATE
    }

    fn direction(&self) -> Direction {
        P::DIRECTION
    }

    fn encode_dyn(&self, buf: &mut Buffer, version: ProtocolVersion) -> Result<()> {
        self.encode(buf, version)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn AnyPacket {
    /// Borrow the packet as `P` if it is of that kind.
    #[must_use]
    pub fn downcast_ref<P: Packet>(&self) -> Option<&P> {
        if self.kind() != P::KIND {
            return None;
        }
        self.as_any().downcast_ref::<P>()
    }

    /// Whether the packet is of kind `P`.
    #[must_use]
    pub fn is<P: Packet>(&self) -> bool {
        self.kind() == P::KIND
    }
}

/// Constructor stored in the registry for each inbound kind.
pub type DecodeFn = fn(&mut Buffer, ProtocolVersion) -> Result<Box<dyn AnyPacket>>;

/// Decode a `P` and box it behind [`AnyPacket`].
pub(crate) fn decode_boxed<P: Packet>(
    buf: &mut Buffer,
    version: ProtocolVersion,
) -> Result<Box<dyn AnyPacket>> {
    Ok(Box::new(P::decode(buf, version)?))
}
