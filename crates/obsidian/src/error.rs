//! Error types for connections and the server lifecycle.

use std::io;

use obsidian_mc::{ConnectionState, PacketKind, ProtocolError};
use thiserror::Error;

/// Errors raised on a single connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Framing, decode, encode or registry failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Socket I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A state change the lifecycle does not allow.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: ConnectionState,
        /// Requested state.
        to: ConnectionState,
    },

    /// An outbound packet does not belong to the connection's current state.
    #[error("cannot send {kind} in {actual} (belongs to {expected})")]
    WrongState {
        /// Kind of the rejected packet.
        kind: PacketKind,
        /// State the packet belongs to.
        expected: ConnectionState,
        /// State the connection is in.
        actual: ConnectionState,
    },

    /// A serverbound packet was passed to a send call.
    #[error("cannot send serverbound packet {kind}")]
    WrongDirection {
        /// Kind of the rejected packet.
        kind: PacketKind,
    },

    /// No frame arrived before the read deadline.
    #[error("read timed out")]
    TimedOut,

    /// A frame could not be written before the write deadline.
    #[error("write timed out")]
    WriteTimedOut,

    /// The connection has already been closed.
    #[error("connection closed")]
    Closed,
}

impl ConnectionError {
    /// Whether the stream can no longer be trusted and must be dropped
    /// without a goodbye.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Protocol(_) | Self::Io(_) | Self::WriteTimedOut | Self::Closed
        )
    }

    /// Whether this is the connection being closed on purpose rather than a fault.
    #[must_use]
    pub const fn is_expected_close(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Errors returned by [`Server`](crate::Server) lifecycle calls.
#[derive(Debug, Error)]
pub enum ServerError {
    /// `start` was called while the server is listening.
    #[error("server is already running")]
    AlreadyRunning,

    /// `stop` was called while the server is not listening.
    #[error("server is already stopped")]
    AlreadyStopped,

    /// Binding the listener failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
