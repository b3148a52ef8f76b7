//! Connection states and packet directions.

use std::fmt;

/// The connection state a packet belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// Handshaking state (initial connection).
    Handshaking = 0,
    /// Status state (server list ping).
    Status = 1,
    /// Login state (authentication).
    Login = 2,
    /// Play state (in-game).
    Play = 3,
}

impl ConnectionState {
    /// All states, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Handshaking, Self::Status, Self::Login, Self::Play];

    /// Whether a connection in `self` may move to `next`.
    ///
    /// `Status` and `Login` are only reachable from `Handshaking`, `Play`
    /// only from `Login`. Nothing moves backwards.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Handshaking, Self::Status | Self::Login) | (Self::Login, Self::Play)
        )
    }

    /// Recover a state from its `repr(u8)` discriminant.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Handshaking),
            1 => Some(Self::Status),
            2 => Some(Self::Login),
            3 => Some(Self::Play),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Handshaking => "handshaking",
            Self::Status => "status",
            Self::Login => "login",
            Self::Play => "play",
        };
        f.write_str(name)
    }
}

/// Flow direction of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    /// Client -> server.
    ServerBound,
    /// Server -> client.
    ClientBound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerBound => f.write_str("serverbound"),
            Self::ClientBound => f.write_str("clientbound"),
        }
    }
}
