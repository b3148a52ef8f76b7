//! Protocol version definitions.
//!
//! This module provides [`ProtocolVersion`], the identifier a client
//! declares in its handshake and the key under which packet tables are
//! registered.

use std::fmt;

/// Minecraft protocol version.
///
/// Versions are plain protocol numbers so extension code can register
/// tables for releases this crate does not name. [`ProtocolVersion::UNKNOWN`]
/// is the sentinel used before the handshake has been read, and the key of
/// the baseline packet table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion(i32);

impl ProtocolVersion {
    /// Undetermined version (pre-handshake, baseline table).
    pub const UNKNOWN: Self = Self(-1);

    /// Protocol version 735 (Minecraft 1.16)
    pub const V1_16: Self = Self(735);

    /// Protocol version 736 (Minecraft 1.16.1)
    pub const V1_16_1: Self = Self(736);

    /// Protocol version 751 (Minecraft 1.16.2)
    pub const V1_16_2: Self = Self(751);

    /// Protocol version 753 (Minecraft 1.16.3)
    pub const V1_16_3: Self = Self(753);

    /// Protocol version 754 (Minecraft 1.16.4/1.16.5)
    pub const V1_16_4: Self = Self(754);

    /// Create a `ProtocolVersion` from a raw protocol version number.
    #[must_use]
    pub const fn from_raw(version: i32) -> Self {
        Self(version)
    }

    /// Get the raw protocol version number.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self.0
    }

    /// Whether this is the [`UNKNOWN`](Self::UNKNOWN) sentinel.
    #[must_use]
    pub const fn is_unknown(self) -> bool {
        self.0 == Self::UNKNOWN.0
    }

    /// Gets a list of human-readable version names (e.g., `["1.16.5", "1.16.4"]`).
    ///
    /// Returns an empty slice for versions this crate does not name.
    #[must_use]
    pub const fn names(self) -> &'static [&'static str] {
        match self.0 {
            735 => &["1.16"],
            736 => &["1.16.1"],
            751 => &["1.16.2"],
            753 => &["1.16.3"],
            754 => &["1.16.5", "1.16.4"],
            _ => &[],
        }
    }

    /// Gets the primary version name (e.g., "1.16.5"), if known.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        match self.names() {
            [first, ..] => Some(*first),
            [] => None,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            return f.write_str("unknown");
        }
        match self.name() {
            Some(name) => write!(f, "{} ({name})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v1_16_4() {
        let version = ProtocolVersion::from_raw(754);
        assert_eq!(version, ProtocolVersion::V1_16_4);
        assert_eq!(version.as_raw(), 754);
        assert_eq!(version.names(), &["1.16.5", "1.16.4"]);
        assert_eq!(version.name(), Some("1.16.5"));
    }

    #[test]
    fn test_unknown_version() {
        assert!(ProtocolVersion::UNKNOWN.is_unknown());
        assert!(!ProtocolVersion::V1_16.is_unknown());
        assert!(ProtocolVersion::from_raw(999).name().is_none());
    }

    #[test]
    fn test_ordering() {
        assert!(ProtocolVersion::UNKNOWN < ProtocolVersion::V1_16);
        assert!(ProtocolVersion::V1_16 < ProtocolVersion::V1_16_1);
        assert!(ProtocolVersion::V1_16_3 < ProtocolVersion::V1_16_4);
    }

    #[test]
    fn test_display() {
        assert_eq!(ProtocolVersion::UNKNOWN.to_string(), "unknown");
        assert_eq!(ProtocolVersion::V1_16_2.to_string(), "751 (1.16.2)");
        assert_eq!(ProtocolVersion::from_raw(42).to_string(), "42");
    }
}
