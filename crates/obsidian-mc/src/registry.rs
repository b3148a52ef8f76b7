//! Versioned mapping between packet kinds and wire IDs.
//!
//! Tables are built once at startup, in order:
//!
//! ```text
//! register_baseline(table)            -> ProtocolVersion::UNKNOWN
//! register_version(v, overrides)*     -> deep copy of baseline + overrides
//! alias_versions(v, [v2, v3, ...])*   -> v2, v3 share v's table
//! ```
//!
//! After that the registry is shared immutably (usually behind an `Arc`)
//! and every lookup is a pair of hash probes with no locking.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::buffer::Buffer;
use crate::packets::traits::{AnyPacket, DecodeFn, Packet, PacketKind, decode_boxed};
use crate::state::{ConnectionState, Direction};
use crate::version::ProtocolVersion;

/// Errors raised while building or querying a [`PacketRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No ID is registered for a kind (outbound lookup).
    #[error("no packet id for {kind} in {version} {state}/{direction}")]
    NoMapping {
        /// Version queried.
        version: ProtocolVersion,
        /// State queried.
        state: ConnectionState,
        /// Direction queried.
        direction: Direction,
        /// Kind queried.
        kind: PacketKind,
    },

    /// No kind is registered for an ID (inbound lookup).
    #[error("unknown packet id {id:#04x} in {version} {state}/{direction}")]
    UnknownPacketId {
        /// Version queried.
        version: ProtocolVersion,
        /// State queried.
        state: ConnectionState,
        /// Direction queried.
        direction: Direction,
        /// ID queried.
        id: i32,
    },

    /// Two kinds in one table resolve to the same ID.
    #[error("{kind} and {existing} both map to id {id:#04x} in {version} {state}/{direction}")]
    DuplicateId {
        /// Version being registered.
        version: ProtocolVersion,
        /// State of the clash.
        state: ConnectionState,
        /// Direction of the clash.
        direction: Direction,
        /// The contested ID.
        id: i32,
        /// The clashing kind whose name sorts first.
        existing: PacketKind,
        /// The other clashing kind.
        kind: PacketKind,
    },

    /// The baseline was registered twice.
    #[error("baseline table already registered")]
    BaselineAlreadyRegistered,

    /// A version was registered before the baseline.
    #[error("baseline table must be registered before {0}")]
    MissingBaseline(ProtocolVersion),

    /// An alias named a source version with no table.
    #[error("no table registered for {0}")]
    UnknownVersion(ProtocolVersion),

    /// The baseline sentinel was used as a version-specific key.
    #[error("{0} is reserved for the baseline table")]
    ReservedVersion(ProtocolVersion),
}

/// One registered kind inside a table.
#[derive(Clone, Copy)]
struct KindEntry {
    id: i32,
    decode: DecodeFn,
}

/// A (state, direction) → {kind → id} map used as registration input.
///
/// Entries are keyed by each packet's own state and direction, so a table
/// cannot file a packet under the wrong section.
#[derive(Clone, Default)]
pub struct PacketTable {
    sections: HashMap<(ConnectionState, Direction), HashMap<PacketKind, KindEntry>>,
}

impl PacketTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map packet type `P` to `id`, replacing any previous ID for `P`.
    #[must_use]
    pub fn with<P: Packet>(mut self, id: i32) -> Self {
        self.insert::<P>(id);
        self
    }

    /// Map packet type `P` to `id`, replacing any previous ID for `P`.
    pub fn insert<P: Packet>(&mut self, id: i32) {
        self.sections
            .entry((P::STATE, P::DIRECTION))
            .or_default()
            .insert(
                P::KIND,
                KindEntry {
                    id,
                    decode: decode_boxed::<P>,
                },
            );
    }

    /// Number of kinds across all sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.values().map(HashMap::len).sum()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Both directions of the mapping for one (state, direction).
#[derive(Clone, Default)]
struct Section {
    by_kind: HashMap<PacketKind, KindEntry>,
    by_id: HashMap<i32, PacketKind>,
}

/// The fully resolved table for one protocol version.
#[derive(Clone, Default)]
pub struct VersionTable {
    sections: HashMap<(ConnectionState, Direction), Section>,
}

impl VersionTable {
    /// Build a resolved table from `base` overlaid with `overrides`.
    ///
    /// Overrides replace at (state, direction, kind) granularity; every
    /// other baseline entry is kept. The inverse ID map is derived here and
    /// must be exact.
    fn resolve(
        version: ProtocolVersion,
        base: Option<&Self>,
        overrides: PacketTable,
    ) -> Result<Self, RegistryError> {
        let mut merged: HashMap<(ConnectionState, Direction), HashMap<PacketKind, KindEntry>> =
            base.map_or_else(HashMap::new, |base| {
                base.sections
                    .iter()
                    .map(|(key, section)| (*key, section.by_kind.clone()))
                    .collect()
            });

        for (key, entries) in overrides.sections {
            merged.entry(key).or_default().extend(entries);
        }

        let mut sections = HashMap::with_capacity(merged.len());
        for ((state, direction), by_kind) in merged {
            let mut by_id = HashMap::with_capacity(by_kind.len());
            for (&kind, entry) in &by_kind {
                match by_id.entry(entry.id) {
                    Entry::Vacant(slot) => {
                        slot.insert(kind);
                    }
                    Entry::Occupied(slot) => {
                        // Report the pair in a stable order regardless of hash iteration.
                        let (existing, kind) = if *slot.get() < kind {
                            (*slot.get(), kind)
                        } else {
                            (kind, *slot.get())
                        };
                        return Err(RegistryError::DuplicateId {
                            version,
                            state,
                            direction,
                            id: entry.id,
                            existing,
                            kind,
                        });
                    }
                }
            }
            sections.insert((state, direction), Section { by_kind, by_id });
        }

        Ok(Self { sections })
    }

    fn section(&self, state: ConnectionState, direction: Direction) -> Option<&Section> {
        self.sections.get(&(state, direction))
    }

    /// Every (state, direction, kind, id) in the table.
    pub fn entries(
        &self,
    ) -> impl Iterator<Item = (ConnectionState, Direction, PacketKind, i32)> + '_ {
        self.sections.iter().flat_map(|(&(state, direction), section)| {
            section
                .by_kind
                .iter()
                .map(move |(&kind, entry)| (state, direction, kind, entry.id))
        })
    }

    /// Number of kinds across all sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.values().map(|s| s.by_kind.len()).sum()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-wide packet registry, keyed by protocol version.
#[derive(Clone, Default)]
pub struct PacketRegistry {
    tables: HashMap<ProtocolVersion, Arc<VersionTable>>,
}

impl fmt::Debug for PacketRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketRegistry")
            .field("baseline", &self.supports(ProtocolVersion::UNKNOWN))
            .field("versions", &self.versions())
            .finish()
    }
}

impl PacketRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the baseline table under [`ProtocolVersion::UNKNOWN`].
    ///
    /// # Errors
    ///
    /// Fails if a baseline already exists or the table maps two kinds to
    /// one ID.
    pub fn register_baseline(&mut self, table: PacketTable) -> Result<(), RegistryError> {
        if self.tables.contains_key(&ProtocolVersion::UNKNOWN) {
            return Err(RegistryError::BaselineAlreadyRegistered);
        }

        let resolved = VersionTable::resolve(ProtocolVersion::UNKNOWN, None, table)?;
        self.tables.insert(ProtocolVersion::UNKNOWN, Arc::new(resolved));
        Ok(())
    }

    /// Register `version` as a deep copy of the baseline with `overrides` merged on top.
    ///
    /// On error the registry is left exactly as it was, including any
    /// earlier table for `version`.
    ///
    /// # Errors
    ///
    /// Fails if no baseline is registered, `version` is the baseline
    /// sentinel, or the merge maps two kinds to one ID.
    pub fn register_version(
        &mut self,
        version: ProtocolVersion,
        overrides: PacketTable,
    ) -> Result<(), RegistryError> {
        if version.is_unknown() {
            return Err(RegistryError::ReservedVersion(version));
        }
        let base = self
            .tables
            .get(&ProtocolVersion::UNKNOWN)
            .ok_or(RegistryError::MissingBaseline(version))?;

        let resolved = VersionTable::resolve(version, Some(base), overrides)?;
        self.tables.insert(version, Arc::new(resolved));
        Ok(())
    }

    /// Make each of `targets` share the resolved table of `source`.
    ///
    /// # Errors
    ///
    /// Fails if `source` has no table or a target is the baseline sentinel.
    /// No target is aliased unless all of them can be.
    pub fn alias_versions(
        &mut self,
        source: ProtocolVersion,
        targets: &[ProtocolVersion],
    ) -> Result<(), RegistryError> {
        let table = self
            .tables
            .get(&source)
            .cloned()
            .ok_or(RegistryError::UnknownVersion(source))?;

        if let Some(&reserved) = targets.iter().find(|v| v.is_unknown()) {
            return Err(RegistryError::ReservedVersion(reserved));
        }

        for &target in targets {
            self.tables.insert(target, Arc::clone(&table));
        }
        Ok(())
    }

    /// Whether a table exists for `version`.
    #[must_use]
    pub fn supports(&self, version: ProtocolVersion) -> bool {
        self.tables.contains_key(&version)
    }

    /// All versions with a table, excluding the baseline, in ascending order.
    #[must_use]
    pub fn versions(&self) -> Vec<ProtocolVersion> {
        let mut versions: Vec<_> = self
            .tables
            .keys()
            .copied()
            .filter(|v| !v.is_unknown())
            .collect();
        versions.sort_unstable();
        versions
    }

    /// The resolved table for `version`.
    #[must_use]
    pub fn table(&self, version: ProtocolVersion) -> Option<&VersionTable> {
        self.tables.get(&version).map(|table| table.as_ref())
    }

    /// Whether two versions share one table allocation.
    #[must_use]
    pub fn shares_table(&self, a: ProtocolVersion, b: ProtocolVersion) -> bool {
        match (self.tables.get(&a), self.tables.get(&b)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Resolve the ID of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoMapping`] if the version, section or kind
    /// is absent.
    pub fn lookup_id(
        &self,
        version: ProtocolVersion,
        state: ConnectionState,
        direction: Direction,
        kind: PacketKind,
    ) -> Result<i32, RegistryError> {
        self.tables
            .get(&version)
            .and_then(|table| table.section(state, direction))
            .and_then(|section| section.by_kind.get(&kind))
            .map(|entry| entry.id)
            .ok_or(RegistryError::NoMapping {
                version,
                state,
                direction,
                kind,
            })
    }

    /// Resolve the kind registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownPacketId`] if the version, section or
    /// ID is absent.
    pub fn lookup_kind(
        &self,
        version: ProtocolVersion,
        state: ConnectionState,
        direction: Direction,
        id: i32,
    ) -> Result<PacketKind, RegistryError> {
        self.find_kind(version, state, direction, id)
            .map(|(kind, _)| kind)
    }

    /// Look up `id` and decode the packet it names from `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownPacketId`] (wrapped) if the ID is not
    /// registered, or the decode error of the packet itself.
    pub fn decode(
        &self,
        version: ProtocolVersion,
        state: ConnectionState,
        direction: Direction,
        id: i32,
        buf: &mut Buffer,
    ) -> crate::Result<Box<dyn AnyPacket>> {
        let (_, entry) = self.find_kind(version, state, direction, id)?;
        (entry.decode)(buf, version)
    }

    fn find_kind(
        &self,
        version: ProtocolVersion,
        state: ConnectionState,
        direction: Direction,
        id: i32,
    ) -> Result<(PacketKind, KindEntry), RegistryError> {
        self.tables
            .get(&version)
            .and_then(|table| table.section(state, direction))
            .and_then(|section| {
                let kind = *section.by_id.get(&id)?;
                section.by_kind.get(&kind).map(|entry| (kind, *entry))
            })
            .ok_or(RegistryError::UnknownPacketId {
                version,
                state,
                direction,
                id,
            })
    }
}
