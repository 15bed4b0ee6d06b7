//! Error types for the DLT crate.

use std::fmt;

/// Which bounds-checked dimension an [`DltError::OutOfRange`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    /// A token index (`0..num_tokens`).
    Token,
    /// A replica slot (`0..depth`).
    Slot,
    /// A node ordinal (`0..node_count`).
    Ordinal,
}

impl fmt::Display for RangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Token => "token",
            Self::Slot => "slot",
            Self::Ordinal => "ordinal",
        };
        f.write_str(name)
    }
}

/// Errors produced while building, querying, encoding or storing a DLT.
#[derive(Debug, thiserror::Error)]
pub enum DltError {
    /// Header fields are internally inconsistent.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A token, slot or ordinal argument is outside its valid domain.
    #[error("{kind} {value} out of range (limit {limit})")]
    OutOfRange {
        /// Which dimension was violated.
        kind: RangeKind,
        /// The offending value.
        value: u64,
        /// Exclusive upper bound.
        limit: u64,
    },

    /// A serialized table is truncated or structurally inconsistent.
    ///
    /// The buffer must be discarded; no partial table is ever produced.
    #[error("malformed table: {0}")]
    MalformedTable(String),

    /// More node identifiers than one-byte ordinals can address.
    #[error("node table capacity exceeded: {count} nodes supplied, at most {max} allowed")]
    CapacityExceeded {
        /// Number of identifiers supplied.
        count: usize,
        /// The capacity bound.
        max: usize,
    },

    /// The same node occupies two replica slots of one token.
    #[error("token {token} assigns ordinal {ordinal} to more than one replica slot")]
    DuplicateReplica {
        /// Token whose replica list repeats a node.
        token: u32,
        /// The repeated ordinal.
        ordinal: u8,
    },

    /// Two different tables claim the same version.
    #[error("version conflict: a different table with version {version} is already active")]
    VersionConflict {
        /// The contested version.
        version: u64,
    },

    /// A query was made before any table was installed.
    #[error("no active table installed")]
    NoActiveTable,

    /// Snapshot store I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DltError {
    pub(crate) fn out_of_range(kind: RangeKind, value: usize, limit: usize) -> Self {
        Self::OutOfRange {
            kind,
            value: value as u64,
            limit: limit as u64,
        }
    }

    /// Whether this error is a bounds violation of the given kind.
    pub fn is_out_of_range(&self, expected: RangeKind) -> bool {
        matches!(self, Self::OutOfRange { kind, .. } if *kind == expected)
    }
}
