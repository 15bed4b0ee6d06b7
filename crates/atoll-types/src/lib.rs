//! Shared types and wire constants for Atoll.
//!
//! This crate defines the identifiers and format constants used across the
//! Atoll workspace: the storage-node identifier [`NodeId`] and the fixed
//! limits of the Distributed Location Table wire format.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Wire constants
// ---------------------------------------------------------------------------

/// Maximum number of nodes one table generation can reference.
///
/// Ordinals are encoded as a single byte in the placement matrix.
pub const MAX_NODES: usize = 256;

/// Size of the fixed DLT header: version (8) + four 32-bit fields (16).
pub const DLT_HEADER_LEN: usize = 24;

/// Size of one encoded node identifier.
pub const NODE_ID_LEN: usize = 8;

/// Largest supported `num_bits_for_token` (`num_tokens` is a 32-bit field).
pub const MAX_TOKEN_BITS: u32 = 31;

// ---------------------------------------------------------------------------
// ID types
// ---------------------------------------------------------------------------

/// Identifier for a storage node.
///
/// On the wire this is the most-significant 64 bits of the node's 128-bit
/// UUID. Widening it requires a new table format version.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Create an ID from its raw 64-bit value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Derive an ID by hashing arbitrary data (e.g. a hostname) with BLAKE3.
    pub fn from_data(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        let mut raw = [0u8; NODE_ID_LEN];
        raw.copy_from_slice(&hash.as_bytes()[..NODE_ID_LEN]);
        Self(u64::from_be_bytes(raw))
    }

    /// Return the raw 64-bit value.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Big-endian wire encoding.
    pub const fn to_be_bytes(&self) -> [u8; NODE_ID_LEN] {
        self.0.to_be_bytes()
    }

    /// Decode from the big-endian wire encoding.
    pub const fn from_be_bytes(bytes: [u8; NODE_ID_LEN]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<NodeId> for u64 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({self})")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
