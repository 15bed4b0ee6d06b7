//! The DLT aggregate: a building form and a frozen, queryable form.
//!
//! [`DltBuilder`] owns a table while the placement policy fills it slot by
//! slot. [`DltBuilder::build`] consumes the builder and yields a [`Dlt`],
//! which has no mutating methods at all and can be shared freely across
//! threads.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;

use atoll_types::{MAX_NODES, MAX_TOKEN_BITS, NodeId};
use bytes::Bytes;
use tracing::debug;

use crate::codec;
use crate::error::{DltError, RangeKind};
use crate::hasher::TokenHasher;
use crate::matrix::PlacementMatrix;
use crate::node_table::NodeTable;
use crate::policy::ReplicaPolicy;

/// Fixed header fields of one table generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DltHeader {
    /// Generation stamp; a superseding table has a strictly greater one.
    pub version: u64,
    /// `B`: the keyspace holds `2^B` tokens.
    pub num_bits_for_token: u32,
    /// Replicas per token.
    pub depth: u32,
    /// Must equal `2^num_bits_for_token`.
    pub num_tokens: u32,
}

impl DltHeader {
    /// Describe the first inconsistency in the header, if any.
    pub(crate) fn check(&self) -> Result<(), String> {
        if self.num_bits_for_token > MAX_TOKEN_BITS {
            return Err(format!(
                "num_bits_for_token {} exceeds maximum {MAX_TOKEN_BITS}",
                self.num_bits_for_token
            ));
        }
        let expected = 1u32 << self.num_bits_for_token;
        if self.num_tokens != expected {
            return Err(format!(
                "num_tokens {} != 2^{} ({expected})",
                self.num_tokens, self.num_bits_for_token
            ));
        }
        if self.depth == 0 {
            return Err("depth must be at least 1".to_string());
        }
        // A replica list never needs more slots than there are ordinals.
        if self.depth as usize > MAX_NODES {
            return Err(format!(
                "depth {} exceeds maximum {MAX_NODES}",
                self.depth
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Building state
// ---------------------------------------------------------------------------

/// A table under construction.
///
/// Header and node table are fixed at creation; every placement cell starts
/// at ordinal 0. The builder is single-owner and deliberately not `Sync`.
#[derive(Debug)]
pub struct DltBuilder {
    header: DltHeader,
    nodes: NodeTable,
    matrix: PlacementMatrix,
    _not_sync: PhantomData<Cell<()>>,
}

impl DltBuilder {
    /// Start a new table generation.
    ///
    /// Fails with [`DltError::InvalidHeader`] when `num_tokens` is not
    /// `2^num_bits_for_token`, when `depth` is 0 or above 256, when no nodes
    /// are given or when the placement grid cannot be allocated,
    /// and with [`DltError::CapacityExceeded`] for more than 256 nodes.
    pub fn create(
        version: u64,
        num_bits_for_token: u32,
        depth: u32,
        num_tokens: u32,
        nodes: Vec<NodeId>,
    ) -> Result<Self, DltError> {
        let header = DltHeader {
            version,
            num_bits_for_token,
            depth,
            num_tokens,
        };
        header.check().map_err(DltError::InvalidHeader)?;

        let nodes = NodeTable::new(nodes)?;
        if nodes.is_empty() {
            return Err(DltError::InvalidHeader(
                "node table must contain at least one node".to_string(),
            ));
        }

        let matrix = PlacementMatrix::new(num_tokens, depth, nodes.len())?;
        debug!(
            version,
            num_bits_for_token,
            depth,
            node_count = nodes.len(),
            "created table builder"
        );

        Ok(Self {
            header,
            nodes,
            matrix,
            _not_sync: PhantomData,
        })
    }

    /// Assign `ordinal` to replica `slot` of `token`.
    ///
    /// This is the only mutation primitive. A failed call changes nothing.
    pub fn place_token(&mut self, token: usize, slot: usize, ordinal: usize) -> Result<(), DltError> {
        self.matrix.set(token, slot, ordinal)
    }

    /// Current ordinal in one cell.
    pub fn placement(&self, token: usize, slot: usize) -> Result<u8, DltError> {
        self.matrix.get(token, slot)
    }

    /// Header of the table being built.
    pub fn header(&self) -> &DltHeader {
        &self.header
    }

    /// Node table of the table being built.
    pub fn node_table(&self) -> &NodeTable {
        &self.nodes
    }

    /// Freeze the table. No replica-distinctness check is made.
    pub fn build(self) -> Dlt {
        debug!(version = self.header.version, "froze table");
        Dlt {
            header: self.header,
            nodes: self.nodes,
            matrix: self.matrix,
        }
    }

    /// Freeze the table after checking it against `policy`.
    pub fn build_with_policy(self, policy: ReplicaPolicy) -> Result<Dlt, DltError> {
        policy.check(&self.matrix)?;
        Ok(self.build())
    }
}

// ---------------------------------------------------------------------------
// Frozen state
// ---------------------------------------------------------------------------

/// An immutable, queryable table generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dlt {
    header: DltHeader,
    nodes: NodeTable,
    matrix: PlacementMatrix,
}

impl Dlt {
    /// Assemble a decoded table. The parts must already be consistent.
    pub(crate) fn from_parts(header: DltHeader, nodes: NodeTable, matrix: PlacementMatrix) -> Self {
        Self {
            header,
            nodes,
            matrix,
        }
    }

    /// Generation stamp.
    pub fn version(&self) -> u64 {
        self.header.version
    }

    /// `B` such that the table has `2^B` tokens.
    pub fn num_bits_for_token(&self) -> u32 {
        self.header.num_bits_for_token
    }

    /// Replicas per token.
    pub fn depth(&self) -> u32 {
        self.header.depth
    }

    /// Size of the token keyspace.
    pub fn num_tokens(&self) -> u32 {
        self.header.num_tokens
    }

    /// All header fields.
    pub fn header(&self) -> &DltHeader {
        &self.header
    }

    /// The nodes this generation references, in ordinal order.
    pub fn node_table(&self) -> &NodeTable {
        &self.nodes
    }

    /// Number of nodes in the node table.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Raw ordinals of one token in slot order.
    pub fn token_ordinals(&self, token: usize) -> Result<&[u8], DltError> {
        self.matrix.row(token)
    }

    /// Replica nodes of `token` in slot order; slot 0 is the primary.
    pub fn get_token_placement(&self, token: usize) -> Result<Vec<NodeId>, DltError> {
        self.matrix
            .row(token)?
            .iter()
            .map(|&ordinal| self.nodes.identifier_at(ordinal as usize))
            .collect()
    }

    /// Primary replica of `token`.
    pub fn primary(&self, token: usize) -> Result<NodeId, DltError> {
        let ordinal = self.matrix.get(token, 0)?;
        self.nodes.identifier_at(ordinal as usize)
    }

    /// Replica nodes for an object key, hashed with `hasher`.
    pub fn resolve(&self, hasher: &impl TokenHasher, key: &[u8]) -> Result<Vec<NodeId>, DltError> {
        let token = hasher.token(key, self.header.num_bits_for_token);
        if token >= self.header.num_tokens {
            return Err(DltError::out_of_range(
                RangeKind::Token,
                token as usize,
                self.header.num_tokens as usize,
            ));
        }
        self.get_token_placement(token as usize)
    }

    /// Every token that places `node_id` in any replica slot, ascending.
    ///
    /// Empty when the node is not part of this generation. Repeated node
    /// table entries are all taken into account.
    pub fn tokens_for_node(&self, node_id: &NodeId) -> Vec<u32> {
        let mut wanted = [false; 256];
        let mut any = false;
        for (ordinal, n) in self.nodes.iter().enumerate() {
            if n == node_id {
                wanted[ordinal] = true;
                any = true;
            }
        }
        if !any {
            return Vec::new();
        }

        self.matrix
            .rows()
            .filter(|(_, row)| row.iter().any(|&o| wanted[o as usize]))
            .map(|(token, _)| token)
            .collect()
    }

    /// Check replica lists against `policy`.
    pub fn validate(&self, policy: ReplicaPolicy) -> Result<(), DltError> {
        policy.check(&self.matrix)
    }

    /// Raw token-major placement cells.
    pub fn placement_bytes(&self) -> &[u8] {
        self.matrix.as_bytes()
    }

    /// Size of the serialized form in bytes.
    pub fn encoded_len(&self) -> usize {
        codec::encoded_len(self.nodes.len(), self.header.num_tokens, self.header.depth) as usize
    }

    /// Encode to the wire format.
    pub fn serialize(&self) -> Bytes {
        codec::encode(self)
    }

    /// Decode from the wire format.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, DltError> {
        codec::decode(bytes)
    }
}

impl fmt::Display for Dlt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DLT v{} ({} tokens, 2^{}, depth {}, {} nodes)",
            self.header.version,
            self.header.num_tokens,
            self.header.num_bits_for_token,
            self.header.depth,
            self.nodes.len()
        )
    }
}
