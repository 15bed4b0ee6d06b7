//! Ordinal-addressed registry of the nodes referenced by one table.

use atoll_types::{MAX_NODES, NodeId};
use tracing::warn;

use crate::error::{DltError, RangeKind};

/// Ordered sequence of node identifiers owned by a single DLT generation.
///
/// A node's position in the table is its ordinal, the one-byte reference
/// stored in the placement matrix. Input order is authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTable {
    nodes: Vec<NodeId>,
}

impl NodeTable {
    /// Build a node table from identifiers in ordinal order.
    ///
    /// Every entry consumes an ordinal, so more than [`MAX_NODES`] entries
    /// fail with [`DltError::CapacityExceeded`] whether or not they repeat.
    /// Repeated identifiers are accepted but logged.
    pub fn new(nodes: Vec<NodeId>) -> Result<Self, DltError> {
        if nodes.len() > MAX_NODES {
            return Err(DltError::CapacityExceeded {
                count: nodes.len(),
                max: MAX_NODES,
            });
        }

        for (ordinal, node_id) in nodes.iter().enumerate() {
            if let Some(first) = nodes[..ordinal].iter().position(|n| n == node_id) {
                warn!(%node_id, first, ordinal, "duplicate node identifier in node table");
            }
        }

        Ok(Self { nodes })
    }

    /// Reverse lookup: the first ordinal holding `node_id`.
    pub fn ordinal_of(&self, node_id: &NodeId) -> Option<u8> {
        self.nodes
            .iter()
            .position(|n| n == node_id)
            .map(|ordinal| ordinal as u8)
    }

    /// The identifier stored at `ordinal`.
    pub fn identifier_at(&self, ordinal: usize) -> Result<NodeId, DltError> {
        self.nodes
            .get(ordinal)
            .copied()
            .ok_or_else(|| DltError::out_of_range(RangeKind::Ordinal, ordinal, self.nodes.len()))
    }

    /// Number of entries (the exclusive upper bound for ordinals).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the table holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate identifiers in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter()
    }

    /// Identifiers in ordinal order.
    pub fn as_slice(&self) -> &[NodeId] {
        &self.nodes
    }
}
