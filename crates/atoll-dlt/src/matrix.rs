//! Dense token-by-slot grid of node ordinals.

use atoll_types::MAX_NODES;

use crate::error::{DltError, RangeKind};

/// Placement decision for every `(token, slot)` pair.
///
/// Cells are stored token-major, one byte per cell, in the same order the
/// wire format uses, so encoding is a single copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementMatrix {
    num_tokens: u32,
    depth: u32,
    /// Exclusive bound for ordinals (size of the owning node table).
    node_count: usize,
    cells: Vec<u8>,
}

impl PlacementMatrix {
    /// Create a matrix with every cell set to ordinal 0.
    ///
    /// Ordinals are one byte, so `node_count` above [`MAX_NODES`] fails with
    /// [`DltError::CapacityExceeded`]. A grid too large to allocate fails
    /// with [`DltError::InvalidHeader`].
    pub fn new(num_tokens: u32, depth: u32, node_count: usize) -> Result<Self, DltError> {
        if node_count > MAX_NODES {
            return Err(DltError::CapacityExceeded {
                count: node_count,
                max: MAX_NODES,
            });
        }

        let too_large = |reason: String| {
            DltError::InvalidHeader(format!(
                "cannot allocate {num_tokens} x {depth} placement cells: {reason}"
            ))
        };
        let len = (num_tokens as usize)
            .checked_mul(depth as usize)
            .ok_or_else(|| too_large("size overflows".to_string()))?;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|e| too_large(e.to_string()))?;
        cells.resize(len, 0);

        Ok(Self {
            num_tokens,
            depth,
            node_count,
            cells,
        })
    }

    /// Adopt decoded cells, rejecting any ordinal outside the node table.
    pub(crate) fn from_cells(
        num_tokens: u32,
        depth: u32,
        node_count: usize,
        cells: Vec<u8>,
    ) -> Result<Self, DltError> {
        if node_count > MAX_NODES {
            return Err(DltError::MalformedTable(format!(
                "node count {node_count} exceeds {MAX_NODES}"
            )));
        }
        let expected = num_tokens as usize * depth as usize;
        if cells.len() != expected {
            return Err(DltError::MalformedTable(format!(
                "placement has {} cells, expected {expected}",
                cells.len()
            )));
        }
        if let Some(index) = cells.iter().position(|&o| o as usize >= node_count) {
            let depth = depth as usize;
            return Err(DltError::MalformedTable(format!(
                "token {} slot {} references ordinal {} but only {node_count} nodes exist",
                index / depth,
                index % depth,
                cells[index]
            )));
        }
        Ok(Self {
            num_tokens,
            depth,
            node_count,
            cells,
        })
    }

    /// Assign `ordinal` to one cell. On error nothing is modified.
    pub fn set(&mut self, token: usize, slot: usize, ordinal: usize) -> Result<(), DltError> {
        let index = self.index(token, slot)?;
        if ordinal >= self.node_count {
            return Err(DltError::out_of_range(
                RangeKind::Ordinal,
                ordinal,
                self.node_count,
            ));
        }
        self.cells[index] = ordinal as u8;
        Ok(())
    }

    /// Read one cell.
    pub fn get(&self, token: usize, slot: usize) -> Result<u8, DltError> {
        let index = self.index(token, slot)?;
        Ok(self.cells[index])
    }

    /// All ordinals of one token, in slot order.
    pub fn row(&self, token: usize) -> Result<&[u8], DltError> {
        self.check_token(token)?;
        let depth = self.depth as usize;
        let start = token * depth;
        Ok(&self.cells[start..start + depth])
    }

    /// Iterate `(token, row)` pairs in token order.
    pub fn rows(&self) -> impl Iterator<Item = (u32, &[u8])> {
        // depth >= 1 for every constructed table.
        self.cells
            .chunks_exact(self.depth.max(1) as usize)
            .enumerate()
            .map(|(token, row)| (token as u32, row))
    }

    /// Number of tokens (rows).
    pub fn num_tokens(&self) -> u32 {
        self.num_tokens
    }

    /// Number of replica slots per token (columns).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Raw token-major cells.
    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }

    fn check_token(&self, token: usize) -> Result<(), DltError> {
        if token >= self.num_tokens as usize {
            return Err(DltError::out_of_range(
                RangeKind::Token,
                token,
                self.num_tokens as usize,
            ));
        }
        Ok(())
    }

    fn index(&self, token: usize, slot: usize) -> Result<usize, DltError> {
        self.check_token(token)?;
        let depth = self.depth as usize;
        if slot >= depth {
            return Err(DltError::out_of_range(RangeKind::Slot, slot, depth));
        }
        Ok(token * depth + slot)
    }
}
