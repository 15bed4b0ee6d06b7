//! Distributed Location Table (DLT) for deterministic replica placement.
//!
//! A DLT maps a fixed keyspace of `2^B` tokens to ordered lists of `depth`
//! storage nodes. Every cluster member holds the same immutable, versioned
//! table and answers "which nodes hold this key?" locally, without asking a
//! central service.
//!
//! Tables are built with a [`DltBuilder`], frozen into a [`Dlt`], shipped
//! around in the compact binary form produced by [`Dlt::serialize`], and
//! swapped atomically into an [`ActiveDlt`] on every node. Node references
//! inside the placement matrix are one-byte ordinals, which caps a single
//! generation at 256 nodes.

pub mod codec;
mod dlt;
mod error;
mod handle;
mod hasher;
mod matrix;
mod node_table;
mod policy;
mod store;

#[cfg(test)]
mod tests;

pub use dlt::{Dlt, DltBuilder, DltHeader};
pub use error::{DltError, RangeKind};
pub use handle::{ActiveDlt, InstallOutcome};
pub use hasher::{Blake3TokenHasher, TokenHasher};
pub use matrix::PlacementMatrix;
pub use node_table::NodeTable;
pub use policy::ReplicaPolicy;
pub use store::SnapshotStore;
