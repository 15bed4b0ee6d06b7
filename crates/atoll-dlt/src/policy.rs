//! Replica-list validation policies.

use crate::error::DltError;
use crate::matrix::PlacementMatrix;

/// How strictly a table's replica lists are checked before it is accepted.
///
/// The matrix itself never enforces distinctness; callers opt in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplicaPolicy {
    /// Any ordinal may appear in any slot, including repeats within a token.
    #[default]
    AllowDuplicates,
    /// Every token's replica slots must name different nodes.
    DistinctReplicas,
}

impl ReplicaPolicy {
    /// Check every token of `matrix` against this policy.
    pub fn check(&self, matrix: &PlacementMatrix) -> Result<(), DltError> {
        match self {
            Self::AllowDuplicates => Ok(()),
            Self::DistinctReplicas => {
                for (token, row) in matrix.rows() {
                    let mut seen = [false; 256];
                    for &ordinal in row {
                        if seen[ordinal as usize] {
                            return Err(DltError::DuplicateReplica { token, ordinal });
                        }
                        seen[ordinal as usize] = true;
                    }
                }
                Ok(())
            }
        }
    }
}
