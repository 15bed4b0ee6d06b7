//! Process-wide handle to the currently active table generation.
//!
//! [`ActiveDlt`] is the single place a node keeps "the" DLT. Installing a new
//! generation swaps one `Arc`; readers clone the `Arc` they saw and keep
//! using that generation until they drop it, so a topology change only
//! affects operations that start after the swap.

use std::sync::Arc;

use atoll_types::NodeId;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::dlt::Dlt;
use crate::error::DltError;
use crate::hasher::TokenHasher;

/// Result of [`ActiveDlt::install`].
#[derive(Debug, Clone)]
pub enum InstallOutcome {
    /// The table is now active.
    Installed {
        /// Version of the table it replaced, if any.
        previous: Option<u64>,
    },
    /// The table was not newer than the active one and was ignored.
    Stale {
        /// Version of the table that stays active.
        active: u64,
    },
}

impl InstallOutcome {
    /// Whether the offered table became active.
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed { .. })
    }
}

/// Single-writer, multi-reader holder of the active table.
///
/// Built on a `watch` channel: the value is swapped atomically and
/// subscribers are woken on every successful install.
#[derive(Debug)]
pub struct ActiveDlt {
    tx: watch::Sender<Option<Arc<Dlt>>>,
}

impl Default for ActiveDlt {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveDlt {
    /// Create an empty handle with no table installed.
    pub fn new() -> Self {
        Self {
            tx: watch::Sender::new(None),
        }
    }

    /// Create a handle with `dlt` already active.
    pub fn with_table(dlt: impl Into<Arc<Dlt>>) -> Self {
        Self {
            tx: watch::Sender::new(Some(dlt.into())),
        }
    }

    /// Make `dlt` the active table if its version is strictly greater.
    ///
    /// Re-offering the active table is [`InstallOutcome::Stale`]. Offering a
    /// *different* table with the active version is a
    /// [`DltError::VersionConflict`]: two tables sharing a version must be
    /// identical.
    pub fn install(&self, dlt: impl Into<Arc<Dlt>>) -> Result<InstallOutcome, DltError> {
        let dlt = dlt.into();
        let version = dlt.version();
        let mut outcome = Ok(InstallOutcome::Installed { previous: None });

        self.tx.send_if_modified(|current| {
            if let Some(active) = current.as_ref() {
                let active_version = active.version();
                if version < active_version || (version == active_version && **active == *dlt) {
                    outcome = Ok(InstallOutcome::Stale {
                        active: active_version,
                    });
                    return false;
                }
                if version == active_version {
                    outcome = Err(DltError::VersionConflict { version });
                    return false;
                }
                outcome = Ok(InstallOutcome::Installed {
                    previous: Some(active_version),
                });
            }
            *current = Some(Arc::clone(&dlt));
            true
        });

        match &outcome {
            Ok(InstallOutcome::Installed { previous }) => {
                info!(version, previous = ?previous, "installed table");
            }
            Ok(InstallOutcome::Stale { active }) => {
                warn!(version, active, "ignored table that does not supersede the active one");
            }
            Err(e) => {
                warn!(version, %e, "rejected table");
            }
        }
        outcome
    }

    /// The active table, if any. Hold the `Arc` for the whole operation.
    pub fn current(&self) -> Option<Arc<Dlt>> {
        self.tx.borrow().clone()
    }

    /// Version of the active table, if any.
    pub fn version(&self) -> Option<u64> {
        self.tx.borrow().as_ref().map(|dlt| dlt.version())
    }

    /// Whether `version` would supersede the active table.
    pub fn supersedes(&self, version: u64) -> bool {
        self.version().is_none_or(|active| version > active)
    }

    /// Replica nodes for `key` according to the active table.
    pub fn resolve(&self, hasher: &impl TokenHasher, key: &[u8]) -> Result<Vec<NodeId>, DltError> {
        let dlt = self.current().ok_or(DltError::NoActiveTable)?;
        dlt.resolve(hasher, key)
    }

    /// Receive a notification every time a new table is installed.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Dlt>>> {
        self.tx.subscribe()
    }
}
