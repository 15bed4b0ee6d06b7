//! TOML configuration for `atollctl`.
//!
//! Every section is optional; a missing file means all defaults.

use std::path::{Path, PathBuf};

use atoll_dlt::ReplicaPolicy;
use serde::Deserialize;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Snapshot store location.
    pub store: StoreSection,
    /// Placement checks.
    pub placement: PlacementSection,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[store]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Directory holding `dlt-<version>.bin` snapshots.
    pub dir: PathBuf,
    /// Generations kept by `snapshots prune` when `--keep` is not given.
    pub keep: usize,
}

impl Default for StoreSection {
    fn default() -> Self {
        let dir = dirs::home_dir()
            .map(|h| h.join(".atoll").join("dlt"))
            .unwrap_or_else(|| PathBuf::from(".atoll/dlt"));
        Self { dir, keep: 3 }
    }
}

/// Replica validation policy as written in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyName {
    /// Accept repeated nodes within one token.
    #[default]
    AllowDuplicates,
    /// Require distinct nodes per token.
    Distinct,
}

impl From<PolicyName> for ReplicaPolicy {
    fn from(name: PolicyName) -> Self {
        match name {
            PolicyName::AllowDuplicates => ReplicaPolicy::AllowDuplicates,
            PolicyName::Distinct => ReplicaPolicy::DistinctReplicas,
        }
    }
}

/// `[placement]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PlacementSection {
    /// Policy applied by `verify` and `import`.
    pub replica_policy: PolicyName,
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or use defaults if no path given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                Self::from_toml(&content)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string.
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Effective replica policy.
    pub fn replica_policy(&self) -> ReplicaPolicy {
        self.placement.replica_policy.into()
    }
}
