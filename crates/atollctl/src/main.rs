//! `atollctl` — operator tool for Atoll location tables.
//!
//! Works on serialized DLT files as produced by the placement service or
//! captured off the wire.
//!
//! # Usage
//!
//! ```text
//! atollctl inspect dlt.bin                 # header, nodes, token counts
//! atollctl resolve dlt.bin bucket/key      # replicas for one object key
//! atollctl verify dlt.bin --distinct       # structural + replica checks
//! atollctl import dlt.bin                  # store as a snapshot generation
//! atollctl snapshots list                  # stored generations
//! atollctl snapshots prune --keep 2        # retire old generations
//! ```

mod config;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use atoll_dlt::{Blake3TokenHasher, Dlt, ReplicaPolicy, SnapshotStore, TokenHasher};
use atoll_types::NodeId;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use config::CliConfig;

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "atollctl",
    version,
    about = "Inspect, verify and store Atoll distributed location tables"
)]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true, env = "ATOLL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the header, node table and per-node token counts.
    Inspect {
        /// Serialized table file.
        file: PathBuf,
    },

    /// Show the token and ordered replica nodes for an object key.
    Resolve {
        /// Serialized table file.
        file: PathBuf,
        /// Object key (hashed with BLAKE3 onto the token keyspace).
        key: String,
    },

    /// Decode a table and check its replica lists.
    Verify {
        /// Serialized table file.
        file: PathBuf,
        /// Require distinct nodes per token regardless of config.
        #[arg(long)]
        distinct: bool,
    },

    /// Validate a table and add it to the snapshot store.
    Import {
        /// Serialized table file.
        file: PathBuf,
    },

    /// Snapshot store operations.
    Snapshots {
        #[command(subcommand)]
        action: SnapshotCommands,
    },
}

#[derive(Subcommand)]
enum SnapshotCommands {
    /// List stored table generations.
    List,
    /// Delete all but the newest generations.
    Prune {
        /// Number of generations to keep (defaults to `[store] keep`).
        #[arg(short, long)]
        keep: Option<usize>,
    },
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    setup_tracing(&config.log.level);

    match cli.command {
        Commands::Inspect { file } => cmd_inspect(&file),
        Commands::Resolve { file, key } => cmd_resolve(&file, &key),
        Commands::Verify { file, distinct } => {
            let policy = if distinct {
                ReplicaPolicy::DistinctReplicas
            } else {
                config.replica_policy()
            };
            cmd_verify(&file, policy)
        }
        Commands::Import { file } => cmd_import(&config, &file),
        Commands::Snapshots { action } => match action {
            SnapshotCommands::List => cmd_snapshots_list(&config),
            SnapshotCommands::Prune { keep } => {
                cmd_snapshots_prune(&config, keep.unwrap_or(config.store.keep))
            }
        },
    }
}

fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_table(file: &Path) -> Result<Dlt> {
    let bytes =
        std::fs::read(file).with_context(|| format!("cannot read {}", file.display()))?;
    debug!(path = %file.display(), len = bytes.len(), "read table file");
    Dlt::deserialize(&bytes).with_context(|| format!("{} is not a valid table", file.display()))
}

fn open_store(config: &CliConfig) -> Result<SnapshotStore> {
    SnapshotStore::open(&config.store.dir).with_context(|| {
        format!(
            "cannot open snapshot store at {}",
            config.store.dir.display()
        )
    })
}

// -----------------------------------------------------------------------
// Table summaries
// -----------------------------------------------------------------------

/// How much of the keyspace one node-table entry holds.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeLoad {
    ordinal: usize,
    node_id: NodeId,
    /// Tokens where this entry is in slot 0.
    primary: usize,
    /// Tokens where this entry is in any slot.
    replica: usize,
}

fn node_loads(dlt: &Dlt) -> Vec<NodeLoad> {
    let mut loads: Vec<NodeLoad> = dlt
        .node_table()
        .iter()
        .enumerate()
        .map(|(ordinal, &node_id)| NodeLoad {
            ordinal,
            node_id,
            primary: 0,
            replica: 0,
        })
        .collect();

    let mut seen = vec![false; loads.len()];
    for token in 0..dlt.num_tokens() as usize {
        // Decoded tables always have a full row per token.
        let Ok(row) = dlt.token_ordinals(token) else {
            continue;
        };
        seen.iter_mut().for_each(|s| *s = false);
        for (slot, &ordinal) in row.iter().enumerate() {
            let ordinal = ordinal as usize;
            if slot == 0 {
                loads[ordinal].primary += 1;
            }
            if !seen[ordinal] {
                seen[ordinal] = true;
                loads[ordinal].replica += 1;
            }
        }
    }
    loads
}

// -----------------------------------------------------------------------
// Commands
// -----------------------------------------------------------------------

fn cmd_inspect(file: &Path) -> Result<()> {
    let dlt = read_table(file)?;

    println!("Version:          {}", dlt.version());
    println!("Token bits:       {}", dlt.num_bits_for_token());
    println!("Tokens:           {}", dlt.num_tokens());
    println!("Depth:            {}", dlt.depth());
    println!("Encoded size:     {} bytes", dlt.encoded_len());
    println!("Nodes:            {}", dlt.node_count());
    for load in node_loads(&dlt) {
        println!(
            "  [{:3}] {} primary={} replica={}",
            load.ordinal, load.node_id, load.primary, load.replica
        );
    }
    Ok(())
}

fn cmd_resolve(file: &Path, key: &str) -> Result<()> {
    let dlt = read_table(file)?;
    let token = Blake3TokenHasher.token(key.as_bytes(), dlt.num_bits_for_token());
    let replicas = dlt.resolve(&Blake3TokenHasher, key.as_bytes())?;

    println!("Key:   {key}");
    println!("Token: {token}");
    for (slot, node_id) in replicas.iter().enumerate() {
        let role = if slot == 0 { "primary" } else { "replica" };
        println!("  slot {slot}: {node_id} ({role})");
    }
    Ok(())
}

fn cmd_verify(file: &Path, policy: ReplicaPolicy) -> Result<()> {
    let dlt = read_table(file)?;
    dlt.validate(policy)
        .with_context(|| format!("{} fails {policy:?}", file.display()))?;
    println!("OK: {dlt} ({policy:?})");
    Ok(())
}

fn cmd_import(config: &CliConfig, file: &Path) -> Result<()> {
    let dlt = read_table(file)?;
    let policy = config.replica_policy();
    dlt.validate(policy)
        .with_context(|| format!("{} fails {policy:?}", file.display()))?;

    let store = open_store(config)?;
    if let Some(existing) = store.load(dlt.version())? {
        anyhow::ensure!(
            existing == dlt,
            "store already holds a different table with version {}",
            dlt.version()
        );
        println!("Version {} already stored", dlt.version());
        return Ok(());
    }

    let path = store.save(&dlt)?;
    info!(version = dlt.version(), "imported table");
    println!("Stored {dlt} at {}", path.display());
    Ok(())
}

fn cmd_snapshots_list(config: &CliConfig) -> Result<()> {
    let store = open_store(config)?;
    let versions = store.versions()?;
    println!("Snapshots in {}: {}", store.dir().display(), versions.len());
    for version in versions {
        println!("  v{version}");
    }
    Ok(())
}

fn cmd_snapshots_prune(config: &CliConfig, keep: usize) -> Result<()> {
    let store = open_store(config)?;
    let removed = store.prune(keep)?;
    println!("Removed {removed} snapshot(s), kept up to {}", keep.max(1));
    Ok(())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use atoll_dlt::DltBuilder;

    fn sample_table(version: u64) -> Dlt {
        let nodes = vec![NodeId::new(1), NodeId::new(2), NodeId::new(3)];
        let mut builder = DltBuilder::create(version, 2, 2, 4, nodes).unwrap();
        for token in 0..4 {
            builder.place_token(token, 0, token % 3).unwrap();
            builder.place_token(token, 1, (token + 1) % 3).unwrap();
        }
        builder.build()
    }

    fn config_for(dir: &Path) -> CliConfig {
        let mut config = CliConfig::default();
        config.store.dir = dir.join("store");
        config
    }

    #[test]
    fn test_node_loads() {
        // rows: [0,1] [1,2] [2,0] [0,1]
        let loads = node_loads(&sample_table(1));
        let counts: Vec<(usize, usize)> = loads.iter().map(|l| (l.primary, l.replica)).collect();
        assert_eq!(counts, vec![(2, 3), (1, 3), (1, 2)]);
    }

    #[test]
    fn test_node_loads_counts_repeats_once() {
        let builder = DltBuilder::create(1, 1, 3, 2, vec![NodeId::new(9)]).unwrap();
        let loads = node_loads(&builder.build());
        assert_eq!(loads[0].primary, 2);
        assert_eq!(loads[0].replica, 2);
    }

    #[test]
    fn test_import_then_list_and_prune() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());

        for version in 1..=3 {
            let file = dir.path().join(format!("v{version}.bin"));
            std::fs::write(&file, sample_table(version).serialize()).unwrap();
            cmd_import(&config, &file).unwrap();
        }
        let store = open_store(&config).unwrap();
        assert_eq!(store.versions().unwrap(), vec![1, 2, 3]);

        cmd_snapshots_prune(&config, 1).unwrap();
        assert_eq!(store.versions().unwrap(), vec![3]);
    }

    #[test]
    fn test_import_same_version_twice_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        let file = dir.path().join("t.bin");
        std::fs::write(&file, sample_table(4).serialize()).unwrap();

        cmd_import(&config, &file).unwrap();
        cmd_import(&config, &file).unwrap();
    }

    #[test]
    fn test_import_conflicting_version_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());

        let file = dir.path().join("a.bin");
        std::fs::write(&file, sample_table(4).serialize()).unwrap();
        cmd_import(&config, &file).unwrap();

        let other = DltBuilder::create(4, 2, 2, 4, vec![NodeId::new(7)])
            .unwrap()
            .build();
        let file = dir.path().join("b.bin");
        std::fs::write(&file, other.serialize()).unwrap();
        assert!(cmd_import(&config, &file).is_err());
    }

    #[test]
    fn test_verify_rejects_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("garbage.bin");
        std::fs::write(&file, b"definitely not a table").unwrap();
        assert!(cmd_verify(&file, ReplicaPolicy::AllowDuplicates).is_err());
    }

    #[test]
    fn test_verify_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.bin");
        std::fs::write(&good, sample_table(1).serialize()).unwrap();
        cmd_verify(&good, ReplicaPolicy::DistinctReplicas).unwrap();

        let dup = DltBuilder::create(1, 2, 2, 4, vec![NodeId::new(1), NodeId::new(2)])
            .unwrap()
            .build();
        let bad = dir.path().join("bad.bin");
        std::fs::write(&bad, dup.serialize()).unwrap();
        cmd_verify(&bad, ReplicaPolicy::AllowDuplicates).unwrap();
        assert!(cmd_verify(&bad, ReplicaPolicy::DistinctReplicas).is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["atollctl", "verify", "t.bin", "--distinct"])
            .expect("verify should parse");
        match cli.command {
            Commands::Verify { file, distinct } => {
                assert_eq!(file, PathBuf::from("t.bin"));
                assert!(distinct);
            }
            _ => panic!("expected Verify command"),
        }

        let cli = Cli::try_parse_from(["atollctl", "-c", "a.toml", "snapshots", "prune", "-k", "2"])
            .expect("prune should parse");
        assert_eq!(cli.config, Some(PathBuf::from("a.toml")));
        match cli.command {
            Commands::Snapshots {
                action: SnapshotCommands::Prune { keep },
            } => assert_eq!(keep, Some(2)),
            _ => panic!("expected Snapshots Prune command"),
        }
    }

    #[test]
    fn test_cli_resolve_requires_key() {
        assert!(Cli::try_parse_from(["atollctl", "resolve", "t.bin"]).is_err());
    }
}
