//! Subcommand implementations.
//!
//! Each command returns an `ExitCode`. Failures are printed to stderr in
//! red; expected negative answers (an invalid id, an invalid config) go to
//! stdout and exit with failure so scripts can branch on them.

use std::process::ExitCode;

use armada_cluster::{
    config_template, default_config, evaluate, merge_with_defaults, parse_cluster_id,
    parse_node_id, validate_config, ClusterConfig, ClusterStore, Environment, IdentityManager,
    MemoryStore, PartialClusterConfig, RefreshCycle, Snapshot,
};
use chrono::Utc;
use clap::Subcommand;
use colored::Colorize;
use tracing::debug;

use crate::format;

fn fail(message: impl std::fmt::Display) -> ExitCode {
    eprintln!("{}", format!("error: {message}").red());
    ExitCode::FAILURE
}

/// Identifier actions.
#[derive(Debug, Subcommand)]
pub enum IdCommand {
    /// Generate a new cluster id.
    Cluster,

    /// Generate a node id for a cluster.
    Node {
        /// Owning cluster id.
        #[arg(long, env = "ARMADA_CLUSTER_ID")]
        cluster: String,

        /// Position of the node within the cluster.
        #[arg(long)]
        number: u64,
    },

    /// Parse a cluster or node id and print its components.
    Parse {
        /// The id to parse.
        id: String,
    },
}

impl IdCommand {
    pub fn run(self) -> ExitCode {
        let mut ids = IdentityManager::new();
        match self {
            IdCommand::Cluster => {
                println!("{}", ids.generate_cluster_id());
                ExitCode::SUCCESS
            }
            IdCommand::Node { cluster, number } => {
                if parse_cluster_id(&cluster).is_none() {
                    return fail(format!("'{cluster}' is not a valid cluster id"));
                }
                println!("{}", ids.generate_node_id(&cluster, number));
                ExitCode::SUCCESS
            }
            IdCommand::Parse { id } => {
                if let Some(parsed) = parse_cluster_id(&id) {
                    println!("{}", format::format_cluster_id(&parsed));
                    ExitCode::SUCCESS
                } else if let Some(parsed) = parse_node_id(&id) {
                    println!("{}", format::format_node_id(&parsed));
                    ExitCode::SUCCESS
                } else {
                    println!("{}", format!("'{id}' is not a valid cluster or node id").red());
                    ExitCode::FAILURE
                }
            }
        }
    }
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the default configuration as TOML.
    Default,

    /// Print the template for an environment (development, staging, production).
    Template {
        /// Target environment.
        #[arg(env = "ARMADA_ENV")]
        environment: String,
    },

    /// Check a partial TOML configuration and list every violation.
    Validate {
        /// Path to the TOML file.
        file: String,
    },

    /// Merge a partial TOML configuration over the defaults.
    Merge {
        /// Path to the TOML file.
        file: String,
    },
}

impl ConfigCommand {
    pub fn run(self) -> ExitCode {
        match self {
            ConfigCommand::Default => print_toml(&default_config()),
            ConfigCommand::Template { environment } => match environment.parse::<Environment>() {
                Ok(env) => print_toml(&config_template(env)),
                Err(e) => fail(e),
            },
            ConfigCommand::Validate { file } => {
                let partial = match PartialClusterConfig::from_file(&file) {
                    Ok(p) => p,
                    Err(e) => return fail(e),
                };
                let validation = validate_config(&partial);
                println!("{}", format::format_validation(&validation));
                if validation.is_valid {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                }
            }
            ConfigCommand::Merge { file } => {
                let partial = match PartialClusterConfig::from_file(&file) {
                    Ok(p) => p,
                    Err(e) => return fail(e),
                };
                let validation = validate_config(&partial);
                if !validation.is_valid {
                    println!("{}", format::format_validation(&validation));
                    return ExitCode::FAILURE;
                }
                print_toml(&merge_with_defaults(&partial))
            }
        }
    }
}

fn print_toml(config: &ClusterConfig) -> ExitCode {
    match config.to_toml() {
        Ok(toml) => {
            print!("{toml}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

/// Evaluates a snapshot file without touching any store.
pub fn run_evaluate(path: &str, json: bool) -> ExitCode {
    let snapshot = match Snapshot::from_file(path) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    debug!(path, nodes = snapshot.nodes.len(), "loaded snapshot");

    let report = evaluate(&snapshot.cluster, &snapshot.nodes, Utc::now());
    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(out) => println!("{out}"),
            Err(e) => return fail(e),
        }
    } else {
        println!("{}", format::format_report(&report));
    }
    ExitCode::SUCCESS
}

/// Loads a snapshot into an in-memory store, runs one refresh cycle and
/// emits the resulting snapshot.
pub fn run_refresh(path: &str, output: Option<&str>) -> ExitCode {
    let snapshot = match Snapshot::from_file(path) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let cluster_id = snapshot.cluster.id.clone();
    let store = MemoryStore::from_snapshot(snapshot);

    let outcome = match RefreshCycle::new().run(&store, &cluster_id) {
        Ok(o) => o,
        Err(e) => return fail(e),
    };
    for event in store.events() {
        eprintln!("{}", format::format_event(&event));
    }

    let updated = match store.snapshot(&cluster_id) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let json = match serde_json::to_string_pretty(&updated) {
        Ok(j) => j,
        Err(e) => return fail(e),
    };

    match output {
        Some(out) => {
            if let Err(e) = std::fs::write(out, json + "\n") {
                return fail(format!("failed to write {out}: {e}"));
            }
            debug!(out, roles_applied = outcome.roles_applied, "wrote refreshed snapshot");
        }
        None => println!("{json}"),
    }
    ExitCode::SUCCESS
}
