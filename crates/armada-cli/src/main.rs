//! armada: command-line front end for armada cluster coordination.
//!
//! Generates and inspects identifiers, produces and checks cluster
//! configuration files, and evaluates cluster snapshots offline. Every
//! subcommand reads its input from files or arguments and writes plain
//! text (or JSON) to stdout, so the tool composes with shell pipelines.

mod commands;
mod format;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::{ConfigCommand, IdCommand};

/// Cluster coordination toolkit for armada.
#[derive(Parser)]
#[command(name = "armada", version, about)]
struct Args {
    /// Disable colored output.
    #[arg(long, global = true, env = "ARMADA_NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate, validate and parse cluster and node ids.
    Id {
        #[command(subcommand)]
        action: IdCommand,
    },

    /// Print, check and merge cluster configuration files.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },

    /// Evaluate a cluster snapshot and print its health report.
    Evaluate {
        /// JSON file holding `{ "cluster": ..., "nodes": [...] }`.
        snapshot: String,

        /// Print the full report as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Run one refresh cycle over a snapshot and print the updated snapshot.
    Refresh {
        /// JSON file holding `{ "cluster": ..., "nodes": [...] }`.
        snapshot: String,

        /// Write the updated snapshot here instead of stdout.
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "armada=info".into()),
        )
        .init();

    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }

    match args.command {
        Command::Id { action } => action.run(),
        Command::Config { action } => action.run(),
        Command::Evaluate { snapshot, json } => commands::run_evaluate(&snapshot, json),
        Command::Refresh { snapshot, output } => {
            commands::run_refresh(&snapshot, output.as_deref())
        }
    }
}
