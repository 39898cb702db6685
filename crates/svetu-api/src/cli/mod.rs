//! CLI command definitions for the `svetu` binary.
//!
//! Uses clap derive macros for argument parsing. Draft operations live under
//! `svetu draft <action>`; every draft action takes the acting user via
//! `--user`.

pub mod draft;
pub mod status;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Manage listing drafts for the Sve Tu marketplace.
#[derive(Parser)]
#[command(name = "svetu", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit log lines as JSON.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    /// Keep drafts in memory only (nothing is written to disk).
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create, inspect, edit, export, and clean up drafts.
    Draft {
        #[command(subcommand)]
        action: draft::DraftCommand,
    },

    /// Show data directory, storage backend, and retention settings.
    Status,

    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}
