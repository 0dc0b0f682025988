//! CLI command definitions and dispatch for the `redflag` binary.
//!
//! Uses clap derive macros for argument parsing. `serve` runs the REST API;
//! the other commands are operator tools over the same data directory.

pub mod classify;
pub mod usage;
pub mod user;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Spot the red flags in dating profiles, chats, job posts, rentals and listings.
#[derive(Parser)]
#[command(name = "redflag", version, about, long_about = None)]
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

    /// Log in JSON lines instead of human-readable text.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export tracing spans via OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on (defaults to the configured port).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to the configured host).
        #[arg(long)]
        host: Option<String>,
    },

    /// Manage user accounts.
    User {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Show today's and this month's analysis counts for a user.
    Usage {
        /// Account email address.
        email: String,
    },

    /// Classify text locally without calling the model.
    Classify {
        /// File to read, or `-` for stdin.
        input: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Create a regular account.
    Create {
        #[arg(long)]
        email: String,

        /// Account password (8-128 characters).
        #[arg(long, env = "REDFLAG_USER_PASSWORD", hide_env_values = true)]
        password: String,
    },
}
