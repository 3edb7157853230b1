//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::sync::DEFAULT_PAGE_SIZE;

/// Versioned snapshots of GitHub repository metadata
#[derive(Parser, Debug)]
#[command(name = "ghmeta", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a repository's metadata graph into a new snapshot
    Sync(SyncArgs),

    /// Point the active views at an existing snapshot tag
    SetCurrent {
        /// SQLite database path
        #[arg(long, env = "GHMETA_DB")]
        db: PathBuf,

        /// Snapshot tag to expose through the views
        #[arg(long)]
        version: String,
    },

    /// Retire every row outside a snapshot tag (irreversible)
    Cleanup {
        /// SQLite database path
        #[arg(long, env = "GHMETA_DB")]
        db: PathBuf,

        /// Snapshot tag whose rows survive
        #[arg(long)]
        version: String,
    },

    /// Print the remaining GraphQL API quota
    Limits {
        /// GitHub personal access token
        #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: String,
    },
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Repository owner (user or organization)
    #[arg(long)]
    pub owner: String,

    /// Repository name
    #[arg(long)]
    pub name: String,

    /// GitHub personal access token
    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: String,

    /// SQLite database path; entities are printed to stdout when omitted
    #[arg(long, env = "GHMETA_DB")]
    pub db: Option<PathBuf>,

    /// Snapshot tag; defaults to the current UTC timestamp
    #[arg(long)]
    pub version: Option<String>,

    /// Remote page length, applied at every nesting level of the graph
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: i64,
}
