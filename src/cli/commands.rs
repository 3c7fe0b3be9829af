//! CLI commands and argument parsing

use crate::types::StartPosition;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Resumable partitioned-log pump
#[derive(Parser, Debug)]
#[command(name = "logpump")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the log service base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Override the state directory
    #[arg(short, long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new query instance
    Start {
        /// Instance id
        #[arg(short, long)]
        instance: String,

        /// Where to start reading: zero or current
        #[arg(long, default_value = "zero")]
        from: StartPosition,
    },

    /// Run (or resume) a query instance until it completes
    Run {
        /// Instance id
        #[arg(short, long)]
        instance: String,

        /// Stop after this many processing steps
        #[arg(long)]
        max_iterations: Option<u64>,

        /// Complete the query after counting this many events
        #[arg(long)]
        until: Option<u64>,
    },

    /// Show the persisted state of an instance
    Show {
        /// Instance id
        #[arg(short, long)]
        instance: String,
    },

    /// List instances with persisted state
    List,

    /// Print the starting positions a new instance would get
    Positions {
        /// Where to start reading: zero or current
        #[arg(long, default_value = "current")]
        from: StartPosition,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one document per line)
    Json,
    /// Pretty-printed JSON
    Pretty,
}
