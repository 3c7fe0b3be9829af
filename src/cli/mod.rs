//! CLI module
//!
//! Command-line interface for managing and running query instances.
//!
//! # Commands
//!
//! - `start` - Create an instance at the chosen starting positions
//! - `run` - Run or resume an instance until it completes
//! - `show` - Print the persisted state of an instance
//! - `list` - List instances with persisted state
//! - `positions` - Print the current starting positions of the log

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
