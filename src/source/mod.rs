//! Log source module
//!
//! Supports: in-memory logs, remote logs over HTTP
//!
//! # Overview
//!
//! The source module provides:
//! - `LogSource` - the fetch contract the pull engine reads through
//! - `MemoryLogSource` - an in-process log for local runs and tests
//! - `HttpLogSource` - a remote log service client
//! - `SharedConnection` - the process-wide, once-constructed source handle

mod connection;
mod http;
mod memory;
mod types;

pub use connection::SharedConnection;
pub use http::HttpLogSource;
pub use memory::MemoryLogSource;
pub use types::{starting_positions, FetchOutcome, LogSource, PartitionInfo};
