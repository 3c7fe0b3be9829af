//! Query boundary module
//!
//! # Overview
//!
//! The query module provides:
//! - `QueryAdapter` - what the pull engine needs from a query engine
//! - `CheckpointEnvelope` - versioned wrapper around engine checkpoints
//! - `CountQuery` - a running count, the reference query

mod count;
mod envelope;
mod types;

pub use count::CountQuery;
pub use envelope::CheckpointEnvelope;
pub use types::QueryAdapter;
