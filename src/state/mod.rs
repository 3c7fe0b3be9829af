//! State management module
//!
//! Handles the durable footprint of query instances: read positions plus an
//! opaque query checkpoint, persisted between processing steps so a restart
//! resumes without losing or skipping events.
//!
//! # Overview
//!
//! The state module provides:
//! - `QueryState` - positions and checkpoint carried between steps
//! - `PullResult` - the outcome of one processing step
//! - `InstanceRecord` - what is persisted per instance
//! - `StateManager` - file-based (or in-memory) persistence

mod manager;
mod types;

pub use manager::{validate_instance_id, StateManager};
pub use types::{InstanceRecord, PullResult, QueryState};
