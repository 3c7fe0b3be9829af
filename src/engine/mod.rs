//! Execution engine module
//!
//! The processing step and the resumable loop driving it.
//!
//! # Overview
//!
//! The engine module provides:
//! - `ProcessingStep` - restore, run one pull cycle, checkpoint
//! - `ResumableLoop` - repeat steps, back off when idle, persist between steps
//! - `LoopConfig` - passive wait and iteration limit

mod resumable;
mod step;
mod types;

pub use resumable::ResumableLoop;
pub use step::ProcessingStep;
pub use types::{LoopConfig, LoopOutcome, LoopState, Transition};
