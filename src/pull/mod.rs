//! Partitioned pull engine
//!
//! Reads every partition of a log concurrently and merges the events into a
//! single ordered-per-partition stream for the query.
//!
//! # Overview
//!
//! The pull module provides:
//! - `PartitionReader` - pulls one partition and checks sequence continuity
//! - `MergeQueue` - bounded multi-producer queue with backpressure
//! - `WindowController` - the idle/time-window stop policy
//! - `PullCycle` - one generation of readers, queue and controller
//! - `Cancellation` - the shared cancellation signal

mod cancel;
mod cycle;
mod queue;
mod reader;
mod types;
mod window;

pub use cancel::Cancellation;
pub use cycle::PullCycle;
pub use queue::{MergeQueue, QueueClosed, QueueConsumer, QueueProducer};
pub use reader::PartitionReader;
pub use types::{CycleOutcome, PartitionCursor, PullConfig, StopReason};
pub use window::{decide, StopDecision, WindowController};

#[cfg(test)]
mod tests;
