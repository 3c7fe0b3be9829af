//! State types carried between processing steps
//!
//! `QueryState` is serialized to JSON and persisted between runs; it is the
//! entire durable footprint of a query instance.

use crate::error::{Error, Result};
use crate::types::{base64_bytes, Position};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything a query instance needs to resume
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryState {
    /// Serialized query checkpoint, or `None` if the query has not started
    #[serde(with = "base64_bytes::option", default)]
    pub checkpoint: Option<Vec<u8>>,

    /// Next unread position of every partition
    #[serde(default)]
    pub positions: Vec<Position>,
}

impl QueryState {
    /// Create the state of a query that has not started yet
    pub fn new(positions: Vec<Position>) -> Self {
        Self {
            checkpoint: None,
            positions,
        }
    }

    /// Check if the query has never been checkpointed
    pub fn is_fresh(&self) -> bool {
        self.checkpoint.is_none()
    }

    /// Number of partitions tracked
    pub fn partition_count(&self) -> usize {
        self.positions.len()
    }

    /// Total positions advanced since `previous`
    ///
    /// Fails if the partition count changed or any position moved backwards.
    pub fn advance_since(&self, previous: &QueryState) -> Result<i64> {
        if self.positions.len() != previous.positions.len() {
            return Err(Error::integrity(format!(
                "partition count changed from {} to {}",
                previous.positions.len(),
                self.positions.len()
            )));
        }

        let mut total = 0i64;
        for (partition, (now, before)) in self.positions.iter().zip(&previous.positions).enumerate() {
            if now < before {
                return Err(Error::integrity(format!(
                    "position of partition {partition} moved backwards from {before} to {now}"
                )));
            }
            total += now - before;
        }

        Ok(total)
    }
}

/// Outcome of one processing step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullResult {
    /// State to carry into the next step
    pub state: QueryState,
    /// Events delivered to the query during the step
    pub events_processed: u64,
    /// Whether the query has finished
    pub completed: bool,
}

impl PullResult {
    /// Check that the reported event count matches the position advance
    /// since `previous`
    pub fn verify(&self, previous: &QueryState) -> Result<()> {
        let advanced = self.state.advance_since(previous)?;
        if advanced != self.events_processed as i64 {
            return Err(Error::integrity(format!(
                "{} events processed but positions advanced by {advanced}",
                self.events_processed
            )));
        }
        Ok(())
    }
}

/// Persisted record of one query instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Instance identifier
    pub instance_id: String,
    /// When the instance was started
    pub created_at: DateTime<Utc>,
    /// When the state was last replaced
    pub updated_at: DateTime<Utc>,
    /// Processing steps completed so far
    #[serde(default)]
    pub iterations: u64,
    /// Events delivered over the lifetime of the instance
    #[serde(default)]
    pub events_processed: u64,
    /// State to resume from
    pub state: QueryState,
}

impl InstanceRecord {
    /// Create the record of a freshly started instance
    pub fn new(instance_id: impl Into<String>, state: QueryState) -> Self {
        let now = Utc::now();
        Self {
            instance_id: instance_id.into(),
            created_at: now,
            updated_at: now,
            iterations: 0,
            events_processed: 0,
            state,
        }
    }

    /// Fold the result of one step into the record
    pub fn apply(&mut self, result: &PullResult) {
        self.state = result.state.clone();
        self.iterations += 1;
        self.events_processed += result.events_processed;
        self.updated_at = Utc::now();
    }
}
