//! Log source types and traits
//!
//! Defines the contract between the pull engine and whatever transport
//! actually stores the partitioned log.

use crate::decode::RawEvent;
use crate::error::Result;
use crate::types::{PartitionId, Position, StartPosition};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of one bounded-wait fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// At least one event, in sequence order
    Events(Vec<RawEvent>),
    /// Nothing arrived within the wait; more may come later
    Pending,
    /// The partition is sealed and fully read; nothing more will arrive
    EndOfPartition,
}

impl FetchOutcome {
    /// Number of events carried by this outcome
    pub fn len(&self) -> usize {
        match self {
            Self::Events(events) => events.len(),
            Self::Pending | Self::EndOfPartition => 0,
        }
    }

    /// Check if the outcome carries no events
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runtime information about one partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    /// Partition index
    pub id: PartitionId,
    /// Sequence number of the newest event, or `None` if empty
    #[serde(default)]
    pub last_sequence: Option<Position>,
}

/// A partitioned, ordered event log
///
/// Implementations must be safe for concurrent reads of different
/// partitions; the pull engine holds one shared handle for every reader.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Describe every partition, ordered by id
    async fn partitions(&self) -> Result<Vec<PartitionInfo>>;

    /// Fetch up to `max_count` events of `partition`, starting at sequence
    /// number `from`, waiting at most `max_wait` for data to appear.
    async fn fetch_batch(
        &self,
        partition: PartitionId,
        from: Position,
        max_count: usize,
        max_wait: Duration,
    ) -> Result<FetchOutcome>;
}

/// Compute the initial read position of every partition
///
/// Only used when a fresh instance is created; resumed instances always
/// continue from their persisted positions.
pub async fn starting_positions(
    source: &dyn LogSource,
    mode: StartPosition,
) -> Result<Vec<Position>> {
    let partitions = source.partitions().await?;

    let positions = match mode {
        StartPosition::FromZero => vec![0; partitions.len()],
        StartPosition::FromCurrent => partitions
            .iter()
            .map(|p| p.last_sequence.map_or(0, |seq| seq + 1))
            .collect(),
    };

    Ok(positions)
}
