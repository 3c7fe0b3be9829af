//! Pull engine types
//!
//! Configuration for a pull cycle, the per-partition cursor and the
//! aggregated cycle outcome.

use crate::types::{BackoffType, PartitionId, Position};
use std::time::Duration;

/// Configuration for pull cycles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullConfig {
    /// Before this, a cycle never stops on idleness alone
    pub min_wait: Duration,
    /// A cycle always stops once this much time has elapsed
    pub max_wait: Duration,
    /// Longest a single fetch may wait for data
    pub fetch_wait: Duration,
    /// Maximum events per fetch
    pub batch_size: usize,
    /// Merge queue capacity (outstanding events)
    pub queue_capacity: usize,
    /// Retries of a retryable fetch failure before the reader gives up
    pub fetch_retries: u32,
    /// Delay before the first fetch retry
    pub retry_backoff: Duration,
    /// Backoff growth between fetch retries
    pub retry_backoff_type: BackoffType,
}

impl Default for PullConfig {
    fn default() -> Self {
        Self {
            min_wait: Duration::from_secs(20),
            max_wait: Duration::from_secs(60),
            fetch_wait: Duration::from_secs(5),
            batch_size: 200,
            queue_capacity: 500,
            fetch_retries: 3,
            retry_backoff: Duration::from_millis(200),
            retry_backoff_type: BackoffType::Exponential,
        }
    }
}

impl PullConfig {
    /// Create a new pull config with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the min/max cycle window
    #[must_use]
    pub fn with_window(mut self, min_wait: Duration, max_wait: Duration) -> Self {
        self.min_wait = min_wait;
        self.max_wait = max_wait;
        self
    }

    /// Set the per-fetch wait
    #[must_use]
    pub fn with_fetch_wait(mut self, fetch_wait: Duration) -> Self {
        self.fetch_wait = fetch_wait;
        self
    }

    /// Set the fetch batch size
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the merge queue capacity
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set fetch retry behaviour
    #[must_use]
    pub fn with_fetch_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.fetch_retries = retries;
        self.retry_backoff = backoff;
        self
    }

    /// Backoff before fetch retry number `attempt`
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_backoff_type
            .delay(attempt, self.retry_backoff, self.max_wait)
    }
}

/// Read progress of one partition during one cycle
///
/// Owned by its reader while the cycle runs and handed back when it ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionCursor {
    /// Partition index
    pub partition: PartitionId,
    /// Position the cycle started from
    pub start: Position,
    /// Next unread position
    pub position: Position,
    /// Whether the last fetch returned no data
    pub idle: bool,
    /// Whether the partition reported end-of-partition
    pub exhausted: bool,
}

impl PartitionCursor {
    /// Create a cursor at `position`
    pub fn new(partition: PartitionId, position: Position) -> Self {
        Self {
            partition,
            start: position,
            position,
            idle: false,
            exhausted: false,
        }
    }

    /// Number of positions advanced this cycle
    pub fn advance(&self) -> i64 {
        self.position - self.start
    }
}

/// Why a reader stopped pulling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The query reported completion
    QueryComplete,
    /// The cycle ran for its maximum duration
    MaxWait,
    /// Minimum duration passed and every partition was idle
    AllIdle,
    /// The cycle was halted after another worker failed
    Halted,
}

/// Outcome of one pull cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Final cursor of every partition, ordered by partition
    pub cursors: Vec<PartitionCursor>,
    /// Events delivered to the query, per partition
    pub delivered: Vec<u64>,
    /// Total events delivered to the query
    pub events_processed: u64,
    /// How long the cycle ran
    pub elapsed: Duration,
}

impl CycleOutcome {
    /// Next unread position of every partition
    pub fn positions(&self) -> Vec<Position> {
        self.cursors.iter().map(|c| c.position).collect()
    }

    /// Check if every partition reported end-of-partition
    pub fn all_exhausted(&self) -> bool {
        !self.cursors.is_empty() && self.cursors.iter().all(|c| c.exhausted)
    }
}
