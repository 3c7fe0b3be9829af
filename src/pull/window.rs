//! Pull window controller
//!
//! Decides when a cycle stops pulling. The decision ignores event content:
//! it only looks at cancellation, query completion, elapsed time and
//! whether every partition is idle.

use super::cancel::Cancellation;
use super::types::StopReason;
use crate::error::Result;
use crate::types::PartitionId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of one stop-rule evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopDecision {
    /// Keep pulling
    Continue,
    /// Stop pulling for the given reason
    Stop(StopReason),
}

/// Stop rule for a cycle that has run for `elapsed`
///
/// Completion stops immediately, `max_wait` stops unconditionally and
/// `min_wait` stops only when every partition is idle.
pub fn decide(
    elapsed: Duration,
    min_wait: Duration,
    max_wait: Duration,
    all_idle: bool,
    query_complete: bool,
) -> StopDecision {
    if query_complete {
        StopDecision::Stop(StopReason::QueryComplete)
    } else if elapsed >= max_wait {
        StopDecision::Stop(StopReason::MaxWait)
    } else if elapsed >= min_wait && all_idle {
        StopDecision::Stop(StopReason::AllIdle)
    } else {
        StopDecision::Continue
    }
}

/// Shared stop state of one cycle
#[derive(Debug)]
pub struct WindowController {
    started: Instant,
    min_wait: Duration,
    max_wait: Duration,
    idle: Vec<AtomicBool>,
    query_complete: AtomicBool,
    halted: AtomicBool,
    cancel: Cancellation,
}

impl WindowController {
    /// Start a window for `partitions` partitions, beginning now
    pub fn new(
        partitions: usize,
        min_wait: Duration,
        max_wait: Duration,
        cancel: Cancellation,
    ) -> Self {
        Self {
            started: Instant::now(),
            min_wait,
            max_wait,
            idle: (0..partitions).map(|_| AtomicBool::new(false)).collect(),
            query_complete: AtomicBool::new(false),
            halted: AtomicBool::new(false),
            cancel,
        }
    }

    /// Evaluate the stop rule
    ///
    /// Fails with `Cancelled` if cancellation was requested.
    pub fn evaluate(&self) -> Result<StopDecision> {
        self.cancel.check()?;

        if self.halted.load(Ordering::SeqCst) {
            return Ok(StopDecision::Stop(StopReason::Halted));
        }

        Ok(decide(
            self.elapsed(),
            self.min_wait,
            self.max_wait,
            self.all_idle(),
            self.query_complete.load(Ordering::SeqCst),
        ))
    }

    /// Record whether a partition's last fetch came back empty
    pub fn set_idle(&self, partition: PartitionId, idle: bool) {
        if let Some(flag) = self.idle.get(partition) {
            flag.store(idle, Ordering::SeqCst);
        }
    }

    /// Check if a partition is idle
    pub fn is_idle(&self, partition: PartitionId) -> bool {
        self.idle
            .get(partition)
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Check if every partition is idle
    pub fn all_idle(&self) -> bool {
        self.idle.iter().all(|flag| flag.load(Ordering::SeqCst))
    }

    /// Record that the query has finished
    pub fn mark_query_complete(&self) {
        self.query_complete.store(true, Ordering::SeqCst);
    }

    /// Stop every reader at its next check
    pub fn halt(&self) {
        self.halted.store(true, Ordering::SeqCst);
    }

    /// Time since the window started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// The cancellation signal this window observes
    pub fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }
}
