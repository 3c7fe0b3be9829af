//! Engine types
//!
//! Loop configuration, loop states and the outcome of a loop run.

use crate::state::{PullResult, QueryState};
use std::time::Duration;

/// Configuration for the resumable loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    /// How long to sleep after a step that delivered no events
    pub passive_wait: Duration,
    /// Stop after this many steps in one run, leaving the instance resumable
    pub max_iterations: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            passive_wait: Duration::from_secs(30),
            max_iterations: None,
        }
    }
}

impl LoopConfig {
    /// Create a new loop config with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the passive wait
    #[must_use]
    pub fn with_passive_wait(mut self, passive_wait: Duration) -> Self {
        self.passive_wait = passive_wait;
        self
    }

    /// Limit the number of steps per run
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }
}

/// Where the loop goes after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Run the next step immediately
    Running,
    /// Sleep for the passive wait, then run the next step
    Waiting,
    /// The query completed; the instance is finished
    Done,
}

impl LoopState {
    /// State following a step that produced `result`
    pub fn after(result: &PullResult) -> Self {
        if result.completed {
            Self::Done
        } else if result.events_processed == 0 {
            Self::Waiting
        } else {
            Self::Running
        }
    }

    /// Check if this is the terminal state
    pub fn is_done(self) -> bool {
        self == Self::Done
    }
}

/// One verified loop step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Next loop state
    pub next: LoopState,
    /// What the step produced
    pub result: PullResult,
}

/// Summary of one `ResumableLoop::run` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Steps run during this invocation
    pub iterations: u64,
    /// Events delivered during this invocation
    pub events_processed: u64,
    /// Whether the query completed
    pub completed: bool,
    /// Latest state; already removed from storage when `completed`
    pub state: QueryState,
}
