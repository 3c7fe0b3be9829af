//! Processing step
//!
//! Restore, pull one cycle, checkpoint. The step owns no durable state: the
//! caller passes the state in and gets a new one back.

use crate::error::Result;
use crate::pull::PullCycle;
use crate::query::QueryAdapter;
use crate::state::{PullResult, QueryState};
use tracing::debug;

/// Runs one restore/pull/checkpoint step
#[derive(Debug, Clone)]
pub struct ProcessingStep {
    cycle: PullCycle,
}

impl ProcessingStep {
    /// Create a step around a pull cycle runner
    pub fn new(cycle: PullCycle) -> Self {
        Self { cycle }
    }

    /// The pull cycle runner
    pub fn cycle(&self) -> &PullCycle {
        &self.cycle
    }

    /// Run one step from `state`
    ///
    /// `state` is never modified, so a failed or repeated step can be re-run
    /// from the same input.
    pub async fn run(&self, query: &mut dyn QueryAdapter, state: &QueryState) -> Result<PullResult> {
        query.restore(state.checkpoint.as_deref())?;

        let outcome = self.cycle.run(&state.positions, query).await?;

        if outcome.all_exhausted() && !query.is_complete() {
            debug!("every partition exhausted, completing query");
            query.complete()?;
        }

        let checkpoint = query.checkpoint()?;

        Ok(PullResult {
            state: QueryState {
                checkpoint: Some(checkpoint),
                positions: outcome.positions(),
            },
            events_processed: outcome.events_processed,
            completed: query.is_complete(),
        })
    }
}
