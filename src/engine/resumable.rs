//! Resumable processing loop
//!
//! Drives processing steps until the query completes. Between steps the whole
//! carried state is replaced and persisted, so the process can stop after any
//! step and a later `run` picks up exactly where it left off.

use super::step::ProcessingStep;
use super::types::{LoopConfig, LoopOutcome, LoopState, Transition};
use crate::error::{Error, Result};
use crate::pull::Cancellation;
use crate::query::QueryAdapter;
use crate::state::{QueryState, StateManager};
use tracing::{error, info, warn};

/// Replay-safe control loop over processing steps
#[derive(Debug, Clone)]
pub struct ResumableLoop {
    step: ProcessingStep,
    config: LoopConfig,
}

impl ResumableLoop {
    /// Create a loop
    pub fn new(step: ProcessingStep, config: LoopConfig) -> Self {
        Self { step, config }
    }

    /// Loop configuration
    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Cancellation signal shared with the pull cycle
    pub fn cancellation(&self) -> &Cancellation {
        self.step.cycle().cancellation()
    }

    /// Run one step from `state` and decide what comes next
    ///
    /// Fails with `IntegrityMismatch` if the delivered event count does not
    /// match the position advance.
    pub async fn advance(
        &self,
        query: &mut dyn QueryAdapter,
        state: &QueryState,
    ) -> Result<Transition> {
        let result = self.step.run(query, state).await?;
        result.verify(state)?;

        Ok(Transition {
            next: LoopState::after(&result),
            result,
        })
    }

    /// Run steps for `instance_id` until the query completes, the iteration
    /// limit is reached or a step fails
    ///
    /// State is saved after every step and removed once the query completes.
    pub async fn run(
        &self,
        query: &mut dyn QueryAdapter,
        states: &StateManager,
        instance_id: &str,
    ) -> Result<LoopOutcome> {
        let mut record = states
            .load(instance_id)
            .await?
            .ok_or_else(|| Error::state(format!("Instance '{instance_id}' does not exist")))?;

        let cancel = self.cancellation().clone();
        let active_wait = self.step.cycle().config().fetch_wait;
        let passive_wait = self.config.passive_wait;

        let mut outcome = LoopOutcome {
            iterations: 0,
            events_processed: 0,
            completed: false,
            state: record.state.clone(),
        };

        info!(
            instance = instance_id,
            partitions = record.state.partition_count(),
            "Resuming instance"
        );

        loop {
            if self.limit_reached(outcome.iterations) {
                info!(instance = instance_id, iterations = outcome.iterations, "Iteration limit reached");
                return Ok(outcome);
            }

            let transition = match self.advance(query, &record.state).await {
                Ok(transition) => transition,
                Err(e) => {
                    error!(instance = instance_id, kind = ?e.kind(), "Processing step failed: {e}");
                    return Err(e);
                }
            };

            record.apply(&transition.result);
            outcome.iterations += 1;
            outcome.events_processed += transition.result.events_processed;
            outcome.state = transition.result.state;

            info!(
                instance = instance_id,
                events = transition.result.events_processed,
                positions = ?outcome.state.positions,
                next = ?transition.next,
                "Step finished"
            );

            match transition.next {
                LoopState::Done => {
                    states.remove(instance_id).await?;
                    outcome.completed = true;
                    info!(
                        instance = instance_id,
                        total_events = record.events_processed,
                        "Query completed"
                    );
                    return Ok(outcome);
                }
                LoopState::Waiting => {
                    states.save(&record).await?;
                    if self.limit_reached(outcome.iterations) {
                        continue;
                    }
                    warn!(
                        "No new events in last {}s. Going to sleep for {}s.",
                        active_wait.as_secs(),
                        passive_wait.as_secs()
                    );
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(Error::Cancelled),
                        () = tokio::time::sleep(passive_wait) => {}
                    }
                }
                LoopState::Running => {
                    states.save(&record).await?;
                }
            }
        }
    }

    fn limit_reached(&self, iterations: u64) -> bool {
        self.config
            .max_iterations
            .is_some_and(|max| iterations >= max)
    }
}
