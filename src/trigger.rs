//! Instance trigger
//!
//! Creates the initial state of a new query instance and hands it to the
//! state manager. Never panics and never leaves a half-created instance:
//! every failure becomes a `Rejected` response.

use crate::source::{starting_positions, LogSource};
use crate::state::{validate_instance_id, InstanceRecord, QueryState, StateManager};
use crate::types::StartPosition;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Outcome of a start request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TriggerResponse {
    /// The instance was created and can be run
    Accepted {
        /// Id of the new instance
        instance_id: String,
        /// Starting position of every partition
        positions: Vec<i64>,
    },
    /// The instance was not created
    Rejected {
        /// Why
        reason: String,
    },
}

impl TriggerResponse {
    /// Check if the request was accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    fn rejected(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!("Start rejected: {reason}");
        Self::Rejected { reason }
    }
}

/// Start a new query instance reading from `mode`
pub async fn start_instance(
    source: &dyn LogSource,
    states: &StateManager,
    instance_id: &str,
    mode: StartPosition,
) -> TriggerResponse {
    if let Err(e) = validate_instance_id(instance_id) {
        return TriggerResponse::rejected(e.to_string());
    }

    match states.exists(instance_id).await {
        Ok(false) => {}
        Ok(true) => {
            return TriggerResponse::rejected(format!("instance '{instance_id}' already exists"))
        }
        Err(e) => return TriggerResponse::rejected(e.to_string()),
    }

    let positions = match starting_positions(source, mode).await {
        Ok(positions) => positions,
        Err(e) => {
            return TriggerResponse::rejected(format!("failed to read partition info: {e}"))
        }
    };

    let record = InstanceRecord::new(instance_id, QueryState::new(positions.clone()));
    match states.create(&record).await {
        Ok(true) => {
            info!(instance = instance_id, ?mode, ?positions, "Started instance");
            TriggerResponse::Accepted {
                instance_id: instance_id.to_string(),
                positions,
            }
        }
        Ok(false) => TriggerResponse::rejected(format!("instance '{instance_id}' already exists")),
        Err(e) => TriggerResponse::rejected(e.to_string()),
    }
}
