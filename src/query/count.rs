//! Running count query
//!
//! Counts data events over an unbounded window. Punctuations advance the
//! watermark; data events behind the watermark are dropped. The query
//! completes when its input ends or, if configured, once `limit` events have
//! been counted.

use super::envelope::CheckpointEnvelope;
use super::types::QueryAdapter;
use crate::decode::{Event, StreamEvent};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

const FORMAT: &str = "logpump.count";
const VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct CountState {
    count: u64,
    dropped: u64,
    watermark: Option<i64>,
    completed: bool,
}

/// A query that counts the data events it receives
#[derive(Debug, Clone, Default)]
pub struct CountQuery {
    state: CountState,
    limit: Option<u64>,
}

impl CountQuery {
    /// Create a query that only completes when its input ends
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a query that completes after counting `limit` events
    pub fn with_limit(limit: u64) -> Self {
        Self {
            state: CountState::default(),
            limit: Some(limit),
        }
    }

    /// Data events counted so far
    pub fn count(&self) -> u64 {
        self.state.count
    }

    /// Data events dropped for arriving behind the watermark
    pub fn dropped(&self) -> u64 {
        self.state.dropped
    }

    /// Latest punctuation time seen
    pub fn watermark(&self) -> Option<i64> {
        self.state.watermark
    }
}

impl QueryAdapter for CountQuery {
    fn restore(&mut self, checkpoint: Option<&[u8]>) -> Result<()> {
        self.state = match checkpoint {
            None => CountState::default(),
            Some(bytes) => {
                let envelope = CheckpointEnvelope::open(bytes, FORMAT, VERSION)?;
                serde_json::from_slice(&envelope.payload)
                    .map_err(|e| Error::checkpoint(format!("Corrupt count state: {e}")))?
            }
        };
        Ok(())
    }

    fn submit(&mut self, event: Event) -> Result<()> {
        if self.state.completed {
            return Ok(());
        }

        match event.payload {
            StreamEvent::Punctuation { sync_time } => {
                self.state.watermark = Some(self.state.watermark.map_or(sync_time, |w| w.max(sync_time)));
            }
            StreamEvent::Point { sync_time, .. } => {
                if self.state.watermark.is_some_and(|w| sync_time < w) {
                    self.state.dropped += 1;
                    return Ok(());
                }
                self.state.count += 1;
                debug!(count = self.state.count, "Produced");

                if self.limit.is_some_and(|limit| self.state.count >= limit) {
                    self.state.completed = true;
                }
            }
        }

        Ok(())
    }

    fn complete(&mut self) -> Result<()> {
        self.state.completed = true;
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.state.completed
    }

    fn checkpoint(&self) -> Result<Vec<u8>> {
        let payload = serde_json::to_vec(&self.state)?;
        CheckpointEnvelope::new(FORMAT, VERSION, payload).encode()
    }
}
