//! Partition reader
//!
//! Pulls one partition in order, checks sequence continuity and feeds the
//! merge queue until the window controller says stop.

use super::queue::QueueProducer;
use super::types::{PartitionCursor, PullConfig};
use super::window::{StopDecision, WindowController};
use crate::decode::{Event, EventDecoder, RawEvent};
use crate::error::{Error, Result};
use crate::source::{FetchOutcome, LogSource};
use crate::types::{PartitionId, Position};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Reads one partition for the duration of a cycle
pub struct PartitionReader {
    cursor: PartitionCursor,
    source: Arc<dyn LogSource>,
    decoder: Arc<dyn EventDecoder>,
    window: Arc<WindowController>,
    queue: QueueProducer,
    config: PullConfig,
}

impl PartitionReader {
    /// Create a reader for `partition`, starting at `position`
    pub fn new(
        partition: PartitionId,
        position: Position,
        source: Arc<dyn LogSource>,
        decoder: Arc<dyn EventDecoder>,
        window: Arc<WindowController>,
        queue: QueueProducer,
        config: PullConfig,
    ) -> Self {
        Self {
            cursor: PartitionCursor::new(partition, position),
            source,
            decoder,
            window,
            queue,
            config,
        }
    }

    /// Pull until told to stop, returning the final cursor
    ///
    /// Fails on sequence violations, undecodable events, sustained fetch
    /// failures and cancellation.
    pub async fn run(mut self) -> Result<PartitionCursor> {
        let partition = self.cursor.partition;
        let cancel = self.window.cancellation().clone();
        let mut failures = 0u32;

        loop {
            if let StopDecision::Stop(reason) = self.window.evaluate()? {
                debug!(partition, position = self.cursor.position, ?reason, "reader stopping");
                break;
            }

            let fetched = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                fetched = self.source.fetch_batch(
                    partition,
                    self.cursor.position,
                    self.config.batch_size,
                    self.config.fetch_wait,
                ) => fetched,
            };

            match fetched {
                Ok(FetchOutcome::Events(batch)) => {
                    failures = 0;
                    self.set_idle(false);
                    if !self.deliver(batch).await? {
                        debug!(partition, "merge queue closed, reader stopping");
                        break;
                    }
                }
                Ok(FetchOutcome::Pending) => {
                    failures = 0;
                    trace!(partition, position = self.cursor.position, "no data");
                    self.set_idle(true);
                }
                Ok(FetchOutcome::EndOfPartition) => {
                    failures = 0;
                    debug!(partition, position = self.cursor.position, "end of partition");
                    self.set_idle(true);
                    self.cursor.exhausted = true;
                    break;
                }
                Err(e) if e.is_retryable() && failures < self.config.fetch_retries => {
                    let delay = self.config.retry_delay(failures);
                    failures += 1;
                    warn!(
                        partition,
                        attempt = failures,
                        "Fetch failed: {e}, retrying in {delay:?}"
                    );
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(Error::Cancelled),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Ok(self.cursor)
    }

    /// Push a batch onto the merge queue; `false` if the queue closed
    async fn deliver(&mut self, batch: Vec<RawEvent>) -> Result<bool> {
        let cancel = self.window.cancellation().clone();

        for raw in batch {
            if raw.sequence != self.cursor.position {
                return Err(Error::SequenceViolation {
                    partition: self.cursor.partition,
                    expected: self.cursor.position,
                    received: raw.sequence,
                });
            }

            let event = Event {
                partition: self.cursor.partition,
                sequence: raw.sequence,
                enqueued_at: raw.enqueued_at,
                payload: self.decoder.decode(&raw.body)?,
            };

            let pushed = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                pushed = self.queue.push(event) => pushed,
            };
            if pushed.is_err() {
                return Ok(false);
            }

            self.cursor.position += 1;
        }

        Ok(true)
    }

    fn set_idle(&mut self, idle: bool) {
        self.cursor.idle = idle;
        self.window.set_idle(self.cursor.partition, idle);
    }
}
