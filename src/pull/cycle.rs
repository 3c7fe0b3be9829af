//! Pull cycle
//!
//! One generation of partition readers, a merge queue and a window
//! controller. Readers run on the tokio worker pool; the consumer runs on the
//! calling task because it owns the mutable query.

use super::cancel::Cancellation;
use super::queue::{MergeQueue, QueueConsumer};
use super::reader::PartitionReader;
use super::types::{CycleOutcome, PartitionCursor, PullConfig};
use super::window::WindowController;
use crate::decode::EventDecoder;
use crate::error::{Error, Result};
use crate::query::QueryAdapter;
use crate::source::LogSource;
use crate::types::{PartitionId, Position};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tracing::{debug, info};

/// Runs pull cycles against one log source
#[derive(Clone)]
pub struct PullCycle {
    source: Arc<dyn LogSource>,
    decoder: Arc<dyn EventDecoder>,
    config: PullConfig,
    cancel: Cancellation,
}

impl PullCycle {
    /// Create a cycle runner
    pub fn new(
        source: Arc<dyn LogSource>,
        decoder: Arc<dyn EventDecoder>,
        config: PullConfig,
        cancel: Cancellation,
    ) -> Self {
        Self {
            source,
            decoder,
            config,
            cancel,
        }
    }

    /// Cycle configuration
    pub fn config(&self) -> &PullConfig {
        &self.config
    }

    /// Cancellation signal observed by every reader
    pub fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }

    /// Pull every partition from `positions`, feeding `query`, until the
    /// window closes
    ///
    /// Fails as a whole if any reader or the query fails. Events already
    /// submitted before the failure stay submitted.
    pub async fn run(
        &self,
        positions: &[Position],
        query: &mut dyn QueryAdapter,
    ) -> Result<CycleOutcome> {
        self.cancel.check()?;

        let partitions = positions.len();
        let window = Arc::new(WindowController::new(
            partitions,
            self.config.min_wait,
            self.config.max_wait,
            self.cancel.clone(),
        ));
        if query.is_complete() {
            window.mark_query_complete();
        }

        let (producer, consumer) = MergeQueue::bounded(self.config.queue_capacity);

        let handles: FuturesUnordered<_> = positions
            .iter()
            .enumerate()
            .map(|(partition, &position)| {
                let reader = PartitionReader::new(
                    partition,
                    position,
                    Arc::clone(&self.source),
                    Arc::clone(&self.decoder),
                    Arc::clone(&window),
                    producer.clone(),
                    self.config.clone(),
                );
                let handle = tokio::spawn(reader.run());
                async move { (partition, handle.await) }
            })
            .collect();

        let readers = {
            let window = Arc::clone(&window);
            async move {
                let result = join_readers(handles, &window).await;
                // every reader has stopped; closing lets the consumer finish
                producer.close();
                result
            }
        };

        let consume = drain(consumer, query, Arc::clone(&window), self.cancel.clone(), partitions);

        let (cursors, delivered) = tokio::join!(readers, consume);
        self.cancel.check()?;
        let mut cursors = cursors?;
        let delivered = delivered?;

        cursors.sort_by_key(|c| c.partition);
        for cursor in &cursors {
            let count = delivered.get(cursor.partition).copied().unwrap_or_default();
            if cursor.advance() != count as i64 {
                return Err(Error::integrity(format!(
                    "partition {} advanced {} positions but delivered {count} events",
                    cursor.partition,
                    cursor.advance()
                )));
            }
        }

        let outcome = CycleOutcome {
            events_processed: delivered.iter().sum(),
            delivered,
            cursors,
            elapsed: window.elapsed(),
        };
        info!(
            partitions,
            events = outcome.events_processed,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "Pull cycle finished"
        );
        Ok(outcome)
    }
}

impl std::fmt::Debug for PullCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PullCycle")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Await every reader, halting the survivors as soon as one fails
async fn join_readers<F>(
    mut handles: FuturesUnordered<F>,
    window: &WindowController,
) -> Result<Vec<PartitionCursor>>
where
    F: std::future::Future<
        Output = (
            PartitionId,
            std::result::Result<Result<PartitionCursor>, tokio::task::JoinError>,
        ),
    >,
{
    let mut cursors = Vec::with_capacity(handles.len());
    let mut first_error = None;

    while let Some((partition, joined)) = handles.next().await {
        let failure = match joined {
            Ok(Ok(cursor)) => {
                cursors.push(cursor);
                continue;
            }
            Ok(Err(e)) => e,
            Err(join_error) => Error::reader(partition, join_error.to_string()),
        };

        debug!(partition, "reader failed: {failure}");
        window.halt();
        first_error.get_or_insert(failure);
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(cursors),
    }
}

/// Forward queued events to the query until the queue closes
async fn drain(
    mut consumer: QueueConsumer,
    query: &mut dyn QueryAdapter,
    window: Arc<WindowController>,
    cancel: Cancellation,
    partitions: usize,
) -> Result<Vec<u64>> {
    let mut delivered = vec![0u64; partitions];

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            next = consumer.next() => next,
        };
        let Some(event) = next else {
            break;
        };

        let partition = event.partition;
        if let Err(e) = query.submit(event) {
            window.halt();
            return Err(e);
        }
        if let Some(count) = delivered.get_mut(partition) {
            *count += 1;
        }

        if query.is_complete() {
            window.mark_query_complete();
        }
    }

    Ok(delivered)
}
