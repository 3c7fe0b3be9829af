//! In-process log source
//!
//! Keeps every partition in memory. Used for local runs and throughout the
//! test suite; supports sealing partitions, injecting out-of-order events and
//! injecting transient fetch failures.

use super::types::{FetchOutcome, LogSource, PartitionInfo};
use crate::decode::{EventDecoder, JsonEventDecoder, RawEvent, StreamEvent};
use crate::error::{Error, Result};
use crate::types::{PartitionId, Position};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct MemoryPartition {
    events: Mutex<Vec<RawEvent>>,
    sealed: AtomicBool,
    pending_failures: AtomicU32,
    appended: Notify,
}

/// An in-memory partitioned log
///
/// The event stored at index `i` of a partition is served for position `i`,
/// whatever sequence number it carries.
pub struct MemoryLogSource {
    partitions: Vec<MemoryPartition>,
    encoder: Arc<dyn EventDecoder>,
    fetches: AtomicUsize,
}

impl MemoryLogSource {
    /// Create a log with `partitions` empty partitions and JSON bodies
    pub fn new(partitions: usize) -> Self {
        Self::with_encoder(partitions, Arc::new(JsonEventDecoder::new()))
    }

    /// Create a log whose `append` encodes bodies with `encoder`
    pub fn with_encoder(partitions: usize, encoder: Arc<dyn EventDecoder>) -> Self {
        Self {
            partitions: (0..partitions).map(|_| MemoryPartition::default()).collect(),
            encoder,
            fetches: AtomicUsize::new(0),
        }
    }

    fn partition(&self, partition: PartitionId) -> Result<&MemoryPartition> {
        self.partitions
            .get(partition)
            .ok_or(Error::UnknownPartition {
                partition,
                count: self.partitions.len(),
            })
    }

    /// Number of partitions
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Append an event, assigning it the next sequence number
    pub fn append(&self, partition: PartitionId, event: StreamEvent) -> Result<Position> {
        let body = self.encoder.encode(&event)?;
        let part = self.partition(partition)?;
        let sequence = {
            let mut events = lock(&part.events);
            let sequence = events.len() as Position;
            events.push(RawEvent::new(sequence, body).with_enqueued_at(Utc::now()));
            sequence
        };
        part.appended.notify_waiters();
        Ok(sequence)
    }

    /// Append a raw event verbatim, whatever sequence number it carries
    pub fn append_raw(&self, partition: PartitionId, event: RawEvent) -> Result<()> {
        let part = self.partition(partition)?;
        lock(&part.events).push(event);
        part.appended.notify_waiters();
        Ok(())
    }

    /// Mark a partition as complete: once drained it reports end-of-partition
    pub fn seal(&self, partition: PartitionId) -> Result<()> {
        let part = self.partition(partition)?;
        part.sealed.store(true, Ordering::SeqCst);
        part.appended.notify_waiters();
        Ok(())
    }

    /// Seal every partition
    pub fn seal_all(&self) {
        for part in &self.partitions {
            part.sealed.store(true, Ordering::SeqCst);
            part.appended.notify_waiters();
        }
    }

    /// Make the next `count` fetches of a partition fail with a retryable error
    pub fn fail_next_fetches(&self, partition: PartitionId, count: u32) -> Result<()> {
        self.partition(partition)?
            .pending_failures
            .store(count, Ordering::SeqCst);
        Ok(())
    }

    /// Number of events stored in a partition
    pub fn len(&self, partition: PartitionId) -> usize {
        self.partitions
            .get(partition)
            .map_or(0, |p| lock(&p.events).len())
    }

    /// Check if every partition is empty
    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(|p| lock(&p.events).is_empty())
    }

    /// Total number of fetch calls served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MemoryLogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLogSource")
            .field("partitions", &self.partitions.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LogSource for MemoryLogSource {
    async fn partitions(&self) -> Result<Vec<PartitionInfo>> {
        Ok(self
            .partitions
            .iter()
            .enumerate()
            .map(|(id, part)| PartitionInfo {
                id,
                last_sequence: lock(&part.events).last().map(|e| e.sequence),
            })
            .collect())
    }

    async fn fetch_batch(
        &self,
        partition: PartitionId,
        from: Position,
        max_count: usize,
        max_wait: Duration,
    ) -> Result<FetchOutcome> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let part = self.partition(partition)?;
        let start = usize::try_from(from)
            .map_err(|_| Error::invalid_value("position", format!("negative position {from}")))?;

        let injected = part
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(Error::fetch(partition, "injected transient failure"));
        }

        let deadline = Instant::now() + max_wait;
        loop {
            let notified = part.appended.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let events = lock(&part.events);
                if start < events.len() {
                    let end = events.len().min(start.saturating_add(max_count.max(1)));
                    return Ok(FetchOutcome::Events(events[start..end].to_vec()));
                }
            }
            if part.sealed.load(Ordering::SeqCst) {
                return Ok(FetchOutcome::EndOfPartition);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(FetchOutcome::Pending);
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
