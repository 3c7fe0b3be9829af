//! Bounded merge queue
//!
//! Every partition reader pushes into the same queue; a single consumer
//! drains it. A full queue suspends producers, which is the only thing
//! bounding memory while partitions are read faster than the query consumes.

use crate::decode::Event;
use thiserror::Error;
use tokio::sync::mpsc;

/// Returned by [`QueueProducer::push`] once the consumer has gone away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("merge queue is closed")]
pub struct QueueClosed;

/// Constructor for the producer/consumer pair
#[derive(Debug)]
pub struct MergeQueue;

impl MergeQueue {
    /// Create a queue holding at most `capacity` outstanding events
    ///
    /// A capacity of zero is raised to one.
    pub fn bounded(capacity: usize) -> (QueueProducer, QueueConsumer) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (QueueProducer { tx }, QueueConsumer { rx })
    }
}

/// Producing half; cloned once per partition reader
///
/// The queue closes when the last producer is dropped or closed.
#[derive(Debug, Clone)]
pub struct QueueProducer {
    tx: mpsc::Sender<Event>,
}

impl QueueProducer {
    /// Push an event, waiting while the queue is full
    pub async fn push(&self, event: Event) -> Result<(), QueueClosed> {
        self.tx.send(event).await.map_err(|_| QueueClosed)
    }

    /// Free slots right now
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    /// Maximum number of outstanding events
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Give up this producer's hold on the queue
    pub fn close(self) {
        drop(self);
    }
}

/// Consuming half
#[derive(Debug)]
pub struct QueueConsumer {
    rx: mpsc::Receiver<Event>,
}

impl QueueConsumer {
    /// Next event; `None` once the queue is closed and empty
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Number of events waiting
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Check if no events are waiting
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
