//! Tests for the pull engine

use super::*;
use crate::decode::{Event, EventDecoder, JsonEventDecoder, RawEvent, StreamEvent};
use crate::error::{Error, Result};
use crate::query::{CountQuery, QueryAdapter};
use crate::source::{FetchOutcome, LogSource, MemoryLogSource, PartitionInfo};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;
use tokio_test::{assert_pending, assert_ready_ok, task};

/// Query that records the order events arrive in
#[derive(Debug, Default)]
struct Recorder {
    seen: Vec<(usize, i64)>,
    fail_after: Option<usize>,
}

impl QueryAdapter for Recorder {
    fn restore(&mut self, _checkpoint: Option<&[u8]>) -> Result<()> {
        self.seen.clear();
        Ok(())
    }

    fn submit(&mut self, event: Event) -> Result<()> {
        if self.fail_after.is_some_and(|n| self.seen.len() >= n) {
            return Err(Error::query(anyhow::anyhow!("query blew up")));
        }
        self.seen.push((event.partition, event.sequence));
        Ok(())
    }

    fn complete(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_complete(&self) -> bool {
        false
    }

    fn checkpoint(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

fn test_config() -> PullConfig {
    PullConfig::new()
        .with_window(Duration::from_secs(20), Duration::from_secs(60))
        .with_fetch_wait(Duration::from_secs(5))
}

fn fill(source: &MemoryLogSource, partition: usize, count: i64) {
    for i in 0..count {
        source.append(partition, StreamEvent::point(i, i)).unwrap();
    }
}

fn cycle_over(source: Arc<MemoryLogSource>, config: PullConfig) -> PullCycle {
    PullCycle::new(
        source,
        Arc::new(JsonEventDecoder::new()),
        config,
        Cancellation::new(),
    )
}

// ============================================================================
// Stop Rule Tests
// ============================================================================

#[test_case(0, false, false => StopDecision::Continue ; "fresh window")]
#[test_case(10, true, false => StopDecision::Continue ; "idle before min wait")]
#[test_case(20, true, false => StopDecision::Stop(StopReason::AllIdle) ; "idle at min wait")]
#[test_case(30, false, false => StopDecision::Continue ; "busy between waits")]
#[test_case(60, false, false => StopDecision::Stop(StopReason::MaxWait) ; "busy at max wait")]
#[test_case(90, true, false => StopDecision::Stop(StopReason::MaxWait) ; "max wait wins over idle")]
#[test_case(0, false, true => StopDecision::Stop(StopReason::QueryComplete) ; "complete stops at once")]
fn test_decide(elapsed_secs: u64, all_idle: bool, complete: bool) -> StopDecision {
    decide(
        Duration::from_secs(elapsed_secs),
        Duration::from_secs(20),
        Duration::from_secs(60),
        all_idle,
        complete,
    )
}

#[tokio::test(start_paused = true)]
async fn test_window_controller() {
    let window = WindowController::new(
        2,
        Duration::from_secs(20),
        Duration::from_secs(60),
        Cancellation::new(),
    );
    assert_eq!(window.evaluate().unwrap(), StopDecision::Continue);

    window.set_idle(0, true);
    window.set_idle(1, true);
    assert!(window.all_idle());
    assert_eq!(window.evaluate().unwrap(), StopDecision::Continue);

    tokio::time::advance(Duration::from_secs(20)).await;
    assert_eq!(
        window.evaluate().unwrap(),
        StopDecision::Stop(StopReason::AllIdle)
    );

    window.set_idle(1, false);
    assert!(!window.is_idle(1));
    assert_eq!(window.evaluate().unwrap(), StopDecision::Continue);

    window.halt();
    assert_eq!(
        window.evaluate().unwrap(),
        StopDecision::Stop(StopReason::Halted)
    );
}

#[test]
fn test_window_cancelled() {
    let cancel = Cancellation::new();
    let window = WindowController::new(1, Duration::ZERO, Duration::ZERO, cancel.clone());
    cancel.cancel();
    assert!(matches!(window.evaluate(), Err(Error::Cancelled)));
}

// ============================================================================
// Cancellation Tests
// ============================================================================

#[tokio::test]
async fn test_cancellation_wakes_waiters() {
    let cancel = Cancellation::new();
    assert!(cancel.check().is_ok());

    let waiter = {
        let cancel = cancel.clone();
        tokio::spawn(async move { cancel.cancelled().await })
    };

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter should wake")
        .unwrap();
    assert!(cancel.is_cancelled());
    assert!(matches!(cancel.check(), Err(Error::Cancelled)));
}

// ============================================================================
// Merge Queue Tests
// ============================================================================

fn queued(partition: usize, sequence: i64) -> Event {
    Event {
        partition,
        sequence,
        enqueued_at: None,
        payload: StreamEvent::point(sequence, 0),
    }
}

#[tokio::test]
async fn test_queue_backpressure() {
    let (producer, mut consumer) = MergeQueue::bounded(2);
    assert_eq!(producer.capacity(), 2);

    producer.push(queued(0, 0)).await.unwrap();
    producer.push(queued(0, 1)).await.unwrap();
    assert_eq!(producer.available(), 0);
    assert_eq!(consumer.len(), 2);

    // Full queue suspends the producer until the consumer makes room
    let mut blocked = task::spawn(producer.push(queued(0, 2)));
    assert_pending!(blocked.poll());

    assert_eq!(consumer.next().await.unwrap().sequence, 0);
    assert!(blocked.is_woken());
    assert_ready_ok!(blocked.poll());
    drop(blocked);

    producer.close();
    assert_eq!(consumer.next().await.unwrap().sequence, 1);
    assert_eq!(consumer.next().await.unwrap().sequence, 2);
    assert!(consumer.next().await.is_none());
    assert!(consumer.is_empty());
}

#[tokio::test]
async fn test_queue_closed_by_consumer() {
    let (producer, consumer) = MergeQueue::bounded(0);
    assert_eq!(producer.capacity(), 1);

    drop(consumer);
    assert_eq!(producer.push(queued(0, 0)).await, Err(QueueClosed));
}

// ============================================================================
// Pull Cycle Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_single_partition_drained() {
    let source = Arc::new(MemoryLogSource::new(1));
    fill(&source, 0, 5);
    source.seal_all();

    let cycle = cycle_over(Arc::clone(&source), test_config());
    let mut query = Recorder::default();
    let outcome = cycle.run(&[0], &mut query).await.unwrap();

    assert_eq!(outcome.positions(), vec![5]);
    assert_eq!(outcome.events_processed, 5);
    assert_eq!(outcome.delivered, vec![5]);
    assert!(outcome.all_exhausted());
    assert_eq!(query.seen, (0..5).map(|s| (0, s)).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn test_resumes_from_given_position() {
    let source = Arc::new(MemoryLogSource::new(1));
    fill(&source, 0, 8);
    source.seal_all();

    let cycle = cycle_over(source, test_config());
    let mut query = Recorder::default();
    let outcome = cycle.run(&[5], &mut query).await.unwrap();

    assert_eq!(outcome.positions(), vec![8]);
    assert_eq!(query.seen, vec![(0, 5), (0, 6), (0, 7)]);
}

#[tokio::test(start_paused = true)]
async fn test_idle_partitions_stop_after_min_wait() {
    let source = Arc::new(MemoryLogSource::new(2));
    let cycle = cycle_over(source, test_config());

    let mut query = Recorder::default();
    let outcome = cycle.run(&[0, 0], &mut query).await.unwrap();

    assert_eq!(outcome.positions(), vec![0, 0]);
    assert_eq!(outcome.events_processed, 0);
    assert!(!outcome.all_exhausted());
    assert!(outcome.elapsed >= Duration::from_secs(20));
    assert!(outcome.elapsed <= Duration::from_secs(25));
}

#[tokio::test(start_paused = true)]
async fn test_busy_partition_stops_at_max_wait() {
    let source = Arc::new(MemoryLogSource::new(2));
    let feeder = {
        let source = Arc::clone(&source);
        tokio::spawn(async move {
            let mut tick = 0;
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                source.append(0, StreamEvent::point(tick, tick)).unwrap();
                tick += 1;
            }
        })
    };

    let cycle = cycle_over(Arc::clone(&source), test_config());
    let mut query = Recorder::default();
    let outcome = cycle.run(&[0, 0], &mut query).await.unwrap();
    feeder.abort();

    assert!(outcome.elapsed >= Duration::from_secs(60));
    assert!(outcome.elapsed <= Duration::from_secs(66));
    assert_eq!(outcome.positions()[1], 0);
    assert_eq!(outcome.positions()[0], outcome.events_processed as i64);
    assert!(outcome.events_processed >= 55);
}

#[tokio::test(start_paused = true)]
async fn test_sequence_violation() {
    let source = Arc::new(MemoryLogSource::new(1));
    fill(&source, 0, 3);
    let body = JsonEventDecoder::new()
        .encode(&StreamEvent::point(3, 3))
        .unwrap();
    source.append_raw(0, RawEvent::new(7, body)).unwrap();
    source.seal_all();

    let cycle = cycle_over(source, test_config());
    let mut query = Recorder::default();
    let err = cycle.run(&[0], &mut query).await.unwrap_err();

    assert!(matches!(
        err,
        Error::SequenceViolation {
            partition: 0,
            expected: 3,
            received: 7
        }
    ));
    // Events before the gap were already delivered
    assert_eq!(query.seen.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_per_partition_order_with_small_queue() {
    let source = Arc::new(MemoryLogSource::new(3));
    for partition in 0..3 {
        fill(&source, partition, 50);
    }
    source.seal_all();

    let config = test_config().with_queue_capacity(1).with_batch_size(7);
    let cycle = cycle_over(source, config);
    let mut query = Recorder::default();
    let outcome = cycle.run(&[0, 10, 0], &mut query).await.unwrap();

    assert_eq!(outcome.positions(), vec![50, 50, 50]);
    assert_eq!(outcome.delivered, vec![50, 40, 50]);
    assert_eq!(outcome.events_processed, 140);

    for partition in 0..3 {
        let sequences: Vec<i64> = query
            .seen
            .iter()
            .filter(|(p, _)| *p == partition)
            .map(|(_, s)| *s)
            .collect();
        let mut sorted = sequences.clone();
        sorted.sort_unstable();
        assert_eq!(sequences, sorted);
    }
}

#[tokio::test(start_paused = true)]
async fn test_query_completion_stops_early() {
    let source = Arc::new(MemoryLogSource::new(1));
    fill(&source, 0, 10);

    let cycle = cycle_over(source, test_config());
    let mut query = CountQuery::with_limit(3);
    let outcome = cycle.run(&[0], &mut query).await.unwrap();

    assert!(query.is_complete());
    assert_eq!(query.count(), 3);
    assert!(outcome.elapsed < Duration::from_secs(20));
    // Everything pulled was delivered, even past completion
    assert_eq!(outcome.positions()[0], outcome.events_processed as i64);
}

#[tokio::test(start_paused = true)]
async fn test_transient_fetch_failures_retried() {
    let source = Arc::new(MemoryLogSource::new(1));
    fill(&source, 0, 4);
    source.seal_all();
    source.fail_next_fetches(0, 2).unwrap();

    let config = test_config().with_fetch_retries(3, Duration::from_millis(100));
    let cycle = cycle_over(source, config);
    let mut query = Recorder::default();
    let outcome = cycle.run(&[0], &mut query).await.unwrap();

    assert_eq!(outcome.positions(), vec![4]);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_fetch_failure_fails_cycle() {
    let source = Arc::new(MemoryLogSource::new(2));
    fill(&source, 1, 4);
    source.seal_all();
    source.fail_next_fetches(0, 10).unwrap();

    let config = test_config().with_fetch_retries(2, Duration::from_millis(100));
    let cycle = cycle_over(source, config);
    let mut query = Recorder::default();
    let err = cycle.run(&[0, 0], &mut query).await.unwrap_err();

    assert!(matches!(err, Error::Fetch { partition: 0, .. }));
}

/// Single empty partition whose fetches alternate a 503 and a clean wait
#[derive(Debug, Default)]
struct Flaky {
    calls: AtomicUsize,
}

#[async_trait]
impl LogSource for Flaky {
    async fn partitions(&self) -> Result<Vec<PartitionInfo>> {
        Ok(vec![PartitionInfo {
            id: 0,
            last_sequence: None,
        }])
    }

    async fn fetch_batch(
        &self,
        _partition: usize,
        _from: i64,
        _max_count: usize,
        max_wait: Duration,
    ) -> Result<FetchOutcome> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
            return Err(Error::http_status(503, "blip"));
        }
        tokio::time::sleep(max_wait).await;
        Ok(FetchOutcome::Pending)
    }
}

#[tokio::test(start_paused = true)]
async fn test_scattered_fetch_failures_do_not_fail_cycle() {
    let source = Arc::new(Flaky::default());
    let config = test_config()
        .with_window(Duration::from_secs(40), Duration::from_secs(60))
        .with_fetch_retries(3, Duration::from_millis(100));
    let cycle = PullCycle::new(
        Arc::clone(&source) as Arc<dyn LogSource>,
        Arc::new(JsonEventDecoder::new()),
        config,
        Cancellation::new(),
    );
    let mut query = Recorder::default();
    let outcome = cycle.run(&[0], &mut query).await.unwrap();

    assert_eq!(outcome.positions(), vec![0]);
    assert_eq!(outcome.events_processed, 0);
    // far more failures than the retry budget, never two in a row
    assert!(source.calls.load(Ordering::SeqCst) > 8);
}

#[tokio::test(start_paused = true)]
async fn test_query_failure_fails_cycle() {
    let source = Arc::new(MemoryLogSource::new(1));
    fill(&source, 0, 10);

    let cycle = cycle_over(source, test_config());
    let mut query = Recorder {
        fail_after: Some(2),
        ..Recorder::default()
    };
    let err = cycle.run(&[0], &mut query).await.unwrap_err();

    assert!(matches!(err, Error::Query(_)));
    assert_eq!(query.seen.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_cycle() {
    let source = Arc::new(MemoryLogSource::new(2));
    let cycle = cycle_over(source, test_config());

    let cancel = cycle.cancellation().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        cancel.cancel();
    });

    let mut query = Recorder::default();
    let err = cycle.run(&[0, 0], &mut query).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[tokio::test]
async fn test_cancel_before_cycle() {
    let source = Arc::new(MemoryLogSource::new(1));
    let cycle = cycle_over(Arc::clone(&source), test_config());
    cycle.cancellation().cancel();

    let mut query = Recorder::default();
    assert!(matches!(
        cycle.run(&[0], &mut query).await,
        Err(Error::Cancelled)
    ));
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_partition() {
    let source: Arc<MemoryLogSource> = Arc::new(MemoryLogSource::new(1));
    assert_eq!(source.partitions().await.unwrap().len(), 1);

    let cycle = cycle_over(source, test_config());
    let mut query = Recorder::default();
    let err = cycle.run(&[0, 0], &mut query).await.unwrap_err();
    assert!(matches!(err, Error::UnknownPartition { partition: 1, count: 1 }));
}
