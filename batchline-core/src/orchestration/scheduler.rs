use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{IngestError, Result};

use super::processor::BatchDispatcher;
use super::queue::BatchQueue;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    /// Waiting for a wake-up; the queue was empty at last check.
    Idle,
    /// Working through the queue, including the pause between batches.
    Draining,
}

struct SchedulerInner {
    queue: Arc<BatchQueue>,
    dispatcher: BatchDispatcher,
    rate_limit: Duration,
    wake: Notify,
    started: AtomicBool,
    draining: AtomicBool,
}

/// The single drain loop.
///
/// One long-lived task owns all dequeuing, so at most one batch is ever in
/// flight. Producers call [`Scheduler::signal`] after enqueueing; a signal
/// that arrives while the loop is busy is kept and consumed on the next idle
/// check, so no wake-up is lost and no second loop is spawned.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state())
            .field("rate_limit", &self.inner.rate_limit)
            .field("started", &self.inner.started.load(Ordering::Relaxed))
            .finish()
    }
}

impl Scheduler {
    pub fn new(queue: Arc<BatchQueue>, dispatcher: BatchDispatcher, rate_limit: Duration) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                queue,
                dispatcher,
                rate_limit,
                wake: Notify::new(),
                started: AtomicBool::new(false),
                draining: AtomicBool::new(false),
            }),
        }
    }

    /// Spawn the drain loop. Fails if it was already started; the loop runs
    /// until `cancel` fires.
    pub fn start(&self, cancel: CancellationToken) -> Result<JoinHandle<()>> {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return Err(IngestError::SchedulerAlreadyRunning);
        }

        info!(
            target: "batch::scheduler",
            rate_limit_ms = self.inner.rate_limit.as_millis() as u64,
            "drain loop starting"
        );

        let inner = Arc::clone(&self.inner);
        Ok(tokio::spawn(async move { inner.run(cancel).await }))
    }

    /// Wake the drain loop if it is idle. Cheap; safe to call on every
    /// enqueue.
    pub fn signal(&self) {
        self.inner.wake.notify_one();
    }

    pub fn state(&self) -> SchedulerState {
        if self.inner.draining.load(Ordering::Acquire) {
            SchedulerState::Draining
        } else {
            SchedulerState::Idle
        }
    }

    pub fn rate_limit(&self) -> Duration {
        self.inner.rate_limit
    }
}

impl SchedulerInner {
    async fn run(&self, cancel: CancellationToken) {
        loop {
            self.drain(&cancel).await;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.wake.notified() => {
                    debug!(target: "batch::scheduler", "drain loop woken");
                }
            }
        }
        info!(target: "batch::scheduler", "drain loop stopped");
    }

    /// Dequeue and process until the queue is empty or shutdown is requested.
    async fn drain(&self, cancel: &CancellationToken) {
        self.draining.store(true, Ordering::Release);

        while !cancel.is_cancelled() {
            let Some(batch) = self.queue.pop_next().await else {
                break;
            };

            info!(
                target: "batch::scheduler",
                batch = %batch.id(),
                ingestion = %batch.ingestion_id(),
                priority = %batch.priority(),
                records = batch.ids().len(),
                "batch triggered"
            );

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.dispatcher.dispatch(&batch) => Some(result),
            };

            match outcome {
                Some(Ok(records)) => {
                    batch.mark_completed();
                    info!(
                        target: "batch::scheduler",
                        batch = %batch.id(),
                        processed = records.len(),
                        "batch completed"
                    );
                }
                Some(Err(err)) => {
                    batch.mark_failed(err.to_string());
                    warn!(
                        target: "batch::scheduler",
                        batch = %batch.id(),
                        error = %err,
                        "batch failed"
                    );
                }
                None => {
                    warn!(
                        target: "batch::scheduler",
                        batch = %batch.id(),
                        "shutdown while batch in flight; leaving it triggered"
                    );
                    break;
                }
            }

            // Fixed pause after every batch, whatever its priority or runtime.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.rate_limit) => {}
            }
        }

        self.draining.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::batch::{Batch, BatchStatus, CreationClock, Ingestion, Priority};
    use crate::orchestration::processor::{
        ProcessError, ProcessedRecord, ProcessorPolicy, RecordProcessor,
    };
    use crate::types::ids::RecordId;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Records the time of every call; fails ids listed in `fail`.
    struct RecordingProcessor {
        latency: Duration,
        fail: Vec<RecordId>,
        calls: Mutex<Vec<(RecordId, Instant)>>,
    }

    impl RecordingProcessor {
        fn new(latency: Duration) -> Self {
            Self {
                latency,
                fail: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(mut self, ids: &[RecordId]) -> Self {
            self.fail.extend_from_slice(ids);
            self
        }

        fn call_order(&self) -> Vec<RecordId> {
            self.calls.lock().unwrap().iter().map(|(id, _)| *id).collect()
        }

        fn called_at(&self, id: RecordId) -> Instant {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .find(|(called, _)| *called == id)
                .map(|(_, at)| *at)
                .expect("record was processed")
        }
    }

    #[async_trait]
    impl RecordProcessor for RecordingProcessor {
        async fn process(&self, id: RecordId) -> std::result::Result<ProcessedRecord, ProcessError> {
            self.calls.lock().unwrap().push((id, Instant::now()));
            tokio::time::sleep(self.latency).await;
            if self.fail.contains(&id) {
                return Err(ProcessError::Failed {
                    id,
                    reason: "rejected".to_string(),
                });
            }
            Ok(ProcessedRecord {
                id,
                data: "processed".to_string(),
            })
        }
    }

    struct Harness {
        queue: Arc<BatchQueue>,
        scheduler: Scheduler,
        processor: Arc<RecordingProcessor>,
        clock: CreationClock,
    }

    impl Harness {
        fn new(processor: RecordingProcessor, rate_limit: Duration) -> Self {
            let queue = Arc::new(BatchQueue::new());
            let processor = Arc::new(processor);
            let dispatcher = BatchDispatcher::new(
                processor.clone(),
                ProcessorPolicy {
                    timeout: None,
                    max_attempts: 1,
                    backoff_base: Duration::from_millis(10),
                    backoff_max: Duration::from_millis(10),
                },
            );
            Self {
                scheduler: Scheduler::new(queue.clone(), dispatcher, rate_limit),
                queue,
                processor,
                clock: CreationClock::new(),
            }
        }

        async fn submit(&self, ids: &[RecordId], priority: Priority) -> Ingestion {
            let ingestion = Ingestion::split(ids, priority, &self.clock).expect("split");
            self.queue
                .enqueue_many(ingestion.batches().iter().cloned())
                .await;
            self.scheduler.signal();
            ingestion
        }
    }

    async fn wait_terminal(batches: &[Arc<Batch>]) {
        while !batches.iter().all(|b| b.status().is_terminal()) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn drains_in_priority_order() {
        let harness = Harness::new(RecordingProcessor::new(Duration::from_secs(1)), Duration::from_secs(5));
        let low = harness.submit(&[100], Priority::Low).await;
        let medium = harness.submit(&[20, 21, 22, 23], Priority::Medium).await;
        let high = harness.submit(&[1, 2], Priority::High).await;

        let cancel = CancellationToken::new();
        let handle = harness.scheduler.start(cancel.clone()).expect("start");

        for ingestion in [&low, &medium, &high] {
            wait_terminal(ingestion.batches()).await;
        }

        let order = harness.processor.call_order();
        let position = |id| order.iter().position(|&c| c == id).expect("called");
        assert!(position(1) < position(20));
        assert!(position(2) < position(20));
        assert!(position(22) < position(23));
        assert!(position(23) < position(100));

        cancel.cancel();
        handle.await.expect("join");
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_rate_limit_between_batches() {
        let latency = Duration::from_secs(1);
        let rate_limit = Duration::from_secs(5);
        let harness = Harness::new(RecordingProcessor::new(latency), rate_limit);

        let cancel = CancellationToken::new();
        let _handle = harness.scheduler.start(cancel.clone()).expect("start");
        let ingestion = harness.submit(&[1, 2, 3, 4], Priority::High).await;
        wait_terminal(ingestion.batches()).await;

        let gap = harness.processor.called_at(4) - harness.processor.called_at(1);
        assert!(gap >= latency + rate_limit, "gap was {gap:?}");
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn one_batch_in_flight_at_a_time() {
        let harness = Harness::new(RecordingProcessor::new(Duration::from_secs(1)), Duration::from_secs(5));
        let cancel = CancellationToken::new();
        let _handle = harness.scheduler.start(cancel.clone()).expect("start");

        let ingestion = harness.submit(&[1, 2, 3, 4, 5, 6], Priority::Medium).await;
        tokio::time::sleep(Duration::from_millis(500)).await;

        let statuses: Vec<_> = ingestion.batches().iter().map(|b| b.status()).collect();
        assert_eq!(statuses, vec![BatchStatus::Triggered, BatchStatus::YetToStart]);
        assert_eq!(harness.scheduler.state(), SchedulerState::Draining);
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_batch_does_not_stop_the_loop() {
        let harness = Harness::new(
            RecordingProcessor::new(Duration::from_millis(100)).failing(&[2]),
            Duration::from_millis(500),
        );
        let cancel = CancellationToken::new();
        let _handle = harness.scheduler.start(cancel.clone()).expect("start");

        let ingestion = harness.submit(&[1, 2, 3, 4], Priority::High).await;
        wait_terminal(ingestion.batches()).await;

        let batches = ingestion.batches();
        assert_eq!(batches[0].status(), BatchStatus::Failed);
        assert!(batches[0].failure().expect("error kept").contains("record 2"));
        assert_eq!(batches[1].status(), BatchStatus::Completed);
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn returns_to_idle_and_wakes_on_signal() {
        let harness = Harness::new(RecordingProcessor::new(Duration::from_millis(10)), Duration::from_millis(100));
        let cancel = CancellationToken::new();
        let _handle = harness.scheduler.start(cancel.clone()).expect("start");

        let first = harness.submit(&[1], Priority::Low).await;
        wait_terminal(first.batches()).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(harness.scheduler.state(), SchedulerState::Idle);

        let second = harness.submit(&[2], Priority::Low).await;
        wait_terminal(second.batches()).await;
        assert_eq!(harness.processor.call_order(), vec![1, 2]);
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_rejected() {
        let harness = Harness::new(RecordingProcessor::new(Duration::ZERO), Duration::ZERO);
        let cancel = CancellationToken::new();
        let handle = harness.scheduler.start(cancel.clone()).expect("first start");

        let err = harness
            .scheduler
            .start(cancel.clone())
            .expect_err("second start");
        assert!(matches!(err, IngestError::SchedulerAlreadyRunning));

        cancel.cancel();
        handle.await.expect("loop exits on cancel");
    }
}
