use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api_types::{BatchStatusView, IngestionStatusResponse, PriorityDepth, QueueSnapshot};
use crate::error::{IngestError, Result};
use crate::orchestration::{
    BatchDispatcher, BatchQueue, CreationClock, Ingestion, IngestionRegistry, Priority,
    ProcessorPolicy, RecordProcessor, Scheduler, SchedulerConfig, SimulatedProcessor,
    aggregate_status,
};
use crate::types::ids::{IngestionId, RecordId};

/// Entry point used by the HTTP handlers: accepts ingest requests, answers
/// status queries and owns the drain loop.
///
/// Cloning is cheap; all clones share one registry, queue and scheduler.
#[derive(Clone, Debug)]
pub struct IngestionService {
    registry: Arc<IngestionRegistry>,
    queue: Arc<BatchQueue>,
    scheduler: Scheduler,
    clock: Arc<CreationClock>,
}

impl IngestionService {
    pub fn new(config: &SchedulerConfig, processor: Arc<dyn RecordProcessor>) -> Self {
        let queue = Arc::new(BatchQueue::new());
        let dispatcher =
            BatchDispatcher::new(processor, ProcessorPolicy::from_config(&config.processor));
        let scheduler = Scheduler::new(
            Arc::clone(&queue),
            dispatcher,
            config.rate_limit_interval(),
        );

        Self {
            registry: Arc::new(IngestionRegistry::new()),
            queue,
            scheduler,
            clock: Arc::new(CreationClock::new()),
        }
    }

    pub fn with_simulated_processor(config: &SchedulerConfig) -> Self {
        Self::new(config, Arc::new(SimulatedProcessor::new(&config.processor)))
    }

    /// Start the drain loop; see [`Scheduler::start`].
    pub fn start(&self, cancel: CancellationToken) -> Result<JoinHandle<()>> {
        self.scheduler.start(cancel)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Split, register and enqueue. Returns as soon as the batches are
    /// queued; processing happens later on the drain loop.
    ///
    /// The ingestion is registered before its batches become visible to the
    /// drain loop, so its id is resolvable by the time the caller sees it.
    pub async fn ingest(&self, ids: Vec<RecordId>, priority: Priority) -> Result<IngestionId> {
        let ingestion = Arc::new(Ingestion::split(&ids, priority, &self.clock)?);
        let ingestion_id = ingestion.id();

        self.registry.insert(Arc::clone(&ingestion));
        let depth = self
            .queue
            .enqueue_many(ingestion.batches().iter().cloned())
            .await;
        self.scheduler.signal();

        info!(
            target: "batch::ingest",
            ingestion = %ingestion_id,
            %priority,
            records = ids.len(),
            batches = ingestion.batches().len(),
            queue_depth = depth,
            "ingestion accepted"
        );

        Ok(ingestion_id)
    }

    /// Snapshot of an ingestion and its batches, in creation order. Status is
    /// derived from the live batch states; nothing is mutated.
    pub fn status(&self, id: &IngestionId) -> Result<IngestionStatusResponse> {
        let ingestion = self
            .registry
            .get(id)
            .ok_or_else(|| IngestError::NotFound(id.to_string()))?;

        let batches: Vec<BatchStatusView> = ingestion
            .batches()
            .iter()
            .map(|batch| BatchStatusView {
                batch_id: batch.id(),
                ids: batch.ids().to_vec(),
                status: batch.status(),
                error: batch.failure().map(str::to_owned),
            })
            .collect();

        Ok(IngestionStatusResponse {
            ingestion_id: ingestion.id(),
            status: aggregate_status(batches.iter().map(|b| b.status)),
            batches,
        })
    }

    /// Like [`IngestionService::status`] for a raw path segment. Anything
    /// that does not parse as an ingestion id is simply unknown.
    pub fn status_str(&self, raw: &str) -> Result<IngestionStatusResponse> {
        let id: IngestionId = raw
            .parse()
            .map_err(|_| IngestError::NotFound(raw.to_string()))?;
        self.status(&id)
    }

    pub async fn snapshot(&self) -> QueueSnapshot {
        let counts = self.queue.pending_counts().await;
        QueueSnapshot {
            scheduler: self.scheduler.state(),
            pending: counts.total(),
            pending_by_priority: PriorityDepth {
                high: counts.high,
                medium: counts.medium,
                low: counts.low,
            },
            ingestions: self.registry.len(),
        }
    }
}
