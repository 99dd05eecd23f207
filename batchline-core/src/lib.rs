//! # batchline core
//!
//! Bulk ingestion scheduling: requests carrying record identifiers and a
//! priority are split into batches of at most [`MAX_BATCH_SIZE`] records,
//! queued in global priority order, and drained by a single rate-limited
//! worker loop against a pluggable downstream processor.
//!
//! ## Architecture
//!
//! - [`orchestration::batch`]: `Batch` / `Ingestion` model and status transitions
//! - [`orchestration::queue`]: the pending-work priority queue
//! - [`orchestration::scheduler`]: the single drain loop and its rate limit
//! - [`orchestration::status`]: ingestion status aggregation
//! - [`orchestration::registry`]: process-wide ingestion lookup
//! - [`orchestration::processor`]: downstream collaborator contract plus
//!   timeout/retry policy
//! - [`service`]: the facade used by the HTTP layer
//!
//! All state is transient and lives for the lifetime of the process.
//!
//! ## Examples
//!
//! ```no_run
//! use batchline_core::{IngestionService, Priority, SchedulerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn run() -> batchline_core::Result<()> {
//!     let service = IngestionService::with_simulated_processor(&SchedulerConfig::default());
//!     let shutdown = CancellationToken::new();
//!     service.start(shutdown.clone())?;
//!
//!     let id = service.ingest(vec![1, 2, 3, 4, 5], Priority::High).await?;
//!     let report = service.status(&id)?;
//!     println!("{} -> {:?}", report.ingestion_id, report.status);
//!
//!     shutdown.cancel();
//!     Ok(())
//! }
//! ```

pub mod api_types;
pub mod error;
pub mod orchestration;
pub mod service;
pub mod types;

pub use api_types::{
    BatchStatusView, IngestRequest, IngestResponse, IngestionStatusResponse,
    PriorityDepth, QueueSnapshot,
};
pub use error::{IngestError, Result};
pub use orchestration::{
    MAX_BATCH_SIZE, Batch, BatchQueue, BatchStatus, Ingestion, IngestionRegistry,
    IngestionStatus, Priority, ProcessError, ProcessedRecord, ProcessorConfig,
    ProcessorPolicy, RecordProcessor, Scheduler, SchedulerConfig, SchedulerState,
    SimulatedProcessor, aggregate_status,
};
pub use service::IngestionService;
pub use types::ids::{BatchId, IngestionId, RecordId};
