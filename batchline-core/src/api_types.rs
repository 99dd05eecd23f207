//! Request and response bodies shared by the HTTP layer and the service.

use serde::{Deserialize, Serialize};

use crate::orchestration::{BatchStatus, IngestionStatus, Priority, SchedulerState};
use crate::types::ids::{BatchId, IngestionId, RecordId};

/// Body of `POST /ingest`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestRequest {
    pub ids: Vec<RecordId>,
    pub priority: Priority,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub ingestion_id: IngestionId,
}

/// Body of `GET /status/{ingestion_id}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionStatusResponse {
    pub ingestion_id: IngestionId,
    pub status: IngestionStatus,
    /// In creation order.
    pub batches: Vec<BatchStatusView>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatusView {
    pub batch_id: BatchId,
    pub ids: Vec<RecordId>,
    pub status: BatchStatus,
    /// Present only for failed batches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityDepth {
    #[serde(rename = "HIGH")]
    pub high: usize,
    #[serde(rename = "MEDIUM")]
    pub medium: usize,
    #[serde(rename = "LOW")]
    pub low: usize,
}

/// Body of `GET /queue`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub scheduler: SchedulerState,
    pub pending: usize,
    pub pending_by_priority: PriorityDepth,
    /// Ingestions accepted since startup.
    pub ingestions: usize,
}
