use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};
use crate::types::ids::{BatchId, IngestionId, RecordId};

use super::status::{IngestionStatus, aggregate_status};

/// Upper bound on records per batch. A batch is the unit of status
/// transition and of rate limiting.
pub const MAX_BATCH_SIZE: usize = 3;

/// Request priority. Lower rank is served first.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "HIGH" => Ok(Priority::High),
            "MEDIUM" => Ok(Priority::Medium),
            "LOW" => Ok(Priority::Low),
            other => Err(IngestError::Validation(format!(
                "unknown priority `{other}`; expected HIGH, MEDIUM or LOW"
            ))),
        }
    }
}

/// Batch lifecycle. Transitions only move forward:
/// `YetToStart -> Triggered -> Completed | Failed`.
///
/// `Failed` means at least one downstream call gave up after its retries.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BatchStatus {
    YetToStart = 0,
    Triggered = 1,
    Completed = 2,
    Failed = 3,
}

impl BatchStatus {
    fn from_repr(raw: u8) -> Self {
        match raw {
            0 => BatchStatus::YetToStart,
            1 => BatchStatus::Triggered,
            2 => BatchStatus::Completed,
            _ => BatchStatus::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed)
    }

    /// Whether `next` is the immediate successor of `self`.
    pub fn can_advance_to(self, next: BatchStatus) -> bool {
        matches!(
            (self, next),
            (BatchStatus::YetToStart, BatchStatus::Triggered)
                | (BatchStatus::Triggered, BatchStatus::Completed)
                | (BatchStatus::Triggered, BatchStatus::Failed)
        )
    }
}

/// Queue tie-break key: wall-clock creation time plus a process-wide
/// sequence, so batches stamped within the same clock tick still order by
/// submission.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CreationStamp {
    pub at: DateTime<Utc>,
    pub sequence: u64,
}

/// Issues [`CreationStamp`]s with a strictly increasing sequence.
#[derive(Debug, Default)]
pub struct CreationClock {
    sequence: AtomicU64,
}

impl CreationClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stamp(&self, at: DateTime<Utc>) -> CreationStamp {
        CreationStamp {
            at,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        }
    }
}

/// A group of up to [`MAX_BATCH_SIZE`] records. Identity, records and
/// priority are fixed at creation; only the status moves, and only the
/// drain loop moves it.
pub struct Batch {
    id: BatchId,
    ingestion_id: IngestionId,
    ids: Vec<RecordId>,
    priority: Priority,
    created: CreationStamp,
    status: AtomicU8,
    failure: OnceLock<String>,
}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("id", &self.id)
            .field("ingestion_id", &self.ingestion_id)
            .field("ids", &self.ids)
            .field("priority", &self.priority)
            .field("sequence", &self.created.sequence)
            .field("status", &self.status())
            .finish()
    }
}

impl Batch {
    pub fn new(
        ingestion_id: IngestionId,
        ids: Vec<RecordId>,
        priority: Priority,
        created: CreationStamp,
    ) -> Self {
        debug_assert!(!ids.is_empty() && ids.len() <= MAX_BATCH_SIZE);
        Self {
            id: BatchId::new(),
            ingestion_id,
            ids,
            priority,
            created,
            status: AtomicU8::new(BatchStatus::YetToStart as u8),
            failure: OnceLock::new(),
        }
    }

    pub fn id(&self) -> BatchId {
        self.id
    }

    pub fn ingestion_id(&self) -> IngestionId {
        self.ingestion_id
    }

    pub fn ids(&self) -> &[RecordId] {
        &self.ids
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn created(&self) -> CreationStamp {
        self.created
    }

    /// Queue ordering key: `(priority rank, creation stamp)`.
    pub fn ordering_key(&self) -> (u8, CreationStamp) {
        (self.priority.rank(), self.created)
    }

    /// Live status; safe to read while the drain loop is mutating it.
    pub fn status(&self) -> BatchStatus {
        BatchStatus::from_repr(self.status.load(Ordering::Acquire))
    }

    /// First downstream error recorded for a failed batch.
    pub fn failure(&self) -> Option<&str> {
        self.failure.get().map(String::as_str)
    }

    fn advance(&self, from: BatchStatus, to: BatchStatus) -> bool {
        debug_assert!(from.can_advance_to(to));
        self.status
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn mark_triggered(&self) -> bool {
        self.advance(BatchStatus::YetToStart, BatchStatus::Triggered)
    }

    pub(crate) fn mark_completed(&self) -> bool {
        self.advance(BatchStatus::Triggered, BatchStatus::Completed)
    }

    pub(crate) fn mark_failed(&self, error: impl Into<String>) -> bool {
        if self.status() != BatchStatus::Triggered {
            return false;
        }
        // Publish the message before the status so readers that observe
        // `Failed` also observe the error.
        let _ = self.failure.set(error.into());
        self.advance(BatchStatus::Triggered, BatchStatus::Failed)
    }
}

/// One accepted ingest request and the batches carved out of it.
pub struct Ingestion {
    id: IngestionId,
    priority: Priority,
    created_at: DateTime<Utc>,
    batches: Vec<Arc<Batch>>,
}

impl fmt::Debug for Ingestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ingestion")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("created_at", &self.created_at)
            .field("batch_count", &self.batches.len())
            .finish()
    }
}

impl Ingestion {
    /// Partition `ids` into consecutive groups of at most
    /// [`MAX_BATCH_SIZE`], preserving input order. Every batch shares the
    /// request's wall-clock time and receives a strictly increasing sequence.
    pub fn split(ids: &[RecordId], priority: Priority, clock: &CreationClock) -> Result<Self> {
        if ids.is_empty() {
            return Err(IngestError::Validation(
                "ids must contain at least one record identifier".to_string(),
            ));
        }

        let id = IngestionId::new();
        let created_at = Utc::now();
        let batches = ids
            .chunks(MAX_BATCH_SIZE)
            .map(|chunk| {
                Arc::new(Batch::new(
                    id,
                    chunk.to_vec(),
                    priority,
                    clock.stamp(created_at),
                ))
            })
            .collect();

        Ok(Self {
            id,
            priority,
            created_at,
            batches,
        })
    }

    pub fn id(&self) -> IngestionId {
        self.id
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn batches(&self) -> &[Arc<Batch>] {
        &self.batches
    }

    /// Recomputed from the batches on every call; never cached.
    pub fn status(&self) -> IngestionStatus {
        aggregate_status(self.batches.iter().map(|batch| batch.status()))
    }
}
