use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{IngestError, Result};
use crate::types::ids::RecordId;

use super::batch::Batch;
use super::config::ProcessorConfig;

/// Result of one downstream call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub id: RecordId,
    pub data: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("record {id} failed: {reason}")]
    Failed { id: RecordId, reason: String },

    #[error("record {id} timed out after {timeout_ms}ms")]
    TimedOut { id: RecordId, timeout_ms: u64 },
}

impl ProcessError {
    pub fn record_id(&self) -> RecordId {
        match self {
            ProcessError::Failed { id, .. } | ProcessError::TimedOut { id, .. } => *id,
        }
    }
}

/// Downstream collaborator invoked once per record identifier.
#[async_trait]
pub trait RecordProcessor: Send + Sync {
    async fn process(&self, id: RecordId) -> std::result::Result<ProcessedRecord, ProcessError>;
}

/// Stand-in downstream system: waits a fixed latency and echoes the id.
#[derive(Clone, Debug)]
pub struct SimulatedProcessor {
    latency: Duration,
    failure_rate: f64,
}

impl SimulatedProcessor {
    pub fn new(config: &ProcessorConfig) -> Self {
        Self {
            latency: config.simulated_latency(),
            failure_rate: config.failure_rate.clamp(0.0, 1.0),
        }
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            failure_rate: 0.0,
        }
    }
}

#[async_trait]
impl RecordProcessor for SimulatedProcessor {
    async fn process(&self, id: RecordId) -> std::result::Result<ProcessedRecord, ProcessError> {
        tokio::time::sleep(self.latency).await;

        if self.failure_rate > 0.0 && rand::rng().random_bool(self.failure_rate) {
            return Err(ProcessError::Failed {
                id,
                reason: "simulated downstream failure".to_string(),
            });
        }

        Ok(ProcessedRecord {
            id,
            data: "processed".to_string(),
        })
    }
}

/// Timeout and retry policy applied around every downstream call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessorPolicy {
    pub timeout: Option<Duration>,
    pub max_attempts: u16,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for ProcessorPolicy {
    fn default() -> Self {
        Self::from_config(&ProcessorConfig::default())
    }
}

impl ProcessorPolicy {
    pub fn from_config(config: &ProcessorConfig) -> Self {
        Self {
            timeout: config.timeout(),
            max_attempts: config.max_attempts.max(1),
            backoff_base: config.backoff_base(),
            backoff_max: config.backoff_max(),
        }
    }

    /// Delay before attempt `attempt + 1`: base doubled per attempt, capped.
    pub fn backoff_for(&self, attempt: u16) -> Duration {
        let exponent = u32::from(attempt.saturating_sub(1)).min(16);
        self.backoff_base
            .saturating_mul(1u32 << exponent)
            .min(self.backoff_max)
    }

    pub async fn run(
        &self,
        processor: &dyn RecordProcessor,
        id: RecordId,
    ) -> std::result::Result<ProcessedRecord, ProcessError> {
        let mut attempt: u16 = 1;
        loop {
            let result = match self.timeout {
                Some(limit) => tokio::time::timeout(limit, processor.process(id))
                    .await
                    .unwrap_or_else(|_| {
                        Err(ProcessError::TimedOut {
                            id,
                            timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                        })
                    }),
                None => processor.process(id).await,
            };

            match result {
                Ok(record) => return Ok(record),
                Err(err) if attempt < self.max_attempts => {
                    let delay = self.backoff_for(attempt);
                    tracing::debug!(
                        target: "batch::processor",
                        record = id,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "downstream call failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Runs every record of a batch through the processor concurrently and waits
/// for all of them.
#[derive(Clone)]
pub struct BatchDispatcher {
    processor: Arc<dyn RecordProcessor>,
    policy: ProcessorPolicy,
}

impl fmt::Debug for BatchDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchDispatcher")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl BatchDispatcher {
    pub fn new(processor: Arc<dyn RecordProcessor>, policy: ProcessorPolicy) -> Self {
        Self { processor, policy }
    }

    pub fn policy(&self) -> &ProcessorPolicy {
        &self.policy
    }

    /// Succeeds only if every record succeeds; otherwise reports the first
    /// failure in record order. All calls run to completion either way.
    pub async fn dispatch(&self, batch: &Batch) -> Result<Vec<ProcessedRecord>> {
        let calls = batch
            .ids()
            .iter()
            .map(|&id| self.policy.run(self.processor.as_ref(), id));

        let mut records = Vec::with_capacity(batch.ids().len());
        let mut first_error = None;
        for result in join_all(calls).await {
            match result {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!(
                        target: "batch::processor",
                        batch = %batch.id(),
                        record = err.record_id(),
                        error = %err,
                        "downstream call gave up"
                    );
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(IngestError::Downstream(err)),
            None => Ok(records),
        }
    }
}
