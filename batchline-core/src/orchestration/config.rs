use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Knobs that tune the drain loop and the downstream processor.
///
/// All fields carry defaults so a deployment can override a single value
/// without supplying the full payload.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Fixed pause (milliseconds) after every batch before the next dequeue.
    /// Applies regardless of priority or of how long the batch took.
    pub rate_limit_interval_ms: u64,
    /// Per-record downstream call tuning.
    pub processor: ProcessorConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            rate_limit_interval_ms: 5_000,
            processor: ProcessorConfig::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn rate_limit_interval(&self) -> Duration {
        Duration::from_millis(self.rate_limit_interval_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Latency of the built-in simulated downstream call.
    pub simulated_latency_ms: u64,
    /// Optional per-attempt timeout. `None` waits indefinitely, so a stuck
    /// call stalls the batch and the drain loop with it.
    pub timeout_ms: Option<u64>,
    /// Attempts per record before the batch is marked failed. Must be >= 1.
    pub max_attempts: u16,
    /// Backoff before the second attempt; doubles per attempt.
    pub backoff_base_ms: u64,
    /// Upper bound for the doubling backoff.
    pub backoff_max_ms: u64,
    /// Probability (0.0..=1.0) that the simulated call fails. Only useful to
    /// exercise the failure path.
    pub failure_rate: f64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            simulated_latency_ms: 1_000,
            timeout_ms: None,
            max_attempts: 1,
            backoff_base_ms: 250,
            backoff_max_ms: 5_000,
            failure_rate: 0.0,
        }
    }
}

impl ProcessorConfig {
    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }
}
