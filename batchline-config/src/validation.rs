use serde::Serialize;
use thiserror::Error;

use super::models::Config;

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("processor.max_attempts must be at least 1")]
    ZeroMaxAttempts,
    #[error("processor.failure_rate must be within 0.0..=1.0, got {value}")]
    FailureRateOutOfRange { value: f64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigWarning {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

/// Reject settings the drain loop cannot run with and flag ones that are
/// legal but probably unintended.
pub fn apply_guard_rails(config: &Config) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();
    let scheduler = &config.scheduler;
    let processor = &scheduler.processor;

    if processor.max_attempts == 0 {
        return Err(ConfigGuardRailError::ZeroMaxAttempts);
    }

    if !(0.0..=1.0).contains(&processor.failure_rate) {
        return Err(ConfigGuardRailError::FailureRateOutOfRange {
            value: processor.failure_rate,
        });
    }

    if scheduler.rate_limit_interval_ms == 0 {
        warnings.push_with_hint(
            "rate_limit_interval_ms is 0; batches will be dispatched back to back",
            "Set RATE_LIMIT_INTERVAL_MS to throttle the downstream system",
        );
    }

    if processor.failure_rate > 0.0 {
        warnings.push(format!(
            "simulated processor will fail {:.1}% of calls",
            processor.failure_rate * 100.0
        ));
    }

    if processor.backoff_base_ms > processor.backoff_max_ms {
        warnings.push(format!(
            "backoff_base_ms ({}) exceeds backoff_max_ms ({}); every retry waits backoff_max_ms",
            processor.backoff_base_ms, processor.backoff_max_ms
        ));
    }

    if processor.max_attempts > 1 && processor.timeout_ms.is_none() {
        warnings.push_with_hint(
            "retries are enabled without a timeout; a stuck call is never retried",
            "Set PROCESSOR_TIMEOUT_MS so hung calls fail and retry",
        );
    }

    Ok(warnings)
}
