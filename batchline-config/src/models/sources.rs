use std::path::PathBuf;

use batchline_core::SchedulerConfig;
use serde::{Deserialize, Serialize};

use crate::loader::error::ConfigLoadError;
use crate::util::EnvSource;

/// Raw configuration as written in `batchline.toml` / `batchline.json`.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    pub scheduler: Option<SchedulerConfig>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Values read from environment variables. Unset or blank variables stay
/// `None` and leave lower-precedence values untouched.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub scheduler_json: Option<String>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub rate_limit_interval_ms: Option<u64>,
    pub processor_latency_ms: Option<u64>,
    pub processor_timeout_ms: Option<u64>,
    pub processor_max_attempts: Option<u16>,
}

impl EnvConfig {
    pub fn gather(env: &EnvSource) -> Result<Self, ConfigLoadError> {
        Ok(Self {
            config_path: env.var("BATCHLINE_CONFIG_PATH").map(PathBuf::from),
            scheduler_json: env.var("BATCHLINE_SCHEDULER_JSON"),
            server_host: env.var("SERVER_HOST"),
            server_port: env.parse_var("SERVER_PORT")?,
            rate_limit_interval_ms: env.parse_var("RATE_LIMIT_INTERVAL_MS")?,
            processor_latency_ms: env.parse_var("PROCESSOR_LATENCY_MS")?,
            processor_timeout_ms: env.parse_var("PROCESSOR_TIMEOUT_MS")?,
            processor_max_attempts: env.parse_var("PROCESSOR_MAX_ATTEMPTS")?,
        })
    }

    /// Apply the per-field scheduler overrides.
    pub fn apply_to(&self, scheduler: &mut SchedulerConfig) {
        if let Some(ms) = self.rate_limit_interval_ms {
            scheduler.rate_limit_interval_ms = ms;
        }
        if let Some(ms) = self.processor_latency_ms {
            scheduler.processor.simulated_latency_ms = ms;
        }
        if let Some(ms) = self.processor_timeout_ms {
            scheduler.processor.timeout_ms = Some(ms);
        }
        if let Some(attempts) = self.processor_max_attempts {
            scheduler.processor.max_attempts = attempts;
        }
    }
}
