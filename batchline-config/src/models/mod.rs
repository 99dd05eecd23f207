pub mod scheduler;
pub mod sources;

use std::path::PathBuf;

use batchline_core::SchedulerConfig;
use serde::Serialize;

use scheduler::SchedulerConfigSource;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

/// Effective configuration after every source has been applied.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub scheduler: SchedulerConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    /// `host:port` suitable for binding a listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Where the effective values came from.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
    pub scheduler_source: SchedulerConfigSource,
}
