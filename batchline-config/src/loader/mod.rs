pub mod error;

use std::fs;
use std::path::{Path, PathBuf};

use batchline_core::SchedulerConfig;

use crate::models::scheduler::SchedulerConfigSource;
use crate::models::sources::{EnvConfig, FileConfig};
use crate::models::{Config, ConfigMetadata, DEFAULT_HOST, DEFAULT_PORT, ServerConfig};
use crate::util::EnvSource;
use crate::validation::{self, ConfigWarnings};

use error::ConfigLoadError;

const DEFAULT_CONFIG_LOCATIONS: &[&str] = &[
    "batchline.toml",
    "batchline.json",
    "config/batchline.toml",
    "config/batchline.json",
];

/// Explicit values from the command line; highest precedence.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub rate_limit_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    /// Config file to use instead of `BATCHLINE_CONFIG_PATH` and the default
    /// locations. Must exist.
    pub config_path: Option<PathBuf>,
    /// `.env` file to read instead of the one discovered by `dotenvy`.
    pub env_file: Option<PathBuf>,
    /// Directory the default config locations are resolved against.
    /// Defaults to the working directory.
    pub base_dir: Option<PathBuf>,
    pub env: EnvSource,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.options.overrides = overrides;
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let mut env = self.options.env.clone();
        let env_file_loaded = self.load_env_file(&mut env)?;
        let env_config = EnvConfig::gather(&env)?;

        let (file_config, config_path) = self.load_file_config(&env_config)?;
        let config = self.compose_config(file_config, config_path, &env_config, env_file_loaded)?;

        let warnings = validation::apply_guard_rails(&config)?;
        Ok(ConfigLoad { config, warnings })
    }

    /// Returns whether a `.env` file was found and applied. A missing file
    /// is not an error; a malformed one is.
    fn load_env_file(&self, env: &mut EnvSource) -> Result<bool, ConfigLoadError> {
        let found = |result: Result<(), dotenvy::Error>| match result {
            Ok(()) => Ok(true),
            Err(dotenvy::Error::Io(_)) => Ok(false),
            Err(err) => Err(err),
        };

        if matches!(env, EnvSource::Process) {
            let loaded = match &self.options.env_file {
                Some(path) => found(dotenvy::from_path(path))?,
                None => found(dotenvy::dotenv().map(|_| ()))?,
            };
            return Ok(loaded);
        }

        // A fixed environment only sees an explicitly named file.
        let Some(path) = &self.options.env_file else {
            return Ok(false);
        };
        let iter = match dotenvy::from_path_iter(path) {
            Ok(iter) => iter,
            Err(dotenvy::Error::Io(_)) => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        let entries = iter.collect::<Result<Vec<_>, _>>()?;
        env.absorb(entries);
        Ok(true)
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env_config.config_path.clone());

        let path = match explicit {
            Some(path) => {
                let path = self.resolve(&path);
                if !path.exists() {
                    return Err(ConfigLoadError::MissingConfig { path });
                }
                path
            }
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(|candidate| self.resolve(Path::new(candidate)))
                .find(|candidate| candidate.exists())
            {
                Some(path) => path,
                None => return Ok((None, None)),
            },
        };

        let contents = fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
            path: path.clone(),
            source,
        })?;

        let file_config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents).map_err(|source| {
                ConfigLoadError::ParseJson {
                    path: path.clone(),
                    source,
                }
            })?,
            _ => toml::from_str(&contents).map_err(|source| ConfigLoadError::ParseToml {
                path: path.clone(),
                source,
            })?,
        };

        Ok((Some(file_config), Some(path)))
    }

    fn compose_config(
        &self,
        file_config: Option<FileConfig>,
        config_path: Option<PathBuf>,
        env: &EnvConfig,
        env_file_loaded: bool,
    ) -> Result<Config, ConfigLoadError> {
        let FileConfig {
            server: file_server,
            scheduler: file_scheduler,
        } = file_config.unwrap_or_default();
        let overrides = &self.options.overrides;

        let server = ServerConfig {
            host: overrides
                .host
                .clone()
                .or_else(|| env.server_host.clone())
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: overrides
                .port
                .or(env.server_port)
                .or(file_server.port)
                .unwrap_or(DEFAULT_PORT),
        };

        let (mut scheduler, scheduler_source) = match (&env.scheduler_json, file_scheduler) {
            (Some(raw), _) => (
                serde_json::from_str::<SchedulerConfig>(raw)
                    .map_err(|source| ConfigLoadError::InlineScheduler { source })?,
                SchedulerConfigSource::EnvInline,
            ),
            (None, Some(from_file)) => (
                from_file,
                config_path
                    .clone()
                    .map(SchedulerConfigSource::File)
                    .unwrap_or_default(),
            ),
            (None, None) => (SchedulerConfig::default(), SchedulerConfigSource::Default),
        };

        env.apply_to(&mut scheduler);
        if let Some(ms) = overrides.rate_limit_interval_ms {
            scheduler.rate_limit_interval_ms = ms;
        }

        Ok(Config {
            server,
            scheduler,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded,
                scheduler_source,
            },
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.options.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}
