//! Configuration loading for batchline.
//!
//! Values are layered, lowest precedence first: built-in defaults, an
//! optional TOML/JSON file, inline scheduler JSON from the environment,
//! individual environment overrides, and finally explicit overrides handed
//! in by the CLI. `.env` files are honoured through `dotenvy`.

pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, ConfigLoaderOptions, ConfigOverrides, error::ConfigLoadError};
pub use models::scheduler::SchedulerConfigSource;
pub use models::{Config, ConfigMetadata, ServerConfig};
pub use util::EnvSource;
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
