use std::path::PathBuf;

use serde::Serialize;

/// Source that produced the base scheduler section, before individual
/// environment and CLI overrides.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum SchedulerConfigSource {
    #[default]
    Default,
    File(PathBuf),
    EnvInline,
}
