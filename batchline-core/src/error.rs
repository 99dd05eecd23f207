use thiserror::Error;

use crate::orchestration::processor::ProcessError;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Ingestion not found: {0}")]
    NotFound(String),

    #[error("Downstream error: {0}")]
    Downstream(#[from] ProcessError),

    #[error("Drain loop is already running")]
    SchedulerAlreadyRunning,
}

impl IngestError {
    pub fn is_validation(&self) -> bool {
        matches!(self, IngestError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
