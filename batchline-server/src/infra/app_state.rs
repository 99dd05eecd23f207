use std::{fmt, sync::Arc};

use batchline_config::Config;
use batchline_core::IngestionService;

#[derive(Clone)]
pub struct AppState {
    pub service: IngestionService,
    pub config: Arc<Config>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(service: IngestionService, config: Arc<Config>) -> Self {
        Self { service, config }
    }

    /// State with a simulated processor built from `config`. The drain loop
    /// is not started.
    pub fn from_config(config: Config) -> Self {
        let service = IngestionService::with_simulated_processor(&config.scheduler);
        Self::new(service, Arc::new(config))
    }

    pub fn service(&self) -> &IngestionService {
        &self.service
    }
}
