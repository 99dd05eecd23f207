use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    ingest::{ingest_handler, status_handler},
    queue::{health_handler, queue_handler},
};
use crate::infra::app_state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ingest", post(ingest_handler))
        .route("/status/{ingestion_id}", get(status_handler))
        .route("/queue", get(queue_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
