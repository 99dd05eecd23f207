//! # batchline server
//!
//! axum HTTP shell over [`batchline_core::IngestionService`]:
//!
//! - `POST /ingest` accepts `{ "ids": [..], "priority": "HIGH" | "MEDIUM" | "LOW" }`
//!   and answers `{ "ingestion_id": .. }` immediately
//! - `GET /status/{ingestion_id}` reports the ingestion and per-batch status
//! - `GET /queue` and `GET /health` for operators

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;

use axum::Router;

/// Build the application router. The caller owns the drain loop lifecycle.
pub fn create_app(state: AppState) -> Router {
    routes::create_router(state)
}
