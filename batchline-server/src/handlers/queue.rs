use axum::{Json, extract::State};
use batchline_core::QueueSnapshot;
use serde_json::{Value, json};

use crate::infra::app_state::AppState;

pub async fn queue_handler(State(state): State<AppState>) -> Json<QueueSnapshot> {
    Json(state.service().snapshot().await)
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
