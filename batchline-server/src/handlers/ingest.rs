use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use batchline_core::{IngestRequest, IngestResponse, IngestionStatusResponse};

use crate::infra::app_state::AppState;
use crate::infra::errors::AppResult;

/// `POST /ingest`: split, enqueue and return the new ingestion id without
/// waiting for any processing.
pub async fn ingest_handler(
    State(state): State<AppState>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> AppResult<Json<IngestResponse>> {
    let Json(request) = payload?;
    let ingestion_id = state
        .service()
        .ingest(request.ids, request.priority)
        .await?;

    Ok(Json(IngestResponse { ingestion_id }))
}

/// `GET /status/{ingestion_id}`. Unknown and malformed ids are both 404.
pub async fn status_handler(
    State(state): State<AppState>,
    Path(ingestion_id): Path<String>,
) -> AppResult<Json<IngestionStatusResponse>> {
    Ok(Json(state.service().status_str(&ingestion_id)?))
}
