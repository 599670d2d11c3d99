//! Run registry endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::registry::RunRecord;
use crate::state::AppState;

/// List all runs, newest first.
pub async fn list_runs(State(state): State<AppState>) -> Json<Vec<RunRecord>> {
    Json(state.registry.list().await)
}

/// Get a run by ID.
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RunRecord>, (StatusCode, String)> {
    let record = state
        .registry
        .get(id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Run {} not found", id)))?;

    Ok(Json(record))
}
