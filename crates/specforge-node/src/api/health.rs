//! Liveness endpoints.

use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model: String,
}

/// Liveness probe in the hosting runtime's format.
pub async fn ping() -> Json<Value> {
    Json(json!({ "status": "Healthy" }))
}

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.orchestrator.model().model_name().to_string(),
    })
}
