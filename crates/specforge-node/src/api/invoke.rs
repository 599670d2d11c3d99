//! The `/invocations` entrypoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use specforge_core::{ProjectRequest, ResponseEnvelope, SpecForgeError};
use specforge_model::InvocationContext;
use tracing::{info, warn};

use crate::state::AppState;

/// Request body. `action` selects the operation and defaults to chat.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
    pub action: Option<String>,

    /// Chat message.
    pub prompt: Option<String>,

    pub project_name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    pub output_dir: Option<String>,
}

impl InvocationRequest {
    fn into_project(self) -> ProjectRequest {
        ProjectRequest {
            project_name: self.project_name.unwrap_or_default(),
            description: self.description,
            features: self.features,
            tech_stack: self.tech_stack,
            output_dir: self.output_dir,
        }
    }
}

/// Reply to a chat invocation.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub result: String,
}

/// Error body for chat failures.
#[derive(Debug, Serialize)]
pub struct ChatError {
    pub success: bool,
    pub message: String,
}

fn chat_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ChatError {
            success: false,
            message: message.into(),
        }),
    )
        .into_response()
}

/// Dispatch on `action`. Anything other than `generate_spec` is a chat.
///
/// Bodies that fail to deserialize are answered with a failure envelope.
pub async fn invoke(
    State(state): State<AppState>,
    payload: Result<Json<InvocationRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "rejected invocation body");
            let err = SpecForgeError::invalid_request(rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(ResponseEnvelope::failure(None, None, &err)),
            )
                .into_response();
        }
    };

    match req.action.as_deref() {
        Some("generate_spec") => generate_spec(state, req.into_project()).await,
        _ => chat(state, req.prompt).await,
    }
}

async fn generate_spec(state: AppState, request: ProjectRequest) -> Response {
    info!(project = %request.project_name, "spec generation requested");

    let token = state.shutdown.child_token();
    let outcome = state.orchestrator.run_outcome(request, token).await;

    (status_for(outcome.error.as_ref()), Json(outcome.envelope)).into_response()
}

/// Pipeline failures are reported in the envelope; only rejected input and
/// cancellation change the status code.
fn status_for(error: Option<&SpecForgeError>) -> StatusCode {
    match error {
        Some(SpecForgeError::InvalidRequest { .. }) => StatusCode::BAD_REQUEST,
        Some(SpecForgeError::Cancelled { .. }) => StatusCode::SERVICE_UNAVAILABLE,
        Some(
            SpecForgeError::Invocation { .. }
            | SpecForgeError::Model(_)
            | SpecForgeError::MalformedArtifact { .. }
            | SpecForgeError::Persistence { .. }
            | SpecForgeError::Config(_)
            | SpecForgeError::Serialization(_)
            | SpecForgeError::Internal(_),
        )
        | None => StatusCode::OK,
    }
}

async fn chat(state: AppState, prompt: Option<String>) -> Response {
    let Some(prompt) = prompt.filter(|p| !p.trim().is_empty()) else {
        return chat_error(StatusCode::BAD_REQUEST, "prompt is required for chat action");
    };

    let context = InvocationContext::chat();
    let timeout = state.orchestrator.config().invoke_timeout;
    let model = state.orchestrator.model();

    let result = tokio::select! {
        _ = state.shutdown.cancelled() => {
            return chat_error(StatusCode::SERVICE_UNAVAILABLE, "server is shutting down");
        }
        result = tokio::time::timeout(timeout, model.invoke(&prompt, &context)) => {
            result.unwrap_or_else(|_| Err(context.error(format!(
                "no response within {}s",
                timeout.as_secs_f64()
            ))))
        }
    };

    match result {
        Ok(text) => Json(ChatResponse { result: text }).into_response(),
        Err(err) => {
            warn!(error = %err, "chat failed");
            chat_error(StatusCode::BAD_GATEWAY, err.to_string())
        }
    }
}
