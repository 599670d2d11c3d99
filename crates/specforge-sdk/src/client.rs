//! SpecForge client implementation.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use specforge_core::{ArtifactKind, ProjectRequest, ResponseEnvelope, RunStatus};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ClientError, Result};
use crate::stream::EventStream;

/// Client for a SpecForge node.
#[derive(Clone)]
pub struct SpecForgeClient {
    /// Base URL of the node.
    base_url: String,

    http_client: reqwest::Client,
}

/// A run as the node reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub project_name: String,
    pub status: RunStatus,
    pub current_stage: Option<ArtifactKind>,
    pub completed_stages: Vec<ArtifactKind>,
    pub files: Vec<String>,
    pub persisted: Option<bool>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    action: &'static str,
    #[serde(flatten)]
    project: &'a ProjectRequest,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    action: &'static str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    message: String,
}

impl SpecForgeClient {
    /// Connect to a node, checking `/health` first.
    pub async fn connect(url: &str) -> Result<Self> {
        let base_url = url.trim_end_matches('/').to_string();
        let http_client = reqwest::Client::new();

        http_client
            .get(format!("{base_url}/health"))
            .send()
            .await?
            .error_for_status()?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate the four documents for a project.
    ///
    /// Pipeline failures come back as an envelope with `success: false`; only
    /// transport problems are errors.
    pub async fn generate_spec(&self, request: &ProjectRequest) -> Result<ResponseEnvelope> {
        debug!(project = %request.project_name, "submitting generate_spec");

        let response = self
            .http_client
            .post(self.url("/invocations"))
            .json(&GenerateRequest {
                action: "generate_spec",
                project: request,
            })
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::BAD_REQUEST | StatusCode::SERVICE_UNAVAILABLE => {
                Ok(response.json().await?)
            }
            status => Err(api_error(status, response).await),
        }
    }

    /// Send a free-form prompt and return the model's reply.
    pub async fn chat(&self, prompt: &str) -> Result<String> {
        let response = self
            .http_client
            .post(self.url("/invocations"))
            .json(&ChatRequest {
                action: "chat",
                prompt,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response.status(), response).await);
        }

        let reply: ChatReply = response.json().await?;
        Ok(reply.result)
    }

    /// Every run the node knows about, newest first.
    pub async fn runs(&self) -> Result<Vec<RunSummary>> {
        let response = self
            .http_client
            .get(self.url("/api/v1/runs"))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response.status(), response).await);
        }
        Ok(response.json().await?)
    }

    pub async fn run(&self, run_id: Uuid) -> Result<RunSummary> {
        let response = self
            .http_client
            .get(self.url(&format!("/api/v1/runs/{run_id}")))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ClientError::RunNotFound(run_id)),
            status if status.is_success() => Ok(response.json().await?),
            status => Err(api_error(status, response).await),
        }
    }

    /// Subscribe to pipeline events, optionally for a single run.
    ///
    /// Returns once the node has confirmed the subscription, so a run started
    /// afterwards is observed from its first event.
    pub async fn events(&self, run_id: Option<Uuid>) -> Result<EventStream> {
        let mut url = format!("{}/ws/events", self.ws_base());
        if let Some(id) = run_id {
            url.push_str(&format!("?run_id={id}"));
        }
        EventStream::connect(&url).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn ws_base(&self) -> String {
        self.base_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1)
    }
}

async fn api_error(status: StatusCode, response: reqwest::Response) -> ClientError {
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorReply>(&body)
        .map(|reply| reply.message)
        .unwrap_or(body);
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_shape() {
        let project = ProjectRequest::builder()
            .project_name("Task Tracker")
            .feature("Boards")
            .build()
            .unwrap();
        let body = serde_json::to_value(GenerateRequest {
            action: "generate_spec",
            project: &project,
        })
        .unwrap();

        assert_eq!(body["action"], "generate_spec");
        assert_eq!(body["projectName"], "Task Tracker");
        assert_eq!(body["features"][0], "Boards");
        assert!(body.get("outputDir").is_none());
    }

    #[test]
    fn test_ws_base() {
        let client = SpecForgeClient {
            base_url: "https://specs.example.com".to_string(),
            http_client: reqwest::Client::new(),
        };
        assert_eq!(client.ws_base(), "wss://specs.example.com");

        let client = SpecForgeClient {
            base_url: "http://127.0.0.1:8080".to_string(),
            http_client: reqwest::Client::new(),
        };
        assert_eq!(client.ws_base(), "ws://127.0.0.1:8080");
    }
}
