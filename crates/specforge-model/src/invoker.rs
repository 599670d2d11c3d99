//! The model invocation seam.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use specforge_core::{ArtifactKind, Result, SpecForgeError};
use uuid::Uuid;

/// What a single model call is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationContext {
    /// Run the call belongs to.
    pub run_id: Uuid,

    /// Artifact being generated. `None` for free-form chat.
    pub stage: Option<ArtifactKind>,
}

impl InvocationContext {
    pub fn stage(run_id: Uuid, stage: ArtifactKind) -> Self {
        Self {
            run_id,
            stage: Some(stage),
        }
    }

    pub fn chat() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            stage: None,
        }
    }

    /// Error attributed to this call's stage.
    pub fn error(&self, message: impl Into<String>) -> SpecForgeError {
        match self.stage {
            Some(stage) => SpecForgeError::invocation(stage, message),
            None => SpecForgeError::Model(message.into()),
        }
    }
}

/// Trait for language model adapters.
///
/// One call, one answer: adapters never retry.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Send a prompt and return the model's text.
    async fn invoke(&self, prompt: &str, context: &InvocationContext) -> Result<String>;

    /// Model identifier, for diagnostics.
    fn model_name(&self) -> &str;
}

/// Configuration for the HTTP model adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base URL of the Messages API.
    pub api_url: String,

    /// API key sent as `x-api-key`.
    #[serde(default, skip_serializing)]
    pub api_key: String,

    /// Model identifier.
    pub model: String,

    /// Upper bound on generated tokens per call.
    pub max_tokens: u32,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com".to_string(),
            api_key: String::new(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 4000,
            timeout: Duration::from_secs(120),
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(SpecForgeError::Config("model API key is not set".to_string()));
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(SpecForgeError::Config(format!(
                "model API URL must be http(s): {}",
                self.api_url
            )));
        }
        if self.model.trim().is_empty() {
            return Err(SpecForgeError::Config("model name is empty".to_string()));
        }
        if self.max_tokens == 0 {
            return Err(SpecForgeError::Config("max tokens must be positive".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(SpecForgeError::Config("model timeout must be positive".to_string()));
        }
        Ok(())
    }

    /// Full URL of the messages endpoint.
    pub fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.api_url.trim_end_matches('/'))
    }
}
