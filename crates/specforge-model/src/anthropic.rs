//! Anthropic Messages API adapter.

use std::time::Instant;

use async_trait::async_trait;
use specforge_core::{Result, SpecForgeError};
use tracing::{debug, warn};

use crate::invoker::{InvocationContext, ModelConfig, ModelInvoker};
use crate::protocol::{ErrorResponse, MessagesRequest, MessagesResponse, API_VERSION};

/// Calls `POST {api_url}/v1/messages` once per prompt.
pub struct AnthropicInvoker {
    config: ModelConfig,
    client: reqwest::Client,
}

impl AnthropicInvoker {
    /// Create an adapter; fails on invalid configuration.
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SpecForgeError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

#[async_trait]
impl ModelInvoker for AnthropicInvoker {
    async fn invoke(&self, prompt: &str, context: &InvocationContext) -> Result<String> {
        let start = Instant::now();
        let body = MessagesRequest::single(&self.config.model, self.config.max_tokens, prompt);

        let response = self
            .client
            .post(self.config.messages_url())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    context.error(format!("request timed out after {:?}", self.config.timeout))
                } else {
                    context.error(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&text)
                .map(|body| format!("{}: {}", body.error.kind, body.error.message))
                .unwrap_or(text);
            return Err(context.error(format!("API error ({status}): {detail}")));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| context.error(format!("unreadable response: {e}")))?;

        if parsed.was_truncated() {
            warn!(
                run_id = %context.run_id,
                stage = ?context.stage,
                max_tokens = self.config.max_tokens,
                "model output hit the token limit and may be truncated"
            );
        }

        let text = parsed.text();
        if text.trim().is_empty() {
            return Err(context.error("model returned no text"));
        }

        debug!(
            run_id = %context.run_id,
            stage = ?context.stage,
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "model call completed"
        );

        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
