//! Application state.

use std::sync::Arc;

use specforge_core::Result;
use specforge_model::{AnthropicInvoker, EchoInvoker, ModelInvoker};
use specforge_pipeline::{
    BroadcastEmitter, CancellationToken, FanoutEmitter, Orchestrator, PipelineConfig,
    TracingEmitter,
};
use specforge_prompt::{PromptBuilder, TemplatePromptBuilder};
use specforge_store::{ArtifactWriter, FsArtifactWriter};

use crate::config::{ModelProvider, NodeConfig};
use crate::registry::RunRegistry;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The generation pipeline, shared by all requests.
    pub orchestrator: Arc<Orchestrator>,

    /// Runs seen since start-up.
    pub registry: RunRegistry,

    /// Live event feed for WebSocket subscribers.
    pub events: BroadcastEmitter,

    /// Cancelled when the node shuts down; each request runs under a child.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: PipelineConfig,
        prompts: Arc<dyn PromptBuilder>,
        model: Arc<dyn ModelInvoker>,
        writer: Arc<dyn ArtifactWriter>,
        shutdown: CancellationToken,
    ) -> Self {
        Self::with_registry(config, prompts, model, writer, shutdown, RunRegistry::new())
    }

    /// Like [`AppState::new`] with a caller-sized run registry.
    pub fn with_registry(
        config: PipelineConfig,
        prompts: Arc<dyn PromptBuilder>,
        model: Arc<dyn ModelInvoker>,
        writer: Arc<dyn ArtifactWriter>,
        shutdown: CancellationToken,
        registry: RunRegistry,
    ) -> Self {
        let events = BroadcastEmitter::default();
        let emitter = FanoutEmitter::new()
            .with(Arc::new(TracingEmitter))
            .with(Arc::new(registry.clone()))
            .with(Arc::new(events.clone()));

        let orchestrator =
            Orchestrator::new(config, prompts, model, writer).with_events(Arc::new(emitter));

        Self {
            orchestrator: Arc::new(orchestrator),
            registry,
            events,
            shutdown,
        }
    }

    /// Wire the production adapters described by `config`.
    pub fn from_config(config: &NodeConfig, shutdown: CancellationToken) -> Result<Self> {
        let model: Arc<dyn ModelInvoker> = match config.provider {
            ModelProvider::Anthropic => Arc::new(AnthropicInvoker::new(config.model.clone())?),
            ModelProvider::Echo => Arc::new(EchoInvoker::new()),
        };

        Ok(Self::with_registry(
            config.pipeline(),
            Arc::new(TemplatePromptBuilder::with_config(config.prompt.clone())),
            model,
            Arc::new(FsArtifactWriter::default()),
            shutdown,
            RunRegistry::with_capacity(config.max_runs),
        ))
    }
}
