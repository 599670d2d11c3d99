//! Event emission.

use std::sync::Arc;

use async_trait::async_trait;
use specforge_core::PipelineEvent;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Receives every event a run produces, in order.
///
/// Emitters must not fail the run: errors are theirs to swallow.
#[async_trait]
pub trait EventEmitter: Send + Sync {
    async fn emit(&self, event: &PipelineEvent);
}

/// Discards events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEmitter;

#[async_trait]
impl EventEmitter for NoopEmitter {
    async fn emit(&self, _event: &PipelineEvent) {}
}

/// Logs events as structured `tracing` records.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEmitter;

#[async_trait]
impl EventEmitter for TracingEmitter {
    async fn emit(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::RunStarted { run_id, project_name } => {
                info!(%run_id, project = %project_name, "🚀 run started");
            }
            PipelineEvent::StageStarted { run_id, stage } => {
                info!(%run_id, %stage, "📋 generating");
            }
            PipelineEvent::StageCompleted {
                run_id,
                stage,
                size_bytes,
                duration_ms,
            } => {
                info!(%run_id, %stage, size_bytes, duration_ms, "✅ stage complete");
            }
            PipelineEvent::ArtifactPersisted { run_id, stage, path } => {
                info!(%run_id, %stage, %path, "💾 saved");
            }
            PipelineEvent::PersistenceFailed {
                run_id,
                stage,
                path,
                message,
            } => {
                warn!(%run_id, %stage, %path, %message, "failed to save artifact");
            }
            PipelineEvent::RunCompleted {
                run_id,
                persisted,
                duration_ms,
            } => {
                info!(%run_id, persisted, duration_ms, "🏁 run complete");
            }
            PipelineEvent::RunFailed {
                run_id,
                stage,
                message,
                cancelled,
            } => {
                if *cancelled {
                    warn!(%run_id, ?stage, %message, "run cancelled");
                } else {
                    error!(%run_id, ?stage, %message, "❌ run failed");
                }
            }
        }
    }
}

/// Fans events out to any number of subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastEmitter {
    sender: broadcast::Sender<PipelineEvent>,
}

impl BroadcastEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventEmitter for BroadcastEmitter {
    async fn emit(&self, event: &PipelineEvent) {
        // No subscribers is not an error.
        let _ = self.sender.send(event.clone());
    }
}

/// Forwards each event to several emitters in turn.
#[derive(Clone, Default)]
pub struct FanoutEmitter {
    emitters: Vec<Arc<dyn EventEmitter>>,
}

impl FanoutEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, emitter: Arc<dyn EventEmitter>) -> Self {
        self.emitters.push(emitter);
        self
    }
}

#[async_trait]
impl EventEmitter for FanoutEmitter {
    async fn emit(&self, event: &PipelineEvent) {
        for emitter in &self.emitters {
            emitter.emit(event).await;
        }
    }
}
