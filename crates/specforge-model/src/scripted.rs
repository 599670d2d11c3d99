//! Deterministic model double.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use specforge_core::{ArtifactKind, Result};
use tokio::sync::RwLock;

use crate::invoker::{InvocationContext, ModelInvoker};

/// What the double does when asked for one stage.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Answer with this text.
    Respond(String),
    /// Fail with an invocation error carrying this message.
    Fail(String),
    /// Never answer.
    Hang,
}

/// A recorded call.
#[derive(Debug, Clone)]
pub struct ScriptedCall {
    pub context: InvocationContext,
    pub prompt: String,
}

/// Replies from a fixed script keyed by stage, and records every call.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInvoker {
    replies: HashMap<Option<ArtifactKind>, ScriptedReply>,
    calls: Arc<RwLock<Vec<ScriptedCall>>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `stage` with `text`.
    pub fn respond(mut self, stage: ArtifactKind, text: impl Into<String>) -> Self {
        self.replies
            .insert(Some(stage), ScriptedReply::Respond(text.into()));
        self
    }

    /// Fail `stage` with `message`.
    pub fn fail(mut self, stage: ArtifactKind, message: impl Into<String>) -> Self {
        self.replies
            .insert(Some(stage), ScriptedReply::Fail(message.into()));
        self
    }

    /// Never answer `stage`.
    pub fn hang(mut self, stage: ArtifactKind) -> Self {
        self.replies.insert(Some(stage), ScriptedReply::Hang);
        self
    }

    /// Reply for calls that carry no stage.
    pub fn chat(mut self, reply: ScriptedReply) -> Self {
        self.replies.insert(None, reply);
        self
    }

    /// All calls so far, in order.
    pub async fn calls(&self) -> Vec<ScriptedCall> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Stages requested so far, in order.
    pub async fn stages(&self) -> Vec<ArtifactKind> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|call| call.context.stage)
            .collect()
    }
}

#[async_trait]
impl ModelInvoker for ScriptedInvoker {
    async fn invoke(&self, prompt: &str, context: &InvocationContext) -> Result<String> {
        self.calls.write().await.push(ScriptedCall {
            context: *context,
            prompt: prompt.to_string(),
        });

        match self.replies.get(&context.stage) {
            Some(ScriptedReply::Respond(text)) => Ok(text.clone()),
            Some(ScriptedReply::Fail(message)) => Err(context.error(message.clone())),
            Some(ScriptedReply::Hang) => std::future::pending().await,
            None => Err(context.error("no scripted reply")),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
