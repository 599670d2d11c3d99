//! Offline provider.

use async_trait::async_trait;
use specforge_core::Result;

use crate::invoker::{InvocationContext, ModelInvoker};

/// Answers every prompt with the prompt itself.
///
/// The built-in prompts carry example identifiers and a sample backlog block,
/// so a full run completes without network access.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoInvoker;

impl EchoInvoker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModelInvoker for EchoInvoker {
    async fn invoke(&self, prompt: &str, _context: &InvocationContext) -> Result<String> {
        Ok(prompt.to_string())
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}
