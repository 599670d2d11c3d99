//! PromptBuilder trait and configuration.

use serde::{Deserialize, Serialize};
use specforge_core::{ArtifactKind, ProjectRequest, Result};

use crate::context::GenerationContext;

/// Configuration for prompt construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Natural language the documents should be written in. Identifiers and
    /// YAML keys stay in English regardless.
    pub language: Option<String>,

    /// Length of one sprint in weeks.
    pub sprint_length_weeks: u8,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            language: None,
            sprint_length_weeks: 2,
        }
    }
}

/// Trait for prompt builders.
///
/// Implementations must be deterministic: the same kind, request and context
/// always produce byte-identical text.
pub trait PromptBuilder: Send + Sync {
    /// Build the model-facing instructions for one artifact kind.
    fn build(
        &self,
        kind: ArtifactKind,
        request: &ProjectRequest,
        context: &GenerationContext,
    ) -> Result<String>;

    /// Get the builder configuration.
    fn config(&self) -> &PromptConfig;
}
