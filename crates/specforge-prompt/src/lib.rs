//! # SpecForge Prompt
//!
//! Builds the model-facing instructions for each generated artifact.
//!
//! Prompts are pure functions of the artifact kind, the project request and
//! the artifacts completed earlier in the run.

pub mod builder;
pub mod context;
pub mod templates;

pub use builder::{PromptBuilder, PromptConfig};
pub use context::GenerationContext;
pub use templates::TemplatePromptBuilder;
