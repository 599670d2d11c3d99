//! # SpecForge Core
//!
//! Core primitives and pure logic for SpecForge.
//!
//! This crate provides the fundamental building blocks:
//! - [`ProjectRequest`] - Metadata for one generation run
//! - [`Artifact`] - One generated document
//! - [`ArtifactExtractor`] - Model output to artifact
//! - [`TraceLinker`] - Derivation of the traceability matrix
//! - [`ResponseEnvelope`] - What callers get back
//! - [`SpecForgeError`] - Error taxonomy

pub mod artifact;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod ids;
pub mod request;
pub mod trace;
pub mod types;

// Re-exports for convenience
pub use artifact::{
    Artifact, ArtifactKind, ArtifactPayload, Backlog, BacklogItem, Coverage, Sprint, TraceEntry,
    TraceMatrix,
};
pub use envelope::{FileEntry, PersistenceReport, ResponseEnvelope};
pub use error::{Result, SpecForgeError};
pub use extract::ArtifactExtractor;
pub use ids::{IdKind, Identifier};
pub use request::{ProjectRequest, ProjectRequestBuilder};
pub use trace::TraceLinker;
pub use types::*;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::artifact::{Artifact, ArtifactKind};
    pub use crate::envelope::ResponseEnvelope;
    pub use crate::error::{Result, SpecForgeError};
    pub use crate::request::{ProjectRequest, ProjectRequestBuilder};
    pub use crate::types::{PipelineEvent, RunStatus};
}
