//! Error types for SpecForge.

use thiserror::Error;

use crate::artifact::ArtifactKind;

/// Main error type for SpecForge operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecForgeError {
    /// The incoming request was rejected before any model call.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The model call failed or returned unusable text.
    #[error("Model invocation failed while generating {stage}: {message}")]
    Invocation { stage: ArtifactKind, message: String },

    /// A model call outside the pipeline (chat) failed.
    #[error("Model call failed: {0}")]
    Model(String),

    /// Model output could not be turned into a valid artifact.
    #[error("Malformed {stage} artifact: {message}")]
    MalformedArtifact { stage: ArtifactKind, message: String },

    /// Writing an artifact to storage failed.
    #[error("Failed to persist {path}: {message}")]
    Persistence { path: String, message: String },

    /// The caller cancelled the run.
    #[error("Generation cancelled before {stage} completed")]
    Cancelled { stage: ArtifactKind },

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SpecForgeError {
    /// Shorthand for an [`SpecForgeError::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        SpecForgeError::InvalidRequest {
            message: message.into(),
        }
    }

    /// Shorthand for an [`SpecForgeError::Invocation`].
    pub fn invocation(stage: ArtifactKind, message: impl Into<String>) -> Self {
        SpecForgeError::Invocation {
            stage,
            message: message.into(),
        }
    }

    /// Shorthand for an [`SpecForgeError::MalformedArtifact`].
    pub fn malformed(stage: ArtifactKind, message: impl Into<String>) -> Self {
        SpecForgeError::MalformedArtifact {
            stage,
            message: message.into(),
        }
    }

    /// Returns the pipeline stage this error is attributed to, if any.
    pub fn stage(&self) -> Option<ArtifactKind> {
        match self {
            SpecForgeError::Invocation { stage, .. }
            | SpecForgeError::MalformedArtifact { stage, .. }
            | SpecForgeError::Cancelled { stage } => Some(*stage),
            _ => None,
        }
    }

    /// Returns true if the error was caused by the caller's input.
    pub fn is_user_error(&self) -> bool {
        matches!(self, SpecForgeError::InvalidRequest { .. })
    }

    /// Stable, machine-friendly category name.
    pub fn category(&self) -> &'static str {
        match self {
            SpecForgeError::InvalidRequest { .. } => "invalid_request",
            SpecForgeError::Invocation { .. } => "invocation_error",
            SpecForgeError::Model(_) => "model_error",
            SpecForgeError::MalformedArtifact { .. } => "malformed_artifact",
            SpecForgeError::Persistence { .. } => "persistence_error",
            SpecForgeError::Cancelled { .. } => "cancelled",
            SpecForgeError::Config(_) => "config_error",
            SpecForgeError::Serialization(_) => "serialization_error",
            SpecForgeError::Internal(_) => "internal_error",
        }
    }
}

/// Convenience Result type for SpecForge operations.
pub type Result<T> = std::result::Result<T, SpecForgeError>;

impl From<serde_json::Error> for SpecForgeError {
    fn from(err: serde_json::Error) -> Self {
        SpecForgeError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for SpecForgeError {
    fn from(err: serde_yaml::Error) -> Self {
        SpecForgeError::Serialization(err.to_string())
    }
}

// Callers that know the path should build `Persistence` themselves.
impl From<std::io::Error> for SpecForgeError {
    fn from(err: std::io::Error) -> Self {
        SpecForgeError::Persistence {
            path: String::new(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_attribution() {
        let err = SpecForgeError::malformed(ArtifactKind::Backlog, "no yaml block");
        assert_eq!(err.stage(), Some(ArtifactKind::Backlog));
        assert_eq!(err.category(), "malformed_artifact");

        let err = SpecForgeError::invalid_request("projectName is required");
        assert_eq!(err.stage(), None);
        assert!(err.is_user_error());
    }

    #[test]
    fn test_messages_name_the_stage() {
        let err = SpecForgeError::invocation(ArtifactKind::Architecture, "timed out");
        assert_eq!(
            err.to_string(),
            "Model invocation failed while generating architecture: timed out"
        );

        let err = SpecForgeError::Cancelled {
            stage: ArtifactKind::Requirements,
        };
        assert_eq!(
            err.to_string(),
            "Generation cancelled before requirements completed"
        );
    }
}
