//! Per-run generation context.

use std::collections::BTreeMap;

use specforge_core::{Artifact, ArtifactKind, ProjectRequest, Result, SpecForgeError};

/// The request plus every artifact completed so far in one run.
///
/// Artifacts can only be added in generation order and never replaced, so
/// the context grows monotonically.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    request: ProjectRequest,
    artifacts: BTreeMap<ArtifactKind, Artifact>,
}

impl GenerationContext {
    /// Create an empty context for a request.
    pub fn new(request: ProjectRequest) -> Self {
        Self {
            request,
            artifacts: BTreeMap::new(),
        }
    }

    pub fn request(&self) -> &ProjectRequest {
        &self.request
    }

    /// Add a completed artifact.
    pub fn record(&mut self, artifact: Artifact) -> Result<()> {
        let kind = artifact.kind;

        if self.artifacts.contains_key(&kind) {
            return Err(SpecForgeError::Internal(format!(
                "{kind} artifact already recorded for this run"
            )));
        }

        if let Some(missing) = kind
            .prerequisites()
            .iter()
            .find(|k| !self.artifacts.contains_key(*k))
        {
            return Err(SpecForgeError::Internal(format!(
                "cannot record {kind} before {missing}"
            )));
        }

        self.artifacts.insert(kind, artifact);
        Ok(())
    }

    pub fn get(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.artifacts.get(&kind)
    }

    /// Content of a completed artifact.
    pub fn content(&self, kind: ArtifactKind) -> Option<&str> {
        self.get(kind).map(|a| a.content.as_str())
    }

    /// Like [`GenerationContext::content`], but missing content is an error.
    pub fn require(&self, kind: ArtifactKind, needed_by: ArtifactKind) -> Result<&str> {
        self.content(kind).ok_or_else(|| {
            SpecForgeError::Internal(format!(
                "{needed_by} prompt requires the {kind} artifact"
            ))
        })
    }

    /// Completed kinds, in generation order.
    pub fn completed(&self) -> impl Iterator<Item = ArtifactKind> + '_ {
        self.artifacts.keys().copied()
    }

    /// Returns true once every artifact kind is present.
    pub fn is_complete(&self) -> bool {
        self.artifacts.len() == ArtifactKind::ALL.len()
    }

    /// Consume the context, yielding artifacts in generation order.
    pub fn into_artifacts(self) -> Vec<Artifact> {
        self.artifacts.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> GenerationContext {
        GenerationContext::new(ProjectRequest::builder().project_name("Test").build().unwrap())
    }

    #[test]
    fn test_records_in_order() {
        let mut ctx = context();
        ctx.record(Artifact::new(ArtifactKind::Requirements, "REQ-001", None))
            .unwrap();
        ctx.record(Artifact::new(ArtifactKind::Architecture, "ARCH-001", None))
            .unwrap();

        let kinds: Vec<_> = ctx.completed().collect();
        assert_eq!(kinds, vec![ArtifactKind::Requirements, ArtifactKind::Architecture]);
        assert_eq!(ctx.content(ArtifactKind::Requirements), Some("REQ-001"));
        assert!(!ctx.is_complete());
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut ctx = context();
        let err = ctx
            .record(Artifact::new(ArtifactKind::Backlog, "sprints: []", None))
            .unwrap_err();
        assert!(err.to_string().contains("before requirements"));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut ctx = context();
        ctx.record(Artifact::new(ArtifactKind::Requirements, "a", None))
            .unwrap();
        assert!(ctx
            .record(Artifact::new(ArtifactKind::Requirements, "b", None))
            .is_err());
        assert_eq!(ctx.content(ArtifactKind::Requirements), Some("a"));
    }
}
