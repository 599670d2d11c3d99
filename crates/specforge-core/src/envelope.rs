//! Response envelope returned to callers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::artifact::{Artifact, ArtifactKind};
use crate::error::SpecForgeError;

/// One file in a successful response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub path: String,
    pub content: String,
    /// Size of `content` in bytes.
    pub size: u64,
    pub sha256: String,
    /// Whether the file reached storage.
    pub persisted: bool,
}

/// Outcome of writing a run's artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistenceReport {
    failures: BTreeMap<ArtifactKind, SpecForgeError>,
}

impl PersistenceReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that writing `kind` failed.
    pub fn record_failure(&mut self, kind: ArtifactKind, error: SpecForgeError) {
        self.failures.insert(kind, error);
    }

    /// Returns true if every artifact was written.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether `kind` was written.
    pub fn persisted(&self, kind: ArtifactKind) -> bool {
        !self.failures.contains_key(&kind)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ArtifactKind, &SpecForgeError)> {
        self.failures.iter()
    }
}

/// The response for one `generate_spec` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    /// True when all four artifacts were generated.
    pub success: bool,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,

    /// True when all four artifacts were also written to storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persisted: Option<bool>,

    /// Stage that failed, for failed runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<ArtifactKind>,

    /// Error category, for failed runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<BTreeMap<ArtifactKind, FileEntry>>,
}

impl ResponseEnvelope {
    /// Envelope for a run that generated every artifact.
    pub fn success<'a>(
        project_name: &str,
        run_id: Uuid,
        artifacts: impl IntoIterator<Item = &'a Artifact>,
        persistence: &PersistenceReport,
    ) -> Self {
        let files: BTreeMap<ArtifactKind, FileEntry> = artifacts
            .into_iter()
            .map(|artifact| {
                (
                    artifact.kind,
                    FileEntry {
                        path: artifact.path.clone(),
                        content: artifact.content.clone(),
                        size: artifact.size_bytes,
                        sha256: artifact.sha256.clone(),
                        persisted: persistence.persisted(artifact.kind),
                    },
                )
            })
            .collect();

        let message = if persistence.is_complete() {
            format!("Successfully generated spec documents for {project_name}")
        } else {
            let failed: Vec<String> = persistence.failures().map(|(_, e)| e.to_string()).collect();
            format!(
                "Generated spec documents for {project_name}, but some files were not saved: {}",
                failed.join("; ")
            )
        };

        Self {
            success: true,
            message,
            project_name: Some(project_name.to_string()),
            run_id: Some(run_id),
            persisted: Some(persistence.is_complete()),
            failed_stage: None,
            error_kind: None,
            files: Some(files),
        }
    }

    /// Envelope for a run that stopped before generating every artifact.
    pub fn failure(project_name: Option<&str>, run_id: Option<Uuid>, error: &SpecForgeError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            project_name: project_name
                .filter(|name| !name.trim().is_empty())
                .map(str::to_string),
            run_id,
            persisted: None,
            failed_stage: error.stage(),
            error_kind: Some(error.category().to_string()),
            files: None,
        }
    }

    /// Look up a file by kind.
    pub fn file(&self, kind: ArtifactKind) -> Option<&FileEntry> {
        self.files.as_ref()?.get(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifacts() -> Vec<Artifact> {
        ArtifactKind::ALL
            .iter()
            .map(|k| Artifact::new(*k, format!("content of {k}"), None))
            .collect()
    }

    #[test]
    fn test_success_envelope_shape() {
        let envelope = ResponseEnvelope::success(
            "Test",
            Uuid::new_v4(),
            &artifacts(),
            &PersistenceReport::new(),
        );

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["projectName"], "Test");
        assert_eq!(json["persisted"], true);
        for key in ["requirements", "architecture", "backlog", "trace"] {
            assert!(json["files"][key]["path"].is_string(), "missing {key}");
            assert!(json["files"][key]["size"].is_u64());
        }
        assert_eq!(json["files"]["backlog"]["path"], "30-backlog.yaml");
    }

    #[test]
    fn test_partial_persistence_keeps_content() {
        let mut report = PersistenceReport::new();
        report.record_failure(
            ArtifactKind::Backlog,
            SpecForgeError::Persistence {
                path: "30-backlog.yaml".to_string(),
                message: "disk full".to_string(),
            },
        );

        let envelope = ResponseEnvelope::success("Test", Uuid::new_v4(), &artifacts(), &report);
        assert!(envelope.success);
        assert_eq!(envelope.persisted, Some(false));
        assert!(envelope.message.contains("disk full"));

        let backlog = envelope.file(ArtifactKind::Backlog).unwrap();
        assert!(!backlog.persisted);
        assert_eq!(backlog.content, "content of backlog");
        assert!(envelope.file(ArtifactKind::Trace).unwrap().persisted);
    }

    #[test]
    fn test_failure_envelope_omits_files() {
        let err = SpecForgeError::malformed(ArtifactKind::Backlog, "no yaml block");
        let envelope = ResponseEnvelope::failure(Some("Test"), None, &err);

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["failedStage"], "backlog");
        assert_eq!(json["errorKind"], "malformed_artifact");
        assert!(json.get("files").is_none());
    }

    #[test]
    fn test_envelope_deserializes() {
        let envelope = ResponseEnvelope::success(
            "Test",
            Uuid::new_v4(),
            &artifacts(),
            &PersistenceReport::new(),
        );
        let json = serde_json::to_string(&envelope).unwrap();
        let back: ResponseEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
    }
}
