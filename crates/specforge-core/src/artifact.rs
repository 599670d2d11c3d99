//! Artifact types.
//!
//! An [`Artifact`] is one generated document. Artifacts are created once per
//! kind per run and never mutated afterwards.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ids::Identifier;

/// The four documents a run produces, in generation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Requirements document (model generated).
    Requirements,
    /// Architecture document (model generated).
    Architecture,
    /// Sprint backlog (model generated, structured).
    Backlog,
    /// Traceability matrix (derived locally).
    Trace,
}

impl ArtifactKind {
    /// Every kind, in generation order.
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Requirements,
        ArtifactKind::Architecture,
        ArtifactKind::Backlog,
        ArtifactKind::Trace,
    ];

    /// The kinds produced by the model, in generation order.
    pub const GENERATED: [ArtifactKind; 3] = [
        ArtifactKind::Requirements,
        ArtifactKind::Architecture,
        ArtifactKind::Backlog,
    ];

    /// Fixed file name of this artifact inside the project directory.
    ///
    /// The numeric prefixes encode generation order and are relied on by
    /// external tooling for sorting.
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::Requirements => "10-requirements.md",
            ArtifactKind::Architecture => "20-architecture.md",
            ArtifactKind::Backlog => "30-backlog.yaml",
            ArtifactKind::Trace => "trace.yaml",
        }
    }

    /// Returns true if this artifact comes from a model call.
    pub fn is_generated(&self) -> bool {
        !matches!(self, ArtifactKind::Trace)
    }

    /// Kinds that must already exist before this one can be produced.
    pub fn prerequisites(&self) -> &'static [ArtifactKind] {
        match self {
            ArtifactKind::Requirements => &[],
            ArtifactKind::Architecture => &[ArtifactKind::Requirements],
            ArtifactKind::Backlog => &[ArtifactKind::Requirements, ArtifactKind::Architecture],
            ArtifactKind::Trace => &ArtifactKind::GENERATED,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Requirements => "requirements",
            ArtifactKind::Architecture => "architecture",
            ArtifactKind::Backlog => "backlog",
            ArtifactKind::Trace => "trace",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Which document this is.
    pub kind: ArtifactKind,

    /// Where the document is written.
    pub path: String,

    /// The document body.
    pub content: String,

    /// Length of `content` in UTF-8 bytes.
    pub size_bytes: u64,

    /// Hex-encoded SHA-256 of `content`.
    pub sha256: String,

    /// Parsed structured data, for kinds that carry any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ArtifactPayload>,
}

/// Structured data decoded from (or rendered into) an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArtifactPayload {
    Backlog(Backlog),
    Trace(TraceMatrix),
}

impl Artifact {
    /// Create an artifact located at its bare file name.
    pub fn new(kind: ArtifactKind, content: impl Into<String>, payload: Option<ArtifactPayload>) -> Self {
        let content = content.into();
        Self {
            kind,
            path: kind.file_name().to_string(),
            size_bytes: content.len() as u64,
            sha256: sha256_hex(&content),
            content,
            payload,
        }
    }

    /// Re-root this artifact under `dir`.
    pub fn located_at(self, dir: &Path) -> Self {
        Self {
            path: dir.join(self.kind.file_name()).to_string_lossy().into_owned(),
            ..self
        }
    }

    /// The parsed backlog, if this is a backlog artifact.
    pub fn backlog(&self) -> Option<&Backlog> {
        match &self.payload {
            Some(ArtifactPayload::Backlog(backlog)) => Some(backlog),
            _ => None,
        }
    }

    /// The trace matrix, if this is a trace artifact.
    pub fn trace(&self) -> Option<&TraceMatrix> {
        match &self.payload {
            Some(ArtifactPayload::Trace(matrix)) => Some(matrix),
            _ => None,
        }
    }

    /// Check that size and digest still describe the content.
    pub fn verify(&self) -> bool {
        self.size_bytes == self.content.len() as u64 && self.sha256 == sha256_hex(&self.content)
    }
}

/// Hex-encoded SHA-256 digest of a string.
pub fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// A sprint-by-sprint decomposition of the work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backlog {
    pub sprints: Vec<Sprint>,
}

impl Backlog {
    /// All items across sprints, in order.
    pub fn items(&self) -> impl Iterator<Item = &BacklogItem> {
        self.sprints.iter().flat_map(|s| s.items.iter())
    }

    /// Look up an item by identifier.
    pub fn item(&self, id: &Identifier) -> Option<&BacklogItem> {
        self.items().find(|item| &item.id == id)
    }

    /// Number of items across sprints.
    pub fn len(&self) -> usize {
        self.sprints.iter().map(|s| s.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_weeks: Option<u32>,

    pub items: Vec<BacklogItem>,
}

/// One unit of work in the backlog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklogItem {
    pub id: Identifier,

    pub title: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate_hours: Option<f64>,

    /// Requirements this item implements (never empty).
    pub requirements: Vec<Identifier>,

    /// Architecture components this item touches.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Identifier>,

    /// Items that must be done first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<Identifier>,
}

/// Coverage of one requirement by architecture components and backlog items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEntry {
    pub requirement_id: Identifier,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement_title: Option<String>,

    #[serde(rename = "architectureComponents", default)]
    pub related_architecture_ids: BTreeSet<Identifier>,

    #[serde(rename = "backlogItems", default)]
    pub related_backlog_ids: BTreeSet<Identifier>,
}

impl TraceEntry {
    pub fn new(requirement_id: Identifier) -> Self {
        Self {
            requirement_id,
            requirement_title: None,
            related_architecture_ids: BTreeSet::new(),
            related_backlog_ids: BTreeSet::new(),
        }
    }

    /// Returns true if nothing addresses this requirement.
    pub fn is_uncovered(&self) -> bool {
        self.related_architecture_ids.is_empty() && self.related_backlog_ids.is_empty()
    }
}

/// The traceability matrix for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceMatrix {
    pub project_name: String,

    /// One entry per declared requirement, in natural identifier order.
    pub traces: Vec<TraceEntry>,

    pub coverage: Coverage,

    /// Requirement identifiers referenced downstream but never declared.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub unknown_references: BTreeSet<Identifier>,
}

impl TraceMatrix {
    /// Look up the entry for a requirement.
    pub fn entry(&self, id: &str) -> Option<&TraceEntry> {
        self.traces.iter().find(|e| e.requirement_id.as_str() == id)
    }
}

/// Summary counts for a trace matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    pub requirements: usize,
    pub with_architecture: usize,
    pub with_backlog: usize,
    #[serde(default)]
    pub uncovered: Vec<Identifier>,
}

impl Coverage {
    /// Compute coverage from entries.
    pub fn from_entries(entries: &[TraceEntry]) -> Self {
        Self {
            requirements: entries.len(),
            with_architecture: entries
                .iter()
                .filter(|e| !e.related_architecture_ids.is_empty())
                .count(),
            with_backlog: entries
                .iter()
                .filter(|e| !e.related_backlog_ids.is_empty())
                .count(),
            uncovered: entries
                .iter()
                .filter(|e| e.is_uncovered())
                .map(|e| e.requirement_id.clone())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_order() {
        let mut kinds = vec![
            ArtifactKind::Trace,
            ArtifactKind::Requirements,
            ArtifactKind::Backlog,
            ArtifactKind::Architecture,
        ];
        kinds.sort();
        assert_eq!(kinds, ArtifactKind::ALL.to_vec());
        assert!(!ArtifactKind::Trace.is_generated());
    }

    #[test]
    fn test_file_names_sort_in_generation_order() {
        let mut names: Vec<_> = ArtifactKind::GENERATED.iter().map(|k| k.file_name()).collect();
        let expected = names.clone();
        names.sort();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_artifact_size_and_digest() {
        let artifact = Artifact::new(ArtifactKind::Requirements, "# Req\n- REQ-001 ü", None);
        assert_eq!(artifact.size_bytes, "# Req\n- REQ-001 ü".len() as u64);
        assert_eq!(artifact.sha256.len(), 64);
        assert!(artifact.verify());
        assert_eq!(artifact.path, "10-requirements.md");
    }

    #[test]
    fn test_located_at_keeps_content() {
        let artifact = Artifact::new(ArtifactKind::Trace, "traces: []", None);
        let moved = artifact.clone().located_at(Path::new("specs/test"));
        assert_eq!(moved.path, Path::new("specs/test").join("trace.yaml").to_string_lossy());
        assert_eq!(moved.content, artifact.content);
        assert_eq!(moved.sha256, artifact.sha256);
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ArtifactKind::Architecture).unwrap();
        assert_eq!(json, "\"architecture\"");
    }
}
