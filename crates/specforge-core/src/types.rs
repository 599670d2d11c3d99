//! Common types used across SpecForge.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::artifact::ArtifactKind;

/// Status of a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Request accepted, generation in progress.
    Running,
    /// All artifacts generated.
    Succeeded,
    /// A stage failed.
    Failed,
    /// The run was cancelled.
    Cancelled,
}

impl RunStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

/// Observability events emitted while a run progresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A run was accepted.
    RunStarted { run_id: Uuid, project_name: String },
    /// Generation of an artifact started.
    StageStarted { run_id: Uuid, stage: ArtifactKind },
    /// An artifact was produced.
    StageCompleted {
        run_id: Uuid,
        stage: ArtifactKind,
        size_bytes: u64,
        duration_ms: u64,
    },
    /// An artifact was written.
    ArtifactPersisted {
        run_id: Uuid,
        stage: ArtifactKind,
        path: String,
    },
    /// Writing an artifact failed.
    PersistenceFailed {
        run_id: Uuid,
        stage: ArtifactKind,
        path: String,
        message: String,
    },
    /// The run generated every artifact.
    RunCompleted {
        run_id: Uuid,
        persisted: bool,
        duration_ms: u64,
    },
    /// The run stopped early.
    RunFailed {
        run_id: Uuid,
        stage: Option<ArtifactKind>,
        message: String,
        cancelled: bool,
    },
}

impl PipelineEvent {
    /// The run this event belongs to.
    pub fn run_id(&self) -> Uuid {
        match self {
            PipelineEvent::RunStarted { run_id, .. }
            | PipelineEvent::StageStarted { run_id, .. }
            | PipelineEvent::StageCompleted { run_id, .. }
            | PipelineEvent::ArtifactPersisted { run_id, .. }
            | PipelineEvent::PersistenceFailed { run_id, .. }
            | PipelineEvent::RunCompleted { run_id, .. }
            | PipelineEvent::RunFailed { run_id, .. } => *run_id,
        }
    }

    /// Returns true if no further events follow for this run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineEvent::RunCompleted { .. } | PipelineEvent::RunFailed { .. }
        )
    }
}
