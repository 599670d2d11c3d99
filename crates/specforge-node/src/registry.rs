//! In-memory record of runs, fed by pipeline events.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use specforge_core::{ArtifactKind, PipelineEvent, RunStatus};
use specforge_pipeline::EventEmitter;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// What the node knows about one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub project_name: String,
    pub status: RunStatus,

    /// Stage currently being generated.
    pub current_stage: Option<ArtifactKind>,
    pub completed_stages: Vec<ArtifactKind>,

    /// Paths written so far.
    pub files: Vec<String>,

    /// Set once the run succeeds.
    pub persisted: Option<bool>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Finished runs kept by default.
pub const DEFAULT_MAX_RUNS: usize = 100;

/// Run records keyed by id. Once more than `max_runs` are held, the oldest
/// finished runs are dropped; running ones are always kept.
#[derive(Debug, Clone)]
pub struct RunRegistry {
    runs: Arc<RwLock<HashMap<Uuid, RunRecord>>>,
    max_runs: usize,
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_RUNS)
    }
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_runs: usize) -> Self {
        Self {
            runs: Arc::new(RwLock::new(HashMap::new())),
            max_runs: max_runs.max(1),
        }
    }

    pub fn max_runs(&self) -> usize {
        self.max_runs
    }

    pub async fn get(&self, id: Uuid) -> Option<RunRecord> {
        self.runs.read().await.get(&id).cloned()
    }

    /// All runs, newest first.
    pub async fn list(&self) -> Vec<RunRecord> {
        let mut runs: Vec<RunRecord> = self.runs.read().await.values().cloned().collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs
    }
}

#[async_trait]
impl EventEmitter for RunRegistry {
    async fn emit(&self, event: &PipelineEvent) {
        let mut runs = self.runs.write().await;

        if let PipelineEvent::RunStarted {
            run_id,
            project_name,
        } = event
        {
            runs.insert(
                *run_id,
                RunRecord {
                    run_id: *run_id,
                    project_name: project_name.clone(),
                    status: RunStatus::Running,
                    current_stage: None,
                    completed_stages: Vec::new(),
                    files: Vec::new(),
                    persisted: None,
                    error: None,
                    started_at: Utc::now(),
                    finished_at: None,
                },
            );
            evict_finished(&mut runs, self.max_runs);
            return;
        }

        let Some(record) = runs.get_mut(&event.run_id()) else {
            return;
        };

        match event {
            PipelineEvent::StageStarted { stage, .. } => {
                record.current_stage = Some(*stage);
            }
            PipelineEvent::StageCompleted { stage, .. } => {
                record.current_stage = None;
                record.completed_stages.push(*stage);
            }
            PipelineEvent::ArtifactPersisted { path, .. } => {
                record.files.push(path.clone());
            }
            PipelineEvent::PersistenceFailed { .. } | PipelineEvent::RunStarted { .. } => {}
            PipelineEvent::RunCompleted { persisted, .. } => {
                record.status = RunStatus::Succeeded;
                record.persisted = Some(*persisted);
                record.finished_at = Some(Utc::now());
            }
            PipelineEvent::RunFailed {
                message, cancelled, ..
            } => {
                record.status = if *cancelled {
                    RunStatus::Cancelled
                } else {
                    RunStatus::Failed
                };
                record.current_stage = None;
                record.error = Some(message.clone());
                record.finished_at = Some(Utc::now());
            }
        }
    }
}

fn evict_finished(runs: &mut HashMap<Uuid, RunRecord>, max_runs: usize) {
    let excess = runs.len().saturating_sub(max_runs);
    if excess == 0 {
        return;
    }

    let mut finished: Vec<(DateTime<Utc>, Uuid)> = runs
        .values()
        .filter(|record| record.status.is_terminal())
        .map(|record| (record.started_at, record.run_id))
        .collect();
    finished.sort();

    for (_, id) in finished.into_iter().take(excess) {
        runs.remove(&id);
    }
    debug!(held = runs.len(), max_runs, "evicted finished runs");
}
