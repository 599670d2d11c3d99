//! The generation pipeline.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use specforge_core::{
    Artifact, ArtifactExtractor, ArtifactKind, PersistenceReport, PipelineEvent, ProjectRequest,
    ResponseEnvelope, Result, SpecForgeError, TraceLinker,
};
use specforge_model::{InvocationContext, ModelInvoker};
use specforge_prompt::{GenerationContext, PromptBuilder};
use specforge_store::{ArtifactLayout, ArtifactWriter};
use tokio_util::sync::CancellationToken;
use tracing::{error, instrument, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::events::{EventEmitter, NoopEmitter};

/// Everything one successful run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub run_id: Uuid,
    pub project_name: String,

    /// All four artifacts, in generation order.
    pub artifacts: Vec<Artifact>,

    pub persistence: PersistenceReport,
    pub duration: Duration,
}

impl RunOutput {
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }

    pub fn envelope(&self) -> ResponseEnvelope {
        ResponseEnvelope::success(
            &self.project_name,
            self.run_id,
            &self.artifacts,
            &self.persistence,
        )
    }
}

/// The envelope for one run and, when it failed, the error behind it.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub envelope: ResponseEnvelope,
    pub error: Option<SpecForgeError>,
}

/// Drives one request through prompt, model, extraction, trace and storage.
///
/// Shared across requests; each run owns its own [`GenerationContext`].
#[derive(Clone)]
pub struct Orchestrator {
    config: PipelineConfig,
    prompts: Arc<dyn PromptBuilder>,
    model: Arc<dyn ModelInvoker>,
    extractor: ArtifactExtractor,
    writer: Arc<dyn ArtifactWriter>,
    events: Arc<dyn EventEmitter>,
}

impl Orchestrator {
    pub fn new(
        config: PipelineConfig,
        prompts: Arc<dyn PromptBuilder>,
        model: Arc<dyn ModelInvoker>,
        writer: Arc<dyn ArtifactWriter>,
    ) -> Self {
        Self {
            config,
            prompts,
            model,
            extractor: ArtifactExtractor::new(),
            writer,
            events: Arc::new(NoopEmitter),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventEmitter>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn model(&self) -> &Arc<dyn ModelInvoker> {
        &self.model
    }

    /// Run a request to completion and describe the outcome.
    pub async fn run(&self, request: ProjectRequest) -> ResponseEnvelope {
        self.run_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// Like [`Orchestrator::run`], stopping early once `token` is cancelled.
    pub async fn run_with_cancellation(
        &self,
        request: ProjectRequest,
        token: CancellationToken,
    ) -> ResponseEnvelope {
        self.run_outcome(request, token).await.envelope
    }

    /// Run a request, keeping the typed error next to its envelope.
    pub async fn run_outcome(&self, request: ProjectRequest, token: CancellationToken) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let project_name = request.project_name.clone();

        match self.generate_run(run_id, request, token).await {
            Ok(output) => RunOutcome {
                envelope: output.envelope(),
                error: None,
            },
            Err(err) => {
                // Rejected requests never started a run.
                let run_id = (!err.is_user_error()).then_some(run_id);
                RunOutcome {
                    envelope: ResponseEnvelope::failure(Some(&project_name), run_id, &err),
                    error: Some(err),
                }
            }
        }
    }

    /// Typed form of [`Orchestrator::run_with_cancellation`].
    pub async fn generate(
        &self,
        request: ProjectRequest,
        token: CancellationToken,
    ) -> Result<RunOutput> {
        self.generate_run(Uuid::new_v4(), request, token).await
    }

    #[instrument(skip(self, request, token), fields(project = %request.project_name))]
    async fn generate_run(
        &self,
        run_id: Uuid,
        request: ProjectRequest,
        token: CancellationToken,
    ) -> Result<RunOutput> {
        // Invalid input never reaches the model or the event stream.
        request.validate()?;
        let layout = ArtifactLayout::new(&self.config.output_dir, &request)?;

        let started = Instant::now();
        self.events
            .emit(&PipelineEvent::RunStarted {
                run_id,
                project_name: request.project_name.clone(),
            })
            .await;

        match self.stages(run_id, &request, &layout, &token).await {
            Ok(artifacts) => {
                let persistence = self.persist(run_id, &artifacts).await;
                let duration = started.elapsed();

                self.events
                    .emit(&PipelineEvent::RunCompleted {
                        run_id,
                        persisted: persistence.is_complete(),
                        duration_ms: duration.as_millis() as u64,
                    })
                    .await;

                Ok(RunOutput {
                    run_id,
                    project_name: request.project_name,
                    artifacts,
                    persistence,
                    duration,
                })
            }
            Err(err) => {
                error!(%run_id, error = %err, "generation aborted");
                self.events
                    .emit(&PipelineEvent::RunFailed {
                        run_id,
                        stage: err.stage(),
                        message: err.to_string(),
                        cancelled: matches!(err, SpecForgeError::Cancelled { .. }),
                    })
                    .await;
                Err(err)
            }
        }
    }

    /// Generate all four artifacts. Nothing is written here.
    async fn stages(
        &self,
        run_id: Uuid,
        request: &ProjectRequest,
        layout: &ArtifactLayout,
        token: &CancellationToken,
    ) -> Result<Vec<Artifact>> {
        let mut context = GenerationContext::new(request.clone());

        for kind in ArtifactKind::GENERATED {
            if token.is_cancelled() {
                return Err(SpecForgeError::Cancelled { stage: kind });
            }
            self.events
                .emit(&PipelineEvent::StageStarted { run_id, stage: kind })
                .await;
            let started = Instant::now();

            let prompt = self.prompts.build(kind, request, &context)?;
            let raw = self.invoke(run_id, kind, &prompt, token).await?;
            let artifact = self
                .extractor
                .extract(kind, &raw)?
                .located_at(layout.project_dir());

            self.stage_completed(run_id, &artifact, started).await;
            context.record(artifact)?;
        }

        if token.is_cancelled() {
            return Err(SpecForgeError::Cancelled {
                stage: ArtifactKind::Trace,
            });
        }
        self.events
            .emit(&PipelineEvent::StageStarted {
                run_id,
                stage: ArtifactKind::Trace,
            })
            .await;
        let started = Instant::now();

        let trace = TraceLinker::new(&request.project_name)
            .link(
                required(&context, ArtifactKind::Requirements)?,
                required(&context, ArtifactKind::Architecture)?,
                required(&context, ArtifactKind::Backlog)?,
            )?
            .located_at(layout.project_dir());

        self.stage_completed(run_id, &trace, started).await;
        context.record(trace)?;

        // Last chance to stop before anything touches storage.
        if token.is_cancelled() {
            return Err(SpecForgeError::Cancelled {
                stage: ArtifactKind::Trace,
            });
        }

        Ok(context.into_artifacts())
    }

    /// One model call, bounded by the timeout and raced against cancellation.
    async fn invoke(
        &self,
        run_id: Uuid,
        kind: ArtifactKind,
        prompt: &str,
        token: &CancellationToken,
    ) -> Result<String> {
        let context = InvocationContext::stage(run_id, kind);
        let timeout = self.config.invoke_timeout;

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(SpecForgeError::Cancelled { stage: kind }),
            result = tokio::time::timeout(timeout, self.model.invoke(prompt, &context)) => {
                match result {
                    Ok(text) => text,
                    Err(_) => Err(SpecForgeError::invocation(
                        kind,
                        format!("no response within {}s", timeout.as_secs_f64()),
                    )),
                }
            }
        }
    }

    async fn stage_completed(&self, run_id: Uuid, artifact: &Artifact, started: Instant) {
        self.events
            .emit(&PipelineEvent::StageCompleted {
                run_id,
                stage: artifact.kind,
                size_bytes: artifact.size_bytes,
                duration_ms: started.elapsed().as_millis() as u64,
            })
            .await;
    }

    /// Write every artifact, each independently of the others.
    async fn persist(&self, run_id: Uuid, artifacts: &[Artifact]) -> PersistenceReport {
        let mut report = PersistenceReport::new();

        for artifact in artifacts {
            match self
                .writer
                .persist(Path::new(&artifact.path), &artifact.content)
                .await
            {
                Ok(()) => {
                    self.events
                        .emit(&PipelineEvent::ArtifactPersisted {
                            run_id,
                            stage: artifact.kind,
                            path: artifact.path.clone(),
                        })
                        .await;
                }
                Err(err) => {
                    warn!(%run_id, path = %artifact.path, error = %err, "persist failed");
                    self.events
                        .emit(&PipelineEvent::PersistenceFailed {
                            run_id,
                            stage: artifact.kind,
                            path: artifact.path.clone(),
                            message: err.to_string(),
                        })
                        .await;
                    report.record_failure(artifact.kind, err);
                }
            }
        }

        report
    }
}

fn required(context: &GenerationContext, kind: ArtifactKind) -> Result<&Artifact> {
    context
        .get(kind)
        .ok_or_else(|| SpecForgeError::Internal(format!("{kind} artifact missing before trace")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use specforge_model::ScriptedInvoker;
    use specforge_prompt::TemplatePromptBuilder;
    use specforge_store::InMemoryArtifactWriter;

    fn orchestrator(model: ScriptedInvoker) -> Orchestrator {
        Orchestrator::new(
            PipelineConfig::default(),
            Arc::new(TemplatePromptBuilder::new()),
            Arc::new(model),
            Arc::new(InMemoryArtifactWriter::new()),
        )
    }

    #[tokio::test]
    async fn test_invalid_request_has_no_run_id() {
        let model = ScriptedInvoker::new();
        let request = ProjectRequest {
            project_name: "   ".to_string(),
            description: None,
            features: Vec::new(),
            tech_stack: Vec::new(),
            output_dir: None,
        };

        let envelope = orchestrator(model.clone()).run(request).await;

        assert!(!envelope.success);
        assert!(envelope.run_id.is_none());
        assert_eq!(envelope.error_kind.as_deref(), Some("invalid_request"));
        assert_eq!(model.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_outcome_keeps_the_error() {
        let token = CancellationToken::new();
        token.cancel();

        let request = ProjectRequest::builder().project_name("X").build().unwrap();
        let outcome = orchestrator(ScriptedInvoker::new())
            .run_outcome(request, token)
            .await;

        assert!(matches!(outcome.error, Some(SpecForgeError::Cancelled { .. })));
        assert!(!outcome.envelope.success);
        assert!(outcome.envelope.run_id.is_some());
        assert_eq!(outcome.envelope.error_kind.as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let model = ScriptedInvoker::new();
        let token = CancellationToken::new();
        token.cancel();

        let request = ProjectRequest::builder().project_name("X").build().unwrap();
        let err = orchestrator(model.clone())
            .generate(request, token)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            SpecForgeError::Cancelled {
                stage: ArtifactKind::Requirements
            }
        );
        assert_eq!(model.call_count().await, 0);
    }
}
