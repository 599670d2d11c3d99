//! # SpecForge Pipeline
//!
//! Runs one generation request end to end: requirements, architecture and
//! backlog from the model in that order, then the trace, then persistence.

pub mod config;
pub mod events;
pub mod orchestrator;

pub use config::PipelineConfig;
pub use events::{BroadcastEmitter, EventEmitter, FanoutEmitter, NoopEmitter, TracingEmitter};
pub use orchestrator::{Orchestrator, RunOutcome, RunOutput};
pub use tokio_util::sync::CancellationToken;
