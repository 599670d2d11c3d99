//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use specforge_core::{Result, SpecForgeError};

/// Configuration for the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root under which each project's directory is created.
    pub output_dir: PathBuf,

    /// Upper bound on a single model call.
    pub invoke_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./specs"),
            invoke_timeout: Duration::from_secs(120),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(SpecForgeError::Config("output directory is empty".to_string()));
        }
        if self.invoke_timeout.is_zero() {
            return Err(SpecForgeError::Config(
                "invocation timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
