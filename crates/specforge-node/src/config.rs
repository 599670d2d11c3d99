//! Node configuration, read from the environment once at start-up.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use specforge_core::{Result, SpecForgeError};
use specforge_model::ModelConfig;
use specforge_pipeline::PipelineConfig;
use specforge_prompt::PromptConfig;

use crate::registry::DEFAULT_MAX_RUNS;

/// Which model adapter serves requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProvider {
    /// Anthropic Messages API.
    Anthropic,
    /// Offline echo of the prompt.
    Echo,
}

impl FromStr for ModelProvider {
    type Err = SpecForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(ModelProvider::Anthropic),
            "echo" => Ok(ModelProvider::Echo),
            other => Err(SpecForgeError::Config(format!(
                "unknown model provider: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind: SocketAddr,
    pub output_dir: PathBuf,
    pub provider: ModelProvider,
    pub model: ModelConfig,
    pub prompt: PromptConfig,

    /// Finished runs the registry keeps before evicting the oldest.
    pub max_runs: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            output_dir: PathBuf::from("./specs"),
            provider: ModelProvider::Anthropic,
            model: ModelConfig::default(),
            prompt: PromptConfig::default(),
            max_runs: DEFAULT_MAX_RUNS,
        }
    }
}

impl NodeConfig {
    /// Read `SPECFORGE_*` and `ANTHROPIC_API_KEY` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset and blank values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(bind) = get("SPECFORGE_BIND") {
            config.bind = parse("SPECFORGE_BIND", &bind)?;
        }
        if let Some(dir) = get("SPECFORGE_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(provider) = get("SPECFORGE_MODEL_PROVIDER") {
            config.provider = provider.parse()?;
        }
        if let Some(key) = get("ANTHROPIC_API_KEY") {
            config.model.api_key = key;
        }
        if let Some(model) = get("SPECFORGE_MODEL") {
            config.model.model = model;
        }
        if let Some(url) = get("SPECFORGE_API_URL") {
            config.model.api_url = url;
        }
        if let Some(tokens) = get("SPECFORGE_MAX_TOKENS") {
            config.model.max_tokens = parse("SPECFORGE_MAX_TOKENS", &tokens)?;
        }
        if let Some(secs) = get("SPECFORGE_TIMEOUT_SECS") {
            config.model.timeout = Duration::from_secs(parse("SPECFORGE_TIMEOUT_SECS", &secs)?);
        }
        config.prompt.language = get("SPECFORGE_LANGUAGE");
        if let Some(weeks) = get("SPECFORGE_SPRINT_WEEKS") {
            config.prompt.sprint_length_weeks = parse("SPECFORGE_SPRINT_WEEKS", &weeks)?;
        }

        if let Some(runs) = get("SPECFORGE_MAX_RUNS") {
            config.max_runs = parse("SPECFORGE_MAX_RUNS", &runs)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match self.provider {
            ModelProvider::Anthropic => self.model.validate()?,
            ModelProvider::Echo => {
                if self.model.timeout.is_zero() {
                    return Err(SpecForgeError::Config(
                        "model timeout must be positive".to_string(),
                    ));
                }
            }
        }
        if self.max_runs == 0 {
            return Err(SpecForgeError::Config(
                "the run registry must keep at least one run".to_string(),
            ));
        }
        if self.prompt.sprint_length_weeks == 0 {
            return Err(SpecForgeError::Config(
                "sprint length must be at least one week".to_string(),
            ));
        }
        self.pipeline().validate()
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            output_dir: self.output_dir.clone(),
            invoke_timeout: self.model.timeout,
        }
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| SpecForgeError::Config(format!("{key} has an invalid value: {value}")))
}
