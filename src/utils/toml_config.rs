//! TOML-based configuration for A.R.E.S Research
//!
//! This module provides declarative configuration for providers, models, the
//! search backend and the research bounds via a TOML file (`research.toml`).
//!
//! The configuration is read-only for the duration of a run. Use
//! [`ConfigManager`] for lock-free access and explicit reloads between runs.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Root configuration structure loaded from research.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Named LLM provider configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Named model configurations that reference providers
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub research: ResearchSettings,
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        default_model: Option<String>,
    },
    OpenAI {
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        default_model: Option<String>,
    },
}

impl ProviderConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderConfig::Ollama { .. } => "ollama",
            ProviderConfig::OpenAI { .. } => "openai",
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

// ============= Model Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Reference to a provider name
    pub provider: String,
    /// Model identifier sent to the provider
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    4096
}

// ============= Search Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    Tavily,
    DuckDuckGo,
    Mock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_backend")]
    pub provider: SearchBackend,
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_search_base")]
    pub api_base: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: default_search_backend(),
            api_key_env: default_search_key_env(),
            api_base: default_search_base(),
            max_results: default_max_results(),
        }
    }
}

fn default_search_backend() -> SearchBackend {
    SearchBackend::Tavily
}

fn default_search_key_env() -> String {
    "TAVILY_API_KEY".to_string()
}

fn default_search_base() -> String {
    "https://api.tavily.com".to_string()
}

fn default_max_results() -> usize {
    3
}

// ============= Research Configuration =============

/// Bounds and model profiles for one research run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchSettings {
    /// Workers dispatched concurrently per supervisor iteration
    #[serde(default = "default_max_delegates")]
    pub max_delegates: usize,
    /// Agent passes a worker may make before it must compress
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls_per_worker: u32,
    #[serde(default = "default_max_iterations")]
    pub max_supervisor_iterations: u32,
    /// Most recent messages a worker sends alongside its instructions
    #[serde(default = "default_message_window")]
    pub worker_message_window: usize,
    /// Wall-clock deadline for the whole run
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Hard cap on coordinator and agent passes across the run, workers included
    #[serde(default = "default_step_limit")]
    pub step_limit: u32,
    #[serde(default = "default_true")]
    pub allow_clarification: bool,
    /// Model profile used for clarification, briefing, coordination and workers
    #[serde(default = "default_decision_model")]
    pub decision_model: String,
    /// Model profile for worker compression (defaults to the decision model)
    #[serde(default)]
    pub compression_model: Option<String>,
    /// Model profile for the final report (defaults to the decision model)
    #[serde(default)]
    pub report_model: Option<String>,
    #[serde(default)]
    pub preset: Option<Preset>,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            max_delegates: default_max_delegates(),
            max_tool_calls_per_worker: default_max_tool_calls(),
            max_supervisor_iterations: default_max_iterations(),
            worker_message_window: default_message_window(),
            timeout_ms: default_timeout_ms(),
            step_limit: default_step_limit(),
            allow_clarification: true,
            decision_model: default_decision_model(),
            compression_model: None,
            report_model: None,
            preset: None,
        }
    }
}

impl ResearchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn compression_model(&self) -> &str {
        self.compression_model
            .as_deref()
            .unwrap_or(&self.decision_model)
    }

    pub fn report_model(&self) -> &str {
        self.report_model.as_deref().unwrap_or(&self.decision_model)
    }
}

fn default_max_delegates() -> usize {
    3
}

fn default_max_tool_calls() -> u32 {
    15
}

fn default_max_iterations() -> u32 {
    10
}

fn default_message_window() -> usize {
    crate::memory::DEFAULT_MESSAGE_WINDOW
}

fn default_timeout_ms() -> u64 {
    300_000
}

fn default_step_limit() -> u32 {
    1_000
}

fn default_true() -> bool {
    true
}

fn default_decision_model() -> String {
    "decision".to_string()
}

/// Named bundles of research bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Quick,
    Comprehensive,
    Deep,
}

impl Preset {
    /// Overwrite the research bounds with this preset's values
    pub fn apply(&self, settings: &mut ResearchSettings) {
        let (delegates, tool_calls, timeout_ms) = match self {
            Preset::Quick => (2, 5, 120_000),
            Preset::Comprehensive => (5, 15, 600_000),
            Preset::Deep => (3, 20, 900_000),
        };
        settings.max_delegates = delegates;
        settings.max_tool_calls_per_worker = tool_calls;
        settings.timeout_ms = timeout_ms;
        settings.preset = Some(*self);
    }

    pub fn temperature(&self) -> f32 {
        match self {
            Preset::Quick => 0.2,
            Preset::Comprehensive => 0.1,
            Preset::Deep => 0.05,
        }
    }
}

// ============= Errors =============

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Provider '{0}' referenced by model '{1}' does not exist")]
    MissingProvider(String, String),

    #[error("Model '{0}' referenced by '{1}' does not exist")]
    MissingModel(String, String),
}

impl From<ConfigError> for crate::types::AppError {
    fn from(err: ConfigError) -> Self {
        crate::types::AppError::Configuration(err.to_string())
    }
}

impl ResearchConfig {
    /// Load configuration from a TOML file, apply its preset and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration text, apply its preset and validate it
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: ResearchConfig = toml::from_str(content)?;
        if let Some(preset) = config.research.preset {
            config.apply_preset(preset);
        }
        config.validate()?;
        Ok(config)
    }

    /// Apply a preset's bounds and sampling temperature
    pub fn apply_preset(&mut self, preset: Preset) {
        preset.apply(&mut self.research);
        for model in self.models.values_mut() {
            model.temperature = preset.temperature();
        }
    }

    /// Validate internal references and bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, model) in &self.models {
            if !self.providers.contains_key(&model.provider) {
                return Err(ConfigError::MissingProvider(
                    model.provider.clone(),
                    name.clone(),
                ));
            }
        }

        let research = &self.research;
        for (role, profile) in [
            ("decision_model", research.decision_model.as_str()),
            ("compression_model", research.compression_model()),
            ("report_model", research.report_model()),
        ] {
            if !self.models.contains_key(profile) {
                return Err(ConfigError::MissingModel(profile.to_string(), role.into()));
            }
        }

        if research.max_delegates == 0 {
            return Err(ConfigError::ValidationError(
                "research.max_delegates must be at least 1".into(),
            ));
        }
        if research.max_tool_calls_per_worker == 0 {
            return Err(ConfigError::ValidationError(
                "research.max_tool_calls_per_worker must be at least 1".into(),
            ));
        }
        if research.worker_message_window == 0 {
            return Err(ConfigError::ValidationError(
                "research.worker_message_window must be at least 1".into(),
            ));
        }
        if research.timeout_ms == 0 || research.step_limit == 0 {
            return Err(ConfigError::ValidationError(
                "research.timeout_ms and research.step_limit must be positive".into(),
            ));
        }
        if self.search.max_results == 0 {
            return Err(ConfigError::ValidationError(
                "search.max_results must be at least 1".into(),
            ));
        }

        Ok(())
    }

    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    pub fn get_model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.get(name)
    }
}

/// Starter configuration written by `ares-research init`
pub const STARTER_CONFIG: &str = r#"# A.R.E.S Research configuration

[providers.local]
type = "ollama"
base_url = "http://localhost:11434"

[providers.openai]
type = "openai"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1"

[models.decision]
provider = "local"
model = "llama3.2"
temperature = 0.1
max_tokens = 4096

[models.compression]
provider = "local"
model = "llama3.2"
temperature = 0.1
max_tokens = 2048

[search]
# tavily | duckduckgo | mock
provider = "duckduckgo"
api_key_env = "TAVILY_API_KEY"
max_results = 3

[research]
max_delegates = 3
max_tool_calls_per_worker = 15
max_supervisor_iterations = 10
worker_message_window = 8
timeout_ms = 300000
step_limit = 1000
allow_clarification = true
decision_model = "decision"
compression_model = "compression"
# preset = "quick" | "comprehensive" | "deep"
"#;

// ============= Configuration Manager =============

/// Thread-safe configuration holder with lock-free reads
pub struct ConfigManager {
    config: Arc<ArcSwap<ResearchConfig>>,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager and load the initial config
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let config = ResearchConfig::load(&path)?;

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: path,
        })
    }

    /// Wrap an already-built configuration
    pub fn from_config(config: ResearchConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: PathBuf::from("research.toml"),
        }
    }

    /// Get the current configuration (lockless read)
    pub fn config(&self) -> Arc<ResearchConfig> {
        self.config.load_full()
    }

    /// Reload the configuration from disk; the old one stays on failure
    pub fn reload(&self) -> Result<(), ConfigError> {
        info!("Reloading configuration from {:?}", self.config_path);

        let new_config = ResearchConfig::load(&self.config_path)?;
        self.config.store(Arc::new(new_config));

        info!("Configuration reloaded successfully");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }
}
