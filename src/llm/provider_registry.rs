//! Provider Registry for resolving named model profiles
//!
//! Research stages refer to models by profile name (`decision_model`,
//! `compression_model`, ...). The registry resolves a profile through its
//! `[models.*]` entry to the `[providers.*]` entry and builds the client.

use crate::llm::client::{LLMClient, Provider};
use crate::types::{AppError, Result};
use crate::utils::toml_config::{ModelConfig, ProviderConfig, ResearchConfig};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry for managing multiple named LLM providers
pub struct ProviderRegistry {
    /// Provider configurations keyed by name
    providers: HashMap<String, ProviderConfig>,
    /// Model configurations keyed by name
    models: HashMap<String, ModelConfig>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// Create a new empty provider registry
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            models: HashMap::new(),
        }
    }

    /// Create a provider registry from TOML configuration
    pub fn from_config(config: &ResearchConfig) -> Self {
        Self {
            providers: config.providers.clone(),
            models: config.models.clone(),
        }
    }

    /// Register a provider configuration
    pub fn register_provider(&mut self, name: &str, config: ProviderConfig) {
        self.providers.insert(name.to_string(), config);
    }

    /// Register a model configuration
    pub fn register_model(&mut self, name: &str, config: ModelConfig) {
        self.models.insert(name.to_string(), config);
    }

    pub fn get_model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.get(name)
    }

    /// Resolve the model -> provider chain into a [`Provider`]
    pub fn resolve(&self, model_name: &str) -> Result<Provider> {
        let model_config = self.get_model(model_name).ok_or_else(|| {
            AppError::Configuration(format!("Model '{}' not found in configuration", model_name))
        })?;

        let provider_config = self.providers.get(&model_config.provider).ok_or_else(|| {
            AppError::Configuration(format!(
                "Provider '{}' referenced by model '{}' not found",
                model_config.provider, model_name
            ))
        })?;

        Provider::from_model_config(model_config, provider_config)
    }

    /// Create an LLM client for a specific model by name
    pub fn create_client_for_model(&self, model_name: &str) -> Result<Arc<dyn LLMClient>> {
        let provider = self.resolve(model_name)?;
        tracing::debug!(model = model_name, provider = provider.name(), "Creating LLM client");
        provider.create_client()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ollama_model(provider: &str) -> ModelConfig {
        ModelConfig {
            provider: provider.to_string(),
            model: "llama3.2".to_string(),
            temperature: 0.1,
            max_tokens: 1024,
        }
    }

    #[test]
    fn test_unknown_model_is_configuration_error() {
        let registry = ProviderRegistry::new();
        assert!(matches!(
            registry.create_client_for_model("missing"),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_dangling_provider_reference() {
        let mut registry = ProviderRegistry::new();
        registry.register_model("fast", ollama_model("nowhere"));
        let err = registry.resolve("fast").unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }

    #[cfg(feature = "ollama")]
    #[test]
    fn test_resolves_ollama_profile() {
        let mut registry = ProviderRegistry::new();
        registry.register_provider(
            "local",
            ProviderConfig::Ollama {
                base_url: "http://localhost:11434".to_string(),
                default_model: None,
            },
        );
        registry.register_model("fast", ollama_model("local"));

        let client = registry.create_client_for_model("fast").unwrap();
        assert_eq!(client.model_name(), "llama3.2");
    }
}
