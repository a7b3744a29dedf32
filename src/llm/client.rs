//! LLM client abstraction and provider selection
//!
//! Every decision call made by the research stages goes through [`LLMClient`]:
//! - **OpenAI**: chat-completions API and compatible endpoints
//! - **Ollama**: local inference via `/api/chat`
//!
//! Provider wire formats stay inside the client implementations; stages only
//! see [`Message`]s in and [`LLMResponse`]s or JSON objects out.

use crate::types::{AppError, Message, Result, ToolCall, ToolDefinition};
use crate::utils::toml_config::{ModelConfig, ProviderConfig};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Generic LLM client trait for provider abstraction
///
/// All LLM providers implement this trait, allowing for easy swapping
/// between providers without changing application code.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a single user prompt
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_history(&[Message::user(prompt)]).await
    }

    /// Generate with conversation history
    async fn generate_with_history(&self, messages: &[Message]) -> Result<String>;

    /// Generate with tool calling support
    async fn generate_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse>;

    /// Generate a JSON object conforming to `schema`
    ///
    /// The default asks for the object in plain text and extracts it from the
    /// reply, which works for any chat model.
    async fn generate_structured(&self, messages: &[Message], schema: &Value) -> Result<Value> {
        let mut request = messages.to_vec();
        request.push(Message::user(format!(
            "Respond with a single JSON object that matches this JSON schema and nothing else:\n{}",
            schema
        )));
        let raw = self.generate_with_history(&request).await?;
        extract_json_object(&raw)
    }

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Response from an LLM generation request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LLMResponse {
    /// The text content of the response
    pub content: String,
    /// Any tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
    /// The reason generation stopped (e.g., "stop", "tool_calls", "length")
    pub finish_reason: String,
}

impl LLMResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            finish_reason: "stop".to_string(),
        }
    }

    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            finish_reason: "tool_calls".to_string(),
        }
    }

    /// Convert into the assistant message appended to a transcript
    pub fn into_message(self) -> Message {
        Message::assistant_with_tools(self.content, self.tool_calls)
    }
}

/// Decode a structured decision into `T`, deriving the schema from the type.
pub async fn generate_typed<T>(client: &dyn LLMClient, messages: &[Message]) -> Result<T>
where
    T: DeserializeOwned + JsonSchema,
{
    let schema = serde_json::to_value(schemars::schema_for!(T))
        .map_err(|e| AppError::Internal(format!("Failed to build schema: {}", e)))?;
    let value = client.generate_structured(messages, &schema).await?;
    serde_json::from_value(value)
        .map_err(|e| AppError::LLM(format!("Malformed structured response: {}", e)))
}

/// Pull the first JSON object out of a model reply.
///
/// Tolerates markdown code fences and prose around the object.
pub fn extract_json_object(raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&trimmed[start..=end])
            .map_err(|e| AppError::LLM(format!("Response is not valid JSON: {}", e))),
        _ => Err(AppError::LLM(format!(
            "Response does not contain a JSON object: {}",
            truncate_for_log(trimmed)
        ))),
    }
}

fn truncate_for_log(text: &str) -> String {
    const MAX: usize = 120;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX).collect();
        format!("{}...", head)
    }
}

/// Sampling parameters shared by every provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 4096,
        }
    }
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI API provider (including compatible APIs such as OpenRouter)
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "sk-...".to_string(),
    ///     api_base: "https://api.openai.com/v1".to_string(),
    ///     model: "gpt-4o".to_string(),
    ///     params: ModelParams::default(),
    /// };
    /// ```
    #[cfg(feature = "openai")]
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        params: ModelParams,
    },

    /// Ollama local LLM provider
    #[cfg(feature = "ollama")]
    Ollama {
        base_url: String,
        model: String,
        params: ModelParams,
    },
}

impl Provider {
    /// Resolve a model profile against its provider definition.
    ///
    /// API keys are read from the environment variable the provider names.
    pub fn from_model_config(model: &ModelConfig, provider: &ProviderConfig) -> Result<Self> {
        let params = ModelParams {
            temperature: model.temperature,
            max_tokens: model.max_tokens,
        };

        match provider {
            #[cfg(feature = "openai")]
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
                ..
            } => {
                let api_key = std::env::var(api_key_env).map_err(|_| {
                    AppError::Configuration(format!(
                        "Environment variable '{}' is not set",
                        api_key_env
                    ))
                })?;
                Ok(Provider::OpenAI {
                    api_key,
                    api_base: api_base.clone(),
                    model: model.model.clone(),
                    params,
                })
            }

            #[cfg(feature = "ollama")]
            ProviderConfig::Ollama { base_url, .. } => Ok(Provider::Ollama {
                base_url: base_url.clone(),
                model: model.model.clone(),
                params,
            }),

            #[allow(unreachable_patterns)]
            other => Err(AppError::Configuration(format!(
                "Provider type '{}' is not enabled in this build",
                other.kind()
            ))),
        }
    }

    /// Create a client instance for this provider
    pub fn create_client(&self) -> Result<Arc<dyn LLMClient>> {
        match self {
            #[cfg(feature = "openai")]
            Provider::OpenAI {
                api_key,
                api_base,
                model,
                params,
            } => Ok(Arc::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                *params,
            ))),

            #[cfg(feature = "ollama")]
            Provider::Ollama {
                base_url,
                model,
                params,
            } => Ok(Arc::new(super::ollama::OllamaClient::new(
                base_url.clone(),
                model.clone(),
                *params,
            )?)),

            #[allow(unreachable_patterns)]
            _ => Err(AppError::Configuration(
                "No LLM provider is enabled in this build".to_string(),
            )),
        }
    }

    /// Get the provider name as a string
    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "openai")]
            Provider::OpenAI { .. } => "openai",
            #[cfg(feature = "ollama")]
            Provider::Ollama { .. } => "ollama",
            #[allow(unreachable_patterns)]
            _ => "none",
        }
    }
}
