//! Ollama client for local inference via `/api/chat`

use crate::llm::client::{LLMClient, LLMResponse, ModelParams};
use crate::types::{AppError, Message, MessageRole, Result, ToolCall, ToolDefinition};
use async_trait::async_trait;
use ollama_rs::{
    generation::{
        chat::{request::ChatMessageRequest, ChatMessage, MessageRole as OllamaRole},
        tools::{
            ToolCall as OllamaToolCall, ToolCallFunction, ToolFunctionInfo, ToolInfo, ToolType,
        },
    },
    models::ModelOptions,
    Ollama,
};

const DEFAULT_PORT: u16 = 11434;

pub struct OllamaClient {
    client: Ollama,
    model: String,
    params: ModelParams,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String, params: ModelParams) -> Result<Self> {
        let (host, port) = split_base_url(&base_url)?;

        Ok(Self {
            client: Ollama::new(host, port),
            model,
            params,
        })
    }

    async fn chat(&self, messages: &[Message], tools: &[ToolDefinition]) -> Result<LLMResponse> {
        let chat_messages: Vec<ChatMessage> = messages.iter().map(to_chat_message).collect();

        let options = ModelOptions::default()
            .temperature(self.params.temperature)
            .num_predict(self.params.max_tokens as i32);
        let mut request =
            ChatMessageRequest::new(self.model.clone(), chat_messages).options(options);

        if !tools.is_empty() {
            request = request.tools(
                tools
                    .iter()
                    .map(to_tool_info)
                    .collect::<Result<Vec<_>>>()?,
            );
        }

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AppError::LLM(format!("Ollama error: {}", e)))?;

        // Ollama does not id its tool calls
        let tool_calls: Vec<ToolCall> = response
            .message
            .tool_calls
            .into_iter()
            .map(|call| ToolCall {
                id: uuid::Uuid::new_v4().to_string(),
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();
        let finish_reason = if tool_calls.is_empty() { "stop" } else { "tool_calls" };

        Ok(LLMResponse {
            content: response.message.content,
            tool_calls,
            finish_reason: finish_reason.to_string(),
        })
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate_with_history(&self, messages: &[Message]) -> Result<String> {
        Ok(self.chat(messages, &[]).await?.content)
    }

    async fn generate_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        self.chat(messages, tools).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Split `http://host:port` into the `(scheme://host, port)` pair the client takes.
fn split_base_url(base_url: &str) -> Result<(String, u16)> {
    let url = reqwest::Url::parse(base_url).map_err(|e| {
        AppError::Configuration(format!("Invalid Ollama base_url '{}': {}", base_url, e))
    })?;
    let host = url.host_str().ok_or_else(|| {
        AppError::Configuration(format!("Ollama base_url '{}' has no host", base_url))
    })?;

    Ok((
        format!("{}://{}", url.scheme(), host),
        url.port().unwrap_or(DEFAULT_PORT),
    ))
}

// Ollama does not correlate tool results by id, so no pairing is needed.
fn to_chat_message(msg: &Message) -> ChatMessage {
    let role = match msg.role {
        MessageRole::System => OllamaRole::System,
        MessageRole::User => OllamaRole::User,
        MessageRole::Assistant => OllamaRole::Assistant,
        MessageRole::Tool => OllamaRole::Tool,
    };
    let mut chat_message = ChatMessage::new(role, msg.content.clone());
    chat_message.tool_calls = msg
        .tool_calls
        .iter()
        .map(|tc| OllamaToolCall {
            function: ToolCallFunction {
                name: tc.name.clone(),
                arguments: tc.arguments.clone(),
            },
        })
        .collect();
    chat_message
}

fn to_tool_info(tool: &ToolDefinition) -> Result<ToolInfo> {
    let parameters = schemars::Schema::try_from(tool.parameters.clone()).map_err(|e| {
        AppError::InvalidInput(format!("Tool '{}' has an invalid schema: {}", tool.name, e))
    })?;

    Ok(ToolInfo {
        tool_type: ToolType::Function,
        function: ToolFunctionInfo {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_url_with_port() {
        let (host, port) = split_base_url("http://192.168.1.100:8080").unwrap();
        assert_eq!(host, "http://192.168.1.100");
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_base_url_default_port() {
        let (host, port) = split_base_url("http://localhost").unwrap();
        assert_eq!(host, "http://localhost");
        assert_eq!(port, DEFAULT_PORT);
    }

    #[test]
    fn test_invalid_base_url() {
        let err = split_base_url("localhost:11434/api").err();
        assert!(matches!(err, Some(AppError::Configuration(_))));
    }

    #[test]
    fn test_assistant_calls_are_forwarded() {
        let call = ToolCall::new("web_search", json!({"query": "tokio"}));
        let chat_message = to_chat_message(&Message::assistant_with_tools("", vec![call]));

        assert_eq!(chat_message.tool_calls.len(), 1);
        assert_eq!(chat_message.tool_calls[0].function.name, "web_search");
        assert_eq!(chat_message.tool_calls[0].function.arguments["query"], "tokio");
    }

    #[test]
    fn test_tool_schema_conversion() {
        let tool = ToolDefinition {
            name: "web_search".to_string(),
            description: "Search the web".to_string(),
            parameters: json!({"type": "object", "properties": {"query": {"type": "string"}}}),
        };
        let info = to_tool_info(&tool).unwrap();
        assert_eq!(info.function.name, "web_search");
    }
}
