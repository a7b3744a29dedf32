//! OpenAI-compatible chat-completions client
//!
//! Works against api.openai.com and any endpoint that speaks the same
//! `/chat/completions` protocol (OpenRouter, vLLM, LM Studio, ...).

use crate::llm::client::{LLMClient, LLMResponse, ModelParams};
use crate::types::{AppError, Message, MessageRole, Result, ToolCall, ToolDefinition};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessage,
        ChatCompletionTool, ChatCompletionToolChoiceOption, ChatCompletionToolType,
        CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
    },
    Client,
};
use async_trait::async_trait;
use std::collections::HashSet;

pub struct OpenAIClient {
    client: Client<OpenAIConfig>,
    model: String,
    params: ModelParams,
}

impl OpenAIClient {
    pub fn new(api_key: String, api_base: String, model: String, params: ModelParams) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);

        Self {
            client: Client::with_config(config),
            model,
            params,
        }
    }

    #[allow(deprecated)]
    async fn chat(&self, messages: &[Message], tools: &[ToolDefinition]) -> Result<LLMResponse> {
        let chat_messages = pair_tool_messages(messages)
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(chat_messages)
            .temperature(self.params.temperature)
            .max_tokens(self.params.max_tokens);

        if !tools.is_empty() {
            let openai_tools: Vec<ChatCompletionTool> = tools
                .iter()
                .map(|tool| ChatCompletionTool {
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionObject {
                        name: tool.name.clone(),
                        description: Some(tool.description.clone()),
                        parameters: Some(tool.parameters.clone()),
                        strict: None,
                    },
                })
                .collect();
            args.tools(openai_tools)
                .tool_choice(ChatCompletionToolChoiceOption::Auto);
        }

        let request = args
            .build()
            .map_err(|e| AppError::LLM(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AppError::LLM(format!("OpenAI API error: {}", e)))?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| AppError::LLM("No response from OpenAI".to_string()))?;

        let content = choice.message.content.clone().unwrap_or_default();
        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .iter()
            .flatten()
            .map(|call| ToolCall {
                id: call.id.clone(),
                name: call.function.name.clone(),
                // Arguments arrive as a JSON-encoded string
                arguments: serde_json::from_str(&call.function.arguments)
                    .unwrap_or_else(|_| serde_json::json!({})),
            })
            .collect();

        // FinishReason serializes to the wire names ("stop", "tool_calls", ...)
        let finish_reason = choice
            .finish_reason
            .as_ref()
            .and_then(|r| serde_json::to_value(r).ok())
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| {
                if tool_calls.is_empty() { "stop" } else { "tool_calls" }.to_string()
            });

        Ok(LLMResponse {
            content,
            tool_calls,
            finish_reason,
        })
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
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

/// Make a windowed transcript acceptable to the chat-completions API.
///
/// The API rejects tool messages without a preceding matching call and calls
/// without a matching result. Unanswered calls are dropped and orphaned
/// results become user messages.
fn pair_tool_messages(messages: &[Message]) -> Vec<Message> {
    let answered: HashSet<&str> = messages
        .iter()
        .filter(|m| m.role == MessageRole::Tool)
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();
    let mut issued: HashSet<String> = HashSet::new();
    let mut paired = Vec::with_capacity(messages.len());

    for msg in messages {
        match msg.role {
            MessageRole::Assistant if msg.has_tool_calls() => {
                let calls: Vec<ToolCall> = msg
                    .tool_calls
                    .iter()
                    .filter(|tc| answered.contains(tc.id.as_str()))
                    .cloned()
                    .collect();
                issued.extend(calls.iter().map(|tc| tc.id.clone()));
                paired.push(Message::assistant_with_tools(msg.content.clone(), calls));
            }
            MessageRole::Tool => match msg.tool_call_id.as_deref() {
                Some(id) if issued.contains(id) => paired.push(msg.clone()),
                _ => paired.push(Message::user(format!(
                    "[{} result]\n{}",
                    msg.name.as_deref().unwrap_or("tool"),
                    msg.content
                ))),
            },
            _ => paired.push(msg.clone()),
        }
    }

    paired
}

fn to_request_message(msg: &Message) -> Result<ChatCompletionRequestMessage> {
    let message = match msg.role {
        MessageRole::System => ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessage::from(msg.content.clone()),
        ),
        MessageRole::User => ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage::from(msg.content.clone()),
        ),
        MessageRole::Assistant => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            if !msg.content.is_empty() || !msg.has_tool_calls() {
                args.content(msg.content.clone());
            }
            if msg.has_tool_calls() {
                let calls: Vec<ChatCompletionMessageToolCall> = msg
                    .tool_calls
                    .iter()
                    .map(|tc| ChatCompletionMessageToolCall {
                        id: tc.id.clone(),
                        r#type: ChatCompletionToolType::Function,
                        function: FunctionCall {
                            name: tc.name.clone(),
                            arguments: tc.arguments.to_string(),
                        },
                    })
                    .collect();
                args.tool_calls(calls);
            }
            ChatCompletionRequestMessage::Assistant(
                args.build()
                    .map_err(|e| AppError::LLM(format!("Failed to build message: {}", e)))?,
            )
        }
        MessageRole::Tool => ChatCompletionRequestMessage::Tool(
            ChatCompletionRequestToolMessageArgs::default()
                .tool_call_id(msg.tool_call_id.clone().unwrap_or_default())
                .content(msg.content.clone())
                .build()
                .map_err(|e| AppError::LLM(format!("Failed to build message: {}", e)))?,
        ),
    };
    Ok(message)
}
