//! LLM client tests with mocked network responses
//!
//! These tests use wiremock to stand in for the OpenAI and Ollama APIs and
//! validate request shape, tool-call parsing and error handling.

use ares_research::llm::{generate_typed, LLMClient, ModelParams};
use ares_research::types::{Message, ToolCall, ToolDefinition};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============= Helper Functions =============

fn search_tool() -> ToolDefinition {
    ToolDefinition {
        name: "web_search".to_string(),
        description: "Search the web".to_string(),
        parameters: json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"]
        }),
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct Verdict {
    need_clarification: bool,
    question: Option<String>,
}

// ============= OpenAI =============

#[cfg(feature = "openai")]
mod openai {
    use super::*;
    use ares_research::llm::openai::OpenAIClient;
    use ares_research::types::AppError;

    fn client(server: &MockServer) -> OpenAIClient {
        OpenAIClient::new(
            "test-key".to_string(),
            format!("{}/v1", server.uri()),
            "gpt-4o-mini".to_string(),
            ModelParams::default(),
        )
    }

    fn completion(message: serde_json::Value, finish_reason: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_735_689_600,
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": message,
                "finish_reason": finish_reason
            }]
        })
    }

    #[tokio::test]
    async fn test_text_completion_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                json!({ "role": "assistant", "content": "Hello there" }),
                "stop",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server).generate("Hi").await.unwrap();
        assert_eq!(reply, "Hello there");
    }

    #[tokio::test]
    async fn test_tool_calls_are_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({ "tool_choice": "auto" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                json!({
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "web_search",
                            "arguments": "{\"query\":\"grid storage costs\"}"
                        }
                    }]
                }),
                "tool_calls",
            )))
            .mount(&server)
            .await;

        let response = client(&server)
            .generate_with_tools(&[Message::user("research storage")], &[search_tool()])
            .await
            .unwrap();

        assert_eq!(response.content, "");
        assert_eq!(response.finish_reason, "tool_calls");
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].id, "call_abc");
        assert_eq!(response.tool_calls[0].str_arg("query"), Some("grid storage costs"));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "message": "This model's maximum context length is 128000 tokens",
                    "type": "invalid_request_error",
                    "param": "messages",
                    "code": "context_length_exceeded"
                }
            })))
            .mount(&server)
            .await;

        let err = client(&server).generate("Hi").await.unwrap_err();
        assert!(matches!(err, AppError::LLM(_)));
        assert!(err.to_string().contains("maximum context length"));
    }

    #[tokio::test]
    async fn test_orphaned_tool_result_is_sent_as_user_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "messages": [
                    { "role": "system", "content": "instructions" },
                    { "role": "user", "content": "[web_search result]\nold results" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                json!({ "role": "assistant", "content": "ok" }),
                "stop",
            )))
            .expect(1)
            .mount(&server)
            .await;

        // The assistant call that produced this result fell out of the window
        let window = vec![
            Message::system("instructions"),
            Message::tool_result("call_gone", "web_search", "old results"),
        ];
        let reply = client(&server).generate_with_history(&window).await.unwrap();
        assert_eq!(reply, "ok");
    }

    #[tokio::test]
    async fn test_answered_tool_call_keeps_its_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "messages": [
                    { "role": "user", "content": "go" },
                    { "role": "assistant", "tool_calls": [{ "id": "call_1" }] },
                    { "role": "tool", "tool_call_id": "call_1", "content": "3 results" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                json!({ "role": "assistant", "content": "done" }),
                "stop",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let call = ToolCall {
            id: "call_1".to_string(),
            name: "web_search".to_string(),
            arguments: json!({ "query": "q" }),
        };
        let history = vec![
            Message::user("go"),
            Message::assistant_with_tools("", vec![call]),
            Message::tool_result("call_1", "web_search", "3 results"),
        ];
        let reply = client(&server).generate_with_history(&history).await.unwrap();
        assert_eq!(reply, "done");
    }

    #[tokio::test]
    async fn test_structured_decision_from_fenced_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                json!({
                    "role": "assistant",
                    "content": "```json\n{\"need_clarification\": true, \"question\": \"Which country?\"}\n```"
                }),
                "stop",
            )))
            .mount(&server)
            .await;

        let client = client(&server);
        let verdict: Verdict = generate_typed(&client, &[Message::user("tax rules?")])
            .await
            .unwrap();

        assert!(verdict.need_clarification);
        assert_eq!(verdict.question.as_deref(), Some("Which country?"));
    }
}

// ============= Ollama =============

#[cfg(feature = "ollama")]
mod ollama {
    use super::*;
    use ares_research::llm::ollama::OllamaClient;

    fn client(server: &MockServer) -> OllamaClient {
        OllamaClient::new(server.uri(), "llama3.2".to_string(), ModelParams::default()).unwrap()
    }

    #[tokio::test]
    async fn test_chat_is_not_streamed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({ "model": "llama3.2", "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3.2",
                "created_at": "2025-01-01T00:00:00Z",
                "message": { "role": "assistant", "content": "Hello from Ollama" },
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server).generate("Hi").await.unwrap();
        assert_eq!(reply, "Hello from Ollama");
    }

    #[tokio::test]
    async fn test_tool_calls_get_generated_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3.2",
                "created_at": "2025-01-01T00:00:00Z",
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [
                        { "function": { "name": "web_search", "arguments": { "query": "a" } } },
                        { "function": { "name": "web_search", "arguments": { "query": "b" } } }
                    ]
                },
                "done": true
            })))
            .mount(&server)
            .await;

        let response = client(&server)
            .generate_with_tools(&[Message::user("search twice")], &[search_tool()])
            .await
            .unwrap();

        assert_eq!(response.tool_calls.len(), 2);
        assert_eq!(response.finish_reason, "tool_calls");
        assert_ne!(response.tool_calls[0].id, response.tool_calls[1].id);
        assert_eq!(response.tool_calls[1].str_arg("query"), Some("b"));
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let err = client(&server).generate("Hi").await.unwrap_err();
        assert!(err.to_string().contains("model not loaded"));
    }
}
