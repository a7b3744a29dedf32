//! Mock implementations for testing.
//!
//! Scripted LLM clients, researchers and search providers shared by the
//! integration tests, so no test needs a live model or network.

use ares_research::llm::{LLMClient, LLMResponse};
use ares_research::research::{RunBudget, TopicResearcher, WorkerOutput};
use ares_research::search::{SearchProvider, SearchResponse, SearchResult};
use ares_research::types::{AppError, Message, Result, ToolCall, ToolDefinition};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// LLM client that replays queued responses per call kind.
///
/// - `generate_with_tools` pops a tool turn; when the queue is empty it
///   repeats the configured fallback turn, or stalls if told to, or replies
///   with plain text.
/// - `generate_with_history` pops a text reply, falling back to `"ok"`.
/// - `generate_structured` pops a JSON object; an empty queue is an error.
#[derive(Default)]
pub struct ScriptedLLM {
    tool_turns: Mutex<VecDeque<Result<LLMResponse>>>,
    repeat_turn: Option<LLMResponse>,
    stall: Option<Duration>,
    texts: Mutex<VecDeque<Result<String>>>,
    structured: Mutex<VecDeque<Result<Value>>>,
    prompts: Mutex<Vec<String>>,
    pub tool_calls: AtomicUsize,
    pub text_calls: AtomicUsize,
    pub structured_calls: AtomicUsize,
}

impl ScriptedLLM {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool_turn(self, calls: Vec<ToolCall>) -> Self {
        self.tool_turns
            .lock()
            .unwrap()
            .push_back(Ok(LLMResponse::with_tool_calls("", calls)));
        self
    }

    pub fn with_tool_failure(self, message: &str) -> Self {
        self.tool_turns
            .lock()
            .unwrap()
            .push_back(Err(AppError::LLM(message.to_string())));
        self
    }

    /// Reply with these calls once the queued turns run out
    pub fn repeating(mut self, calls: Vec<ToolCall>) -> Self {
        self.repeat_turn = Some(LLMResponse::with_tool_calls("", calls));
        self
    }

    /// Hang for `delay` once the queued turns run out
    pub fn stalling(mut self, delay: Duration) -> Self {
        self.stall = Some(delay);
        self
    }

    pub fn with_text(self, text: &str) -> Self {
        self.texts.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn with_text_failure(self, message: &str) -> Self {
        self.texts
            .lock()
            .unwrap()
            .push_back(Err(AppError::LLM(message.to_string())));
        self
    }

    pub fn with_structured(self, value: Value) -> Self {
        self.structured.lock().unwrap().push_back(Ok(value));
        self
    }

    pub fn with_structured_failure(self, message: &str) -> Self {
        self.structured
            .lock()
            .unwrap()
            .push_back(Err(AppError::LLM(message.to_string())));
        self
    }

    /// Last user message of every `generate_with_history` call
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn tool_call_count(&self) -> usize {
        self.tool_calls.load(Ordering::SeqCst)
    }

    pub fn text_call_count(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn structured_call_count(&self) -> usize {
        self.structured_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMClient for ScriptedLLM {
    async fn generate_with_history(&self, messages: &[Message]) -> Result<String> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(last) = messages.last() {
            self.prompts.lock().unwrap().push(last.content.clone());
        }
        self.texts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("ok".to_string()))
    }

    async fn generate_with_tools(
        &self,
        _messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        self.tool_calls.fetch_add(1, Ordering::SeqCst);
        let queued = self.tool_turns.lock().unwrap().pop_front();
        match (queued, &self.repeat_turn) {
            (Some(turn), _) => turn,
            (None, Some(turn)) => Ok(turn.clone()),
            (None, None) => {
                if let Some(delay) = self.stall {
                    tokio::time::sleep(delay).await;
                }
                Ok(LLMResponse::text("Nothing further to do."))
            }
        }
    }

    async fn generate_structured(&self, _messages: &[Message], _schema: &Value) -> Result<Value> {
        self.structured_calls.fetch_add(1, Ordering::SeqCst);
        self.structured
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::LLM("no structured response scripted".into())))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Researcher that records every topic and how many ran at once.
#[derive(Default)]
pub struct CountingResearcher {
    topics: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    fail_on: Option<String>,
    delay: Option<Duration>,
}

impl CountingResearcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail whenever this topic is researched
    pub fn failing_on(mut self, topic: &str) -> Self {
        self.fail_on = Some(topic.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Topics researched so far, sorted
    pub fn topics(&self) -> Vec<String> {
        let mut topics = self.topics.lock().unwrap().clone();
        topics.sort();
        topics
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

pub fn findings_for(topic: &str) -> String {
    format!("findings on {}", topic)
}

#[async_trait]
impl TopicResearcher for CountingResearcher {
    async fn research(&self, topic: &str, _budget: &RunBudget) -> Result<WorkerOutput> {
        self.topics.lock().unwrap().push(topic.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_on.as_deref() == Some(topic) {
            return Err(AppError::LLM(format!("researcher crashed on {}", topic)));
        }
        Ok(WorkerOutput::from_findings(findings_for(topic)))
    }
}

/// Search provider returning one canned result per query, or nothing.
pub struct ScriptedSearch {
    pub queries: Mutex<Vec<String>>,
    empty: bool,
}

impl ScriptedSearch {
    pub fn new() -> Self {
        Self {
            queries: Mutex::new(Vec::new()),
            empty: false,
        }
    }

    /// Behave like a provider whose upstream always fails
    pub fn failing() -> Self {
        Self {
            queries: Mutex::new(Vec::new()),
            empty: true,
        }
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, query: &str, _max_results: usize) -> SearchResponse {
        self.queries.lock().unwrap().push(query.to_string());
        if self.empty {
            return SearchResponse::empty(query, 1);
        }
        SearchResponse {
            query: query.to_string(),
            results: vec![SearchResult {
                title: format!("About {}", query),
                url: "https://example.com/article".to_string(),
                snippet: format!("A snippet about {}", query),
                content: None,
                score: Some(0.9),
                published_date: None,
            }],
            total_results: 1,
            search_time_ms: 1,
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============= Tool call helpers =============

pub fn delegate(topic: &str) -> ToolCall {
    ToolCall::new("delegate_research", json!({ "research_topic": topic }))
}

pub fn complete(summary: &str) -> ToolCall {
    ToolCall::new("signal_complete", json!({ "summary": summary }))
}

pub fn reflect(text: &str) -> ToolCall {
    ToolCall::new("reflection", json!({ "reflection": text }))
}

pub fn search(query: &str) -> ToolCall {
    ToolCall::new("web_search", json!({ "query": query }))
}
