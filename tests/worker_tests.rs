//! Worker loop tests against a scripted agent and search provider

mod common;

use ares_research::research::{RunBudget, WorkerLoop, WorkerSettings};
use ares_research::tools::registry::ToolRegistry;
use ares_research::types::ToolCall;
use common::mocks::{reflect, search, ScriptedLLM, ScriptedSearch};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn worker(
    agent: &Arc<ScriptedLLM>,
    compression: &Arc<ScriptedLLM>,
    search: &Arc<ScriptedSearch>,
    max_tool_calls: u32,
) -> WorkerLoop {
    WorkerLoop::new(
        agent.clone(),
        compression.clone(),
        Arc::new(ToolRegistry::for_worker(search.clone(), 3)),
        WorkerSettings {
            max_tool_calls,
            message_window: 8,
        },
    )
}

fn budget() -> RunBudget {
    RunBudget::new(Duration::from_secs(30), 1_000)
}

#[tokio::test]
async fn test_worker_searches_then_compresses() {
    let agent = Arc::new(
        ScriptedLLM::new()
            .with_tool_turn(vec![search("heat pump COP at -20C"), reflect("need field data")])
            .with_tool_turn(vec![search("cold climate heat pump field study")]),
    );
    let compression = Arc::new(ScriptedLLM::new().with_text("Heat pumps keep COP above 1.5."));
    let provider = Arc::new(ScriptedSearch::new());

    let output = worker(&agent, &compression, &provider, 10)
        .run("heat pump efficiency", &budget())
        .await
        .unwrap();

    assert_eq!(output.compressed_findings, "Heat pumps keep COP above 1.5.");
    assert_eq!(output.raw_notes, vec!["Heat pumps keep COP above 1.5."]);
    assert_eq!(
        *provider.queries.lock().unwrap(),
        vec!["heat pump COP at -20C", "cold climate heat pump field study"]
    );
    // Two tool turns, then a reply without calls
    assert_eq!(agent.tool_call_count(), 3);
    assert_eq!(compression.text_call_count(), 1);
}

#[tokio::test]
async fn test_failing_action_does_not_abort_siblings() {
    let agent = Arc::new(ScriptedLLM::new().with_tool_turn(vec![
        ToolCall::new("web_search", json!({})),
        ToolCall::new("fetch_url", json!({"url": "https://example.com"})),
        search("still runs"),
    ]));
    let compression = Arc::new(ScriptedLLM::new().with_text("summary"));
    let provider = Arc::new(ScriptedSearch::new());

    let output = worker(&agent, &compression, &provider, 10)
        .run("topic", &budget())
        .await
        .unwrap();

    assert_eq!(*provider.queries.lock().unwrap(), vec!["still runs"]);
    assert_eq!(output.compressed_findings, "summary");
}

#[tokio::test]
async fn test_worker_finishes_when_every_search_fails() {
    let agent = Arc::new(ScriptedLLM::new().repeating(vec![search("anything at all")]));
    let compression = Arc::new(ScriptedLLM::new().with_text("nothing found"));
    let provider = Arc::new(ScriptedSearch::failing());

    let output = worker(&agent, &compression, &provider, 6)
        .run("obscure topic", &budget())
        .await
        .unwrap();

    assert_eq!(agent.tool_call_count(), 6);
    assert_eq!(provider.queries.lock().unwrap().len(), 6);
    assert_eq!(output.compressed_findings, "nothing found");
}

#[tokio::test]
async fn test_compression_failure_returns_topic_placeholder() {
    let agent = Arc::new(ScriptedLLM::new().with_tool_turn(vec![search("q")]));
    let compression = Arc::new(ScriptedLLM::new().with_text_failure("context length exceeded"));
    let provider = Arc::new(ScriptedSearch::new());

    let output = worker(&agent, &compression, &provider, 5)
        .run("perovskite stability", &budget())
        .await
        .unwrap();

    assert!(!output.compressed_findings.is_empty());
    assert!(output.compressed_findings.contains("perovskite stability"));
}

#[tokio::test]
async fn test_agent_failure_is_fatal_to_worker() {
    let agent = Arc::new(ScriptedLLM::new().with_tool_failure("invalid api key"));
    let compression = Arc::new(ScriptedLLM::new());
    let provider = Arc::new(ScriptedSearch::new());

    let result = worker(&agent, &compression, &provider, 5)
        .run("topic", &budget())
        .await;

    assert!(result.is_err());
    assert_eq!(compression.text_call_count(), 0);
}

#[tokio::test]
async fn test_compression_sees_instructions_and_last_two_messages() {
    let agent = Arc::new(
        ScriptedLLM::new()
            .with_tool_turn(vec![search("first")])
            .with_tool_turn(vec![search("second")]),
    );
    let compression = Arc::new(ScriptedLLM::new().with_text("done"));
    let provider = Arc::new(ScriptedSearch::new());

    worker(&agent, &compression, &provider, 10)
        .run("wave energy", &budget())
        .await
        .unwrap();

    // The synthesis directive is the final message and names the topic
    let prompts = compression.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("wave energy"));
}
