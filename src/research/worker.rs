//! Worker loop: research one delegated topic
//!
//! ```text
//! Agent ──▶ Tools ──▶ Agent ...
//!   │         │
//!   └────────-┴──▶ Compression ──▶ done
//! ```
//!
//! The only terminal stage is Compression, so every worker returns a
//! [`WorkerOutput`]. Agent passes are capped by `max_tool_calls`; the agent's
//! context is capped by a sliding window over its transcript.

use crate::llm::LLMClient;
use crate::memory::{recent_after_first, sliding_window};
use crate::research::budget::RunBudget;
use crate::research::prompts;
use crate::research::routing::{drive, RoutingDecision, StageMachine};
use crate::research::state::{placeholder_findings, WorkerOutput, WorkerPatch, WorkerState};
use crate::research::supervisor::TopicResearcher;
use crate::tools::actions::Action;
use crate::tools::registry::{output_text, ToolRegistry};
use crate::types::{AppError, Message, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStage {
    Agent,
    Tools,
    Compression,
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub max_tool_calls: u32,
    pub message_window: usize,
}

/// Runs one worker per topic; cheap to share across concurrent dispatches
pub struct WorkerLoop {
    decision: Arc<dyn LLMClient>,
    compression: Arc<dyn LLMClient>,
    tools: Arc<ToolRegistry>,
    settings: WorkerSettings,
}

impl WorkerLoop {
    pub fn new(
        decision: Arc<dyn LLMClient>,
        compression: Arc<dyn LLMClient>,
        tools: Arc<ToolRegistry>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            decision,
            compression,
            tools,
            settings,
        }
    }

    /// Research `topic` to completion.
    ///
    /// A failing decision call is an error. Running out of run budget is not:
    /// the worker returns its placeholder findings instead.
    pub async fn run(&self, topic: &str, budget: &RunBudget) -> Result<WorkerOutput> {
        let instructions =
            prompts::researcher(&prompts::today(), self.settings.max_tool_calls);
        let mut state = WorkerState::new(topic, Message::system(instructions));
        let machine = WorkerRun {
            worker: self,
            budget,
        };

        info!(topic, "Worker started");
        match drive(&machine, WorkerStage::Agent, &mut state).await {
            Ok(()) => {}
            Err(e) if e.is_budget_exhausted() => {
                warn!(topic, error = %e, "Worker out of budget, returning placeholder findings");
                return Ok(WorkerOutput::placeholder(topic));
            }
            Err(e) => return Err(e),
        }

        info!(
            topic,
            agent_passes = state.tool_iteration_count,
            tool_outputs = state.raw_notes.len(),
            "Worker finished"
        );
        Ok(state.into_output())
    }
}

#[async_trait]
impl TopicResearcher for WorkerLoop {
    async fn research(&self, topic: &str, budget: &RunBudget) -> Result<WorkerOutput> {
        self.run(topic, budget).await
    }
}

struct WorkerRun<'a> {
    worker: &'a WorkerLoop,
    budget: &'a RunBudget,
}

type Decision = RoutingDecision<WorkerStage, WorkerPatch>;

impl WorkerRun<'_> {
    async fn agent(&self, state: &WorkerState) -> Result<Decision> {
        let window = sliding_window(&state.worker_messages, self.worker.settings.message_window);
        let tools = self.worker.tools.get_tool_definitions();

        let response = self
            .budget
            .guard(
                "researcher decision",
                self.worker.decision.generate_with_tools(&window, &tools),
            )
            .await;

        match response {
            Ok(response) => Ok(RoutingDecision::goto(
                WorkerStage::Tools,
                WorkerPatch {
                    worker_messages: vec![response.into_message()],
                    advance_iteration: true,
                    ..Default::default()
                },
            )),
            Err(e) if e.is_budget_exhausted() => {
                warn!(topic = %state.topic, error = %e, "Researcher decision abandoned");
                Ok(RoutingDecision::goto_unchanged(WorkerStage::Compression))
            }
            Err(e) => Err(e),
        }
    }

    async fn tools(&self, state: &WorkerState) -> Result<Decision> {
        let calls = match state.worker_messages.last() {
            Some(last) if last.has_tool_calls() => &last.tool_calls,
            _ => return Ok(RoutingDecision::goto_unchanged(WorkerStage::Compression)),
        };

        let mut patch = WorkerPatch::default();
        for call in calls {
            let outcome = match Action::from_call(call) {
                Ok(Action::Search(_)) | Ok(Action::Reflect(_)) => {
                    self.budget
                        .guard(
                            "researcher tool",
                            self.worker.tools.execute(&call.name, call.arguments.clone()),
                        )
                        .await
                }
                Ok(other) => Err(AppError::InvalidInput(format!(
                    "Action {:?} is not available to researchers",
                    other
                ))),
                Err(e) => Err(e),
            };

            let content = match outcome {
                Ok(value) => {
                    let text = output_text(value);
                    patch.raw_notes.push(text.clone());
                    text
                }
                Err(e) => {
                    debug!(tool = %call.name, error = %e, "Tool call failed");
                    format!("Error: {}", e)
                }
            };
            patch
                .worker_messages
                .push(Message::tool_result(&call.id, &call.name, content));
        }

        let next = if state.tool_iteration_count >= self.worker.settings.max_tool_calls {
            debug!(topic = %state.topic, "Tool call budget reached, compressing");
            WorkerStage::Compression
        } else {
            WorkerStage::Agent
        };
        Ok(RoutingDecision::goto(next, patch))
    }

    async fn compression(&self, state: &WorkerState) -> Result<Decision> {
        let mut transcript = Vec::with_capacity(4);
        transcript.extend(state.worker_messages.first().cloned());
        transcript.extend_from_slice(recent_after_first(&state.worker_messages, 2));
        transcript.push(Message::user(prompts::compression(
            &state.topic,
            &prompts::today(),
        )));

        let summary = self
            .budget
            .guard(
                "compression",
                self.worker.compression.generate_with_history(&transcript),
            )
            .await;

        let findings = match summary {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(topic = %state.topic, "Compression returned nothing, using placeholder");
                placeholder_findings(&state.topic)
            }
            Err(e) => {
                warn!(topic = %state.topic, error = %e, "Compression failed, using placeholder");
                placeholder_findings(&state.topic)
            }
        };

        Ok(RoutingDecision::terminate(WorkerPatch {
            compressed_findings: Some(findings),
            ..Default::default()
        }))
    }
}

#[async_trait]
impl<'a> StageMachine for WorkerRun<'a> {
    type Stage = WorkerStage;
    type State = WorkerState;
    type Patch = WorkerPatch;

    fn scope(&self) -> &str {
        "worker"
    }

    fn budget(&self) -> Option<&RunBudget> {
        Some(self.budget)
    }

    fn is_charged(&self, stage: WorkerStage) -> bool {
        stage == WorkerStage::Agent
    }

    async fn step(&self, stage: WorkerStage, state: &WorkerState) -> Result<Decision> {
        match stage {
            WorkerStage::Agent => self.agent(state).await,
            WorkerStage::Tools => self.tools(state).await,
            WorkerStage::Compression => self.compression(state).await,
        }
    }
}
