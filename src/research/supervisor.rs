//! Supervisor loop: coordinate delegated research
//!
//! ```text
//! Coordinator ──▶ Tools ──▶ Coordinator ...
//!                   │
//!                   └──▶ terminated
//! ```
//!
//! The Tools stage ends the loop when the iteration cap is exceeded, when the
//! coordinator requested nothing, or when it signalled completion, checked in
//! that order. Otherwise reflections are acknowledged and up to
//! `max_delegates` topics run concurrently behind a barrier; delegate requests
//! beyond the cap are dropped, not deferred. If any dispatched worker fails,
//! or the batch outlives the run deadline, the whole batch is discarded and
//! the loop ends with the notes folded so far.

use crate::llm::LLMClient;
use crate::research::budget::RunBudget;
use crate::research::prompts;
use crate::research::routing::{drive, RoutingDecision, StageMachine};
use crate::research::state::{
    LoopOutput, LoopPatch, LoopState, StatePatch, TopState, WorkerOutput,
};
use crate::tools::actions::{coordinator_tools, Action};
use crate::tools::reflection;
use crate::types::{AppError, Message, Result, ToolCall};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Time past the run deadline that researchers get to return their fallbacks
const DISPATCH_GRACE: Duration = Duration::from_secs(1);

/// Name on acknowledgements for delegate requests that were not dispatched
pub const DROPPED_DELEGATE: &str = "delegate_research_dropped";

/// Name on error results for calls that could not be decoded
pub const INVALID_ACTION: &str = "invalid_action";

/// Researches one topic on behalf of the supervisor
#[async_trait]
pub trait TopicResearcher: Send + Sync {
    async fn research(&self, topic: &str, budget: &RunBudget) -> Result<WorkerOutput>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorStage {
    Coordinator,
    Tools,
}

#[derive(Debug, Clone, Copy)]
pub struct SupervisorSettings {
    pub max_delegates: usize,
    pub max_iterations: u32,
}

pub struct SupervisorLoop {
    coordinator: Arc<dyn LLMClient>,
    researcher: Arc<dyn TopicResearcher>,
    settings: SupervisorSettings,
}

impl SupervisorLoop {
    pub fn new(
        coordinator: Arc<dyn LLMClient>,
        researcher: Arc<dyn TopicResearcher>,
        settings: SupervisorSettings,
    ) -> Self {
        Self {
            coordinator,
            researcher,
            settings,
        }
    }

    /// Instructions that open the supervisor transcript
    pub fn instructions(&self) -> Message {
        Message::system(prompts::supervisor(
            &prompts::today(),
            self.settings.max_delegates,
            self.settings.max_iterations,
        ))
    }

    /// Run the loop over the scope opened from `top`.
    ///
    /// A failing coordinator call aborts the loop with that error. Running
    /// out of run budget ends it early with the notes folded so far.
    pub async fn run(&self, top: &TopState, budget: &RunBudget) -> Result<LoopOutput> {
        let mut state = LoopState::from_top(top)?;
        let machine = SupervisorRun {
            supervisor: self,
            budget,
        };

        match drive(&machine, SupervisorStage::Coordinator, &mut state).await {
            Ok(()) => {}
            Err(e) if e.is_budget_exhausted() => {
                warn!(error = %e, "Supervisor out of budget, ending research early");
                state.closing_patch().apply_to(&mut state);
            }
            Err(e) => return Err(e),
        }

        info!(
            iterations = state.iteration_count,
            notes = state.notes.len(),
            "Research loop finished"
        );
        let mut output = state.into_output();
        output.cut_short = budget.exhaustion();
        Ok(output)
    }
}

struct SupervisorRun<'a> {
    supervisor: &'a SupervisorLoop,
    budget: &'a RunBudget,
}

type Decision = RoutingDecision<SupervisorStage, LoopPatch>;

/// How one coordinator tool call is answered
enum Planned {
    Ack(Message),
    Dispatch { call_id: String, slot: usize },
}

impl SupervisorRun<'_> {
    async fn coordinator(&self, state: &LoopState) -> Result<Decision> {
        let response = self
            .budget
            .guard(
                "coordinator decision",
                self.supervisor
                    .coordinator
                    .generate_with_tools(&state.loop_messages, &coordinator_tools()),
            )
            .await?;

        debug!(
            iteration = state.iteration_count + 1,
            actions = response.tool_calls.len(),
            "Coordinator responded"
        );

        Ok(RoutingDecision::goto(
            SupervisorStage::Tools,
            LoopPatch {
                loop_messages: vec![response.into_message()],
                advance_iteration: true,
                ..Default::default()
            },
        ))
    }

    async fn tools(&self, state: &LoopState) -> Result<Decision> {
        let settings = self.supervisor.settings;
        let calls: &[ToolCall] = state
            .loop_messages
            .last()
            .map(|m| m.tool_calls.as_slice())
            .unwrap_or_default();
        let actions: Vec<(&ToolCall, Result<Action>)> =
            calls.iter().map(|c| (c, Action::from_call(c))).collect();

        if state.iteration_count > settings.max_iterations {
            info!(iterations = state.iteration_count, "Iteration cap exceeded, ending research");
            return Ok(RoutingDecision::terminate(state.closing_patch()));
        }
        if actions.is_empty() {
            info!("Coordinator requested no actions, ending research");
            return Ok(RoutingDecision::terminate(state.closing_patch()));
        }
        if actions
            .iter()
            .any(|(_, a)| matches!(a, Ok(Action::Complete(_))))
        {
            info!("Coordinator signalled completion");
            return Ok(RoutingDecision::terminate(state.closing_patch()));
        }

        let mut plan = Vec::with_capacity(actions.len());
        let mut topics = Vec::new();
        for (call, action) in actions {
            match action {
                Ok(Action::Reflect(text)) => plan.push(Planned::Ack(Message::tool_result(
                    &call.id,
                    &call.name,
                    reflection::acknowledge(&text),
                ))),
                Ok(Action::Delegate(topic)) if topics.len() < settings.max_delegates => {
                    plan.push(Planned::Dispatch {
                        call_id: call.id.clone(),
                        slot: topics.len(),
                    });
                    topics.push(topic);
                }
                Ok(Action::Delegate(topic)) => {
                    debug!(topic = %topic, "Delegate beyond concurrency cap dropped");
                    plan.push(Planned::Ack(Message::tool_result(
                        &call.id,
                        DROPPED_DELEGATE,
                        format!(
                            "Not dispatched: at most {} topics run per turn. Delegate it again if it is still needed.",
                            settings.max_delegates
                        ),
                    )));
                }
                Ok(other) => plan.push(Planned::Ack(Message::tool_result(
                    &call.id,
                    INVALID_ACTION,
                    format!("Error: action {:?} is not available to the supervisor", other),
                ))),
                Err(e) => plan.push(Planned::Ack(Message::tool_result(
                    &call.id,
                    INVALID_ACTION,
                    format!("Error: {}", e),
                ))),
            }
        }

        let mut outputs = match self.dispatch(topics).await {
            Ok(outputs) => outputs,
            Err(e) => {
                warn!(error = %e, "Research dispatch failed, ending research with prior notes");
                return Ok(RoutingDecision::terminate(state.closing_patch()));
            }
        };

        let mut patch = LoopPatch::default();
        for planned in plan {
            match planned {
                Planned::Ack(message) => patch.loop_messages.push(message),
                Planned::Dispatch { call_id, slot } => {
                    let output = outputs[slot]
                        .take()
                        .ok_or_else(|| AppError::Internal("worker output folded twice".into()))?;
                    patch.fold_worker(&call_id, output);
                }
            }
        }

        Ok(RoutingDecision::goto(SupervisorStage::Coordinator, patch))
    }

    /// Run one worker per topic concurrently and wait for all of them.
    ///
    /// Outputs come back in topic order. The first failure aborts the rest.
    async fn dispatch(&self, topics: Vec<String>) -> Result<Vec<Option<WorkerOutput>>> {
        let mut outputs: Vec<Option<WorkerOutput>> = topics.iter().map(|_| None).collect();
        if topics.is_empty() {
            return Ok(outputs);
        }

        info!(workers = topics.len(), "Dispatching researchers");
        let mut set = JoinSet::new();
        for (slot, topic) in topics.into_iter().enumerate() {
            let researcher = Arc::clone(&self.supervisor.researcher);
            let budget = self.budget.clone();
            set.spawn(async move { (slot, researcher.research(&topic, &budget).await) });
        }

        // Bounded even for researchers that ignore the budget
        let joined = self
            .budget
            .guard_with_grace("research dispatch", DISPATCH_GRACE, async {
                while let Some(joined) = set.join_next().await {
                    match joined {
                        Ok((slot, Ok(output))) => outputs[slot] = Some(output),
                        Ok((slot, Err(e))) => {
                            return Err(AppError::Internal(format!(
                                "researcher {} failed: {}",
                                slot, e
                            )));
                        }
                        Err(join_err) => {
                            return Err(AppError::Internal(format!(
                                "researcher task failed: {}",
                                join_err
                            )));
                        }
                    }
                }
                Ok(())
            })
            .await;

        if joined.is_err() {
            set.abort_all();
        }
        joined.map(|()| outputs)
    }
}

#[async_trait]
impl<'a> StageMachine for SupervisorRun<'a> {
    type Stage = SupervisorStage;
    type State = LoopState;
    type Patch = LoopPatch;

    fn scope(&self) -> &str {
        "supervisor"
    }

    fn budget(&self) -> Option<&RunBudget> {
        Some(self.budget)
    }

    fn is_charged(&self, stage: SupervisorStage) -> bool {
        stage == SupervisorStage::Coordinator
    }

    async fn step(&self, stage: SupervisorStage, state: &LoopState) -> Result<Decision> {
        match stage {
            SupervisorStage::Coordinator => self.coordinator(state).await,
            SupervisorStage::Tools => self.tools(state).await,
        }
    }
}
