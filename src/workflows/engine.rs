//! Workflow Engine
//!
//! Runs one research request end to end: clarification, briefing, the
//! supervisor loop and the final report, driven by the same routing
//! interpreter the inner loops use.

use crate::llm::{LLMClient, ProviderRegistry};
use crate::research::brief::BriefingStage;
use crate::research::budget::RunBudget;
use crate::research::clarify::ClarificationStage;
use crate::research::report::ReportStage;
use crate::research::routing::{drive, RoutingDecision, StageMachine};
use crate::research::state::{TopPatch, TopStage, TopState};
use crate::research::supervisor::{SupervisorLoop, SupervisorSettings, TopicResearcher};
use crate::research::worker::{WorkerLoop, WorkerSettings};
use crate::search;
use crate::tools::registry::ToolRegistry;
use crate::types::{AppError, Message, Result};
use crate::utils::toml_config::{ResearchConfig, ResearchSettings};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// How a run ended
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The request was ambiguous; the question was appended to the conversation
    NeedsClarification { question: String },
    /// A report was written, possibly the fallback report
    Report { report: String },
}

/// Output from a workflow execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowOutput {
    pub outcome: Outcome,
    /// The input conversation plus the question or report
    pub conversation: Vec<Message>,
    pub research_brief: Option<String>,
    /// Compressed findings, one per completed delegate
    pub notes: Vec<String>,
    pub raw_notes: Vec<String>,
    /// Non-fatal failure recorded during the run
    pub error: Option<String>,
    pub supervisor_iterations: u32,
    pub duration_ms: u64,
}

impl WorkflowOutput {
    /// The question or the report, whichever the run produced
    pub fn text(&self) -> &str {
        match &self.outcome {
            Outcome::NeedsClarification { question } => question,
            Outcome::Report { report } => report,
        }
    }

    fn from_state(state: TopState, started: Instant) -> Result<Self> {
        let outcome = match (state.clarifying_question, state.final_report) {
            (Some(question), _) => Outcome::NeedsClarification { question },
            (None, Some(report)) => Outcome::Report { report },
            (None, None) => {
                return Err(AppError::Internal(
                    "workflow ended without a question or a report".into(),
                ))
            }
        };

        Ok(Self {
            outcome,
            conversation: state.conversation,
            research_brief: state.research_brief,
            notes: state.notes,
            raw_notes: state.raw_notes,
            error: state.error,
            supervisor_iterations: state.iteration_count,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Workflow engine that sequences the research stages
pub struct WorkflowEngine {
    clarify: ClarificationStage,
    brief: BriefingStage,
    supervisor: SupervisorLoop,
    report: ReportStage,
    timeout: Duration,
    step_limit: u32,
}

impl WorkflowEngine {
    /// Assemble an engine from its collaborators.
    ///
    /// `decision` serves clarification, briefing and coordination; `report`
    /// writes the final report; `researcher` handles each delegated topic.
    pub fn new(
        decision: Arc<dyn LLMClient>,
        report: Arc<dyn LLMClient>,
        researcher: Arc<dyn TopicResearcher>,
        settings: &ResearchSettings,
    ) -> Self {
        let supervisor = SupervisorLoop::new(
            Arc::clone(&decision),
            researcher,
            SupervisorSettings {
                max_delegates: settings.max_delegates,
                max_iterations: settings.max_supervisor_iterations,
            },
        );

        Self {
            clarify: ClarificationStage::new(Arc::clone(&decision), settings.allow_clarification),
            brief: BriefingStage::new(decision),
            supervisor,
            report: ReportStage::new(report),
            timeout: settings.timeout(),
            step_limit: settings.step_limit,
        }
    }

    /// Build the engine from configuration: model profiles become clients,
    /// the search section becomes the workers' search tool.
    pub fn from_config(config: &ResearchConfig) -> Result<Self> {
        let registry = ProviderRegistry::from_config(config);
        let settings = &config.research;

        let decision = registry.create_client_for_model(&settings.decision_model)?;
        let compression = registry.create_client_for_model(settings.compression_model())?;
        let report = registry.create_client_for_model(settings.report_model())?;

        let search = search::create_provider(&config.search)?;
        let tools = Arc::new(ToolRegistry::for_worker(search, config.search.max_results));
        let worker = WorkerLoop::new(
            Arc::clone(&decision),
            compression,
            tools,
            WorkerSettings {
                max_tool_calls: settings.max_tool_calls_per_worker,
                message_window: settings.worker_message_window,
            },
        );

        info!(
            decision = decision.model_name(),
            report = report.model_name(),
            search = ?config.search.provider,
            "Workflow engine ready"
        );
        Ok(Self::new(decision, report, Arc::new(worker), settings))
    }

    /// Execute a research request.
    ///
    /// Returns an error only when briefing or coordination fails. Every other
    /// failure is absorbed by its stage and may be recorded in
    /// [`WorkflowOutput::error`].
    pub async fn run(&self, conversation: Vec<Message>) -> Result<WorkflowOutput> {
        let started = Instant::now();
        let budget = RunBudget::new(self.timeout, self.step_limit);
        let mut state = TopState::new(conversation);
        let machine = Orchestration {
            engine: self,
            budget: &budget,
        };

        info!(
            messages = state.conversation.len(),
            timeout_ms = self.timeout.as_millis() as u64,
            "Research run started"
        );
        drive(&machine, TopStage::Clarify, &mut state).await?;

        if let Some(error) = &state.error {
            warn!(error = %error, "Research run finished with an error");
        }
        let output = WorkflowOutput::from_state(state, started)?;
        info!(
            steps = budget.steps_used(),
            iterations = output.supervisor_iterations,
            notes = output.notes.len(),
            duration_ms = output.duration_ms,
            "Research run finished"
        );
        Ok(output)
    }

    /// Convenience for a single user query
    pub async fn run_query(&self, query: &str) -> Result<WorkflowOutput> {
        self.run(vec![Message::user(query)]).await
    }
}

struct Orchestration<'a> {
    engine: &'a WorkflowEngine,
    budget: &'a RunBudget,
}

#[async_trait]
impl<'a> StageMachine for Orchestration<'a> {
    type Stage = TopStage;
    type State = TopState;
    type Patch = TopPatch;

    fn scope(&self) -> &str {
        "workflow"
    }

    async fn step(
        &self,
        stage: TopStage,
        state: &TopState,
    ) -> Result<RoutingDecision<TopStage, TopPatch>> {
        match stage {
            TopStage::Clarify => Ok(self.engine.clarify.run(state, self.budget).await),
            TopStage::Brief => {
                self.engine
                    .brief
                    .run(state, self.engine.supervisor.instructions(), self.budget)
                    .await
            }
            TopStage::Research => {
                let output = self.engine.supervisor.run(state, self.budget).await?;
                Ok(RoutingDecision::goto(
                    TopStage::FinalReport,
                    output.into_top_patch(),
                ))
            }
            TopStage::FinalReport => Ok(self.engine.report.run(state, self.budget).await),
        }
    }
}
