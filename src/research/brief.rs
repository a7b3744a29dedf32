//! Briefing stage: turn the conversation into a research brief
//!
//! Fail-fatal: without a brief there is nothing to research, so any failure
//! here aborts the run.

use crate::llm::{generate_typed, LLMClient};
use crate::research::budget::RunBudget;
use crate::research::prompts;
use crate::research::routing::RoutingDecision;
use crate::research::state::{TopPatch, TopStage, TopState};
use crate::types::{AppError, Message, Result};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ResearchBrief {
    /// The research question with every stated requirement and constraint
    pub research_brief: String,
}

pub struct BriefingStage {
    client: Arc<dyn LLMClient>,
}

impl BriefingStage {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }

    /// Produce the brief and seed the supervisor transcript with
    /// `[supervisor_instructions, brief]` at iteration zero.
    pub async fn run(
        &self,
        state: &TopState,
        supervisor_instructions: Message,
        budget: &RunBudget,
    ) -> Result<RoutingDecision<TopStage, TopPatch>> {
        let mut messages = vec![Message::system(prompts::research_brief(&prompts::today()))];
        messages.extend(state.conversation.iter().cloned());

        let brief = budget
            .guard(
                "research brief",
                generate_typed::<ResearchBrief>(self.client.as_ref(), &messages),
            )
            .await?
            .research_brief;

        let brief = brief.trim().to_string();
        if brief.is_empty() {
            return Err(AppError::LLM("Research brief came back empty".into()));
        }
        info!(chars = brief.len(), "Research brief written");

        Ok(RoutingDecision::goto(
            TopStage::Research,
            TopPatch {
                loop_messages: vec![supervisor_instructions, Message::user(brief.clone())],
                research_brief: Some(brief),
                iteration_count: Some(0),
                ..Default::default()
            },
        ))
    }
}
