//! Clarification stage: optionally ask the user one question before research
//!
//! Fail-open: if the decision call fails the run proceeds to briefing.

use crate::llm::{generate_typed, LLMClient};
use crate::research::budget::RunBudget;
use crate::research::prompts;
use crate::research::routing::RoutingDecision;
use crate::research::state::{TopPatch, TopStage, TopState};
use crate::types::Message;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ClarificationDecision {
    /// Whether a question must be answered before research can start
    pub need_clarification: bool,
    /// The question to ask the user
    #[serde(default)]
    pub question: Option<String>,
    /// Confirmation of what will be researched
    #[serde(default)]
    pub verification: Option<String>,
}

pub struct ClarificationStage {
    client: Arc<dyn LLMClient>,
    enabled: bool,
}

impl ClarificationStage {
    pub fn new(client: Arc<dyn LLMClient>, enabled: bool) -> Self {
        Self { client, enabled }
    }

    pub async fn run(
        &self,
        state: &TopState,
        budget: &RunBudget,
    ) -> RoutingDecision<TopStage, TopPatch> {
        if !self.enabled {
            return RoutingDecision::goto_unchanged(TopStage::Brief);
        }

        let mut messages = vec![Message::system(prompts::clarification(&prompts::today()))];
        messages.extend(state.conversation.iter().cloned());

        let decision = budget
            .guard(
                "clarification",
                generate_typed::<ClarificationDecision>(self.client.as_ref(), &messages),
            )
            .await;

        let decision = match decision {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, "Clarification check failed, proceeding to briefing");
                return RoutingDecision::goto_unchanged(TopStage::Brief);
            }
        };

        let question = non_blank(decision.question);
        if decision.need_clarification {
            if let Some(question) = question {
                info!("Asking the user a clarifying question");
                return RoutingDecision::terminate(TopPatch {
                    conversation: vec![Message::assistant(question.clone())],
                    clarifying_question: Some(question),
                    ..Default::default()
                });
            }
            warn!("Clarification requested without a question, proceeding to briefing");
        }

        let conversation = non_blank(decision.verification)
            .map(Message::assistant)
            .into_iter()
            .collect();
        RoutingDecision::goto(
            TopStage::Brief,
            TopPatch {
                conversation,
                ..Default::default()
            },
        )
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}
