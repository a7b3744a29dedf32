//! Final report stage
//!
//! One synthesis call over the brief, the conversation and the findings.
//! Failures that look like the input was too large shrink the findings to 90%
//! and retry, up to [`MAX_REPORT_ATTEMPTS`] calls. Any other failure, or
//! running out of attempts, produces a deterministic fallback report and
//! records the error. This stage never fails.

use crate::llm::LLMClient;
use crate::memory::{format_transcript, join_findings};
use crate::research::budget::RunBudget;
use crate::research::prompts;
use crate::research::routing::RoutingDecision;
use crate::research::state::{TopPatch, TopStage, TopState};
use crate::types::{AppError, Message};
use std::sync::Arc;
use tracing::{info, warn};

pub const MAX_REPORT_ATTEMPTS: usize = 3;

/// Error text fragments that mean the request was too large
const SIZE_KEYWORDS: [&str; 4] = ["token", "context", "too large", "too long"];

pub fn is_size_error(err: &AppError) -> bool {
    let message = err.to_string().to_lowercase();
    SIZE_KEYWORDS.iter().any(|k| message.contains(k))
}

/// Keep the first 90% of `text`, counted in characters
pub fn shrink(text: &str) -> String {
    let keep = text.chars().count() * 9 / 10;
    text.chars().take(keep).collect()
}

pub fn fallback_report(
    error: &str,
    brief: &str,
    notes: &[String],
    raw_notes: &[String],
) -> String {
    format!(
        "# Research Report\n\n\
         ## Error\n\n\
         Failed to generate comprehensive report: {error}\n\n\
         ## Research Brief\n\n\
         {brief}\n\n\
         ## Research Findings\n\n\
         {findings}\n\n\
         ## Raw Notes\n\n\
         {raw}\n\n\
         *Note: This is a fallback report generated because report synthesis failed. \
         The findings above are unedited.*",
        findings = join_findings(notes),
        raw = raw_notes.join("\n\n"),
    )
}

pub struct ReportStage {
    client: Arc<dyn LLMClient>,
}

impl ReportStage {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }

    pub async fn run(
        &self,
        state: &TopState,
        budget: &RunBudget,
    ) -> RoutingDecision<TopStage, TopPatch> {
        let brief = state.research_brief.clone().unwrap_or_default();
        let conversation = format_transcript(&state.conversation);
        let date = prompts::today();
        let mut findings = join_findings(&state.notes);

        let mut attempt = 0;
        let error = loop {
            attempt += 1;
            let prompt = prompts::final_report(&brief, &conversation, &findings, &date);
            let result = budget
                .guard("final report", self.client.generate(&prompt))
                .await;

            match result {
                Ok(report) if !report.trim().is_empty() => {
                    info!(attempt, chars = report.len(), "Final report written");
                    return RoutingDecision::terminate(TopPatch {
                        conversation: vec![Message::assistant(report.clone())],
                        final_report: Some(report),
                        ..Default::default()
                    });
                }
                Ok(_) => break AppError::LLM("Report generation returned no content".into()),
                Err(e) if is_size_error(&e) && attempt < MAX_REPORT_ATTEMPTS => {
                    let before = findings.chars().count();
                    findings = shrink(&findings);
                    warn!(
                        attempt,
                        before,
                        after = findings.chars().count(),
                        error = %e,
                        "Report input too large, truncating findings and retrying"
                    );
                }
                Err(e) => break e,
            }
        };

        warn!(error = %error, attempts = attempt, "Final report failed, writing fallback report");
        let report = fallback_report(&error.to_string(), &brief, &state.notes, &state.raw_notes);
        RoutingDecision::terminate(TopPatch {
            conversation: vec![Message::assistant(report.clone())],
            final_report: Some(report),
            error: Some(format!("Report generation failed: {}", error)),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("This model's maximum context length is 8192 tokens", true)]
    #[case("Request too large for gpt-4o", true)]
    #[case("prompt is too long", true)]
    #[case("Context window exceeded", true)]
    #[case("connection refused", false)]
    #[case("503 Service Unavailable", false)]
    fn test_size_classification(#[case] message: &str, #[case] expected: bool) {
        assert_eq!(is_size_error(&AppError::LLM(message.to_string())), expected);
    }

    #[test]
    fn test_deadline_is_not_a_size_error() {
        assert!(!is_size_error(&AppError::Timeout(
            "final report did not finish before the run deadline".into()
        )));
    }

    #[test]
    fn test_shrink_keeps_ninety_percent_of_chars() {
        assert_eq!(shrink(&"a".repeat(100)).len(), 90);
        assert_eq!(shrink("héllo wörld").chars().count(), 9);
        assert_eq!(shrink(""), "");
    }

    #[test]
    fn test_fallback_embeds_everything_verbatim() {
        let notes = vec!["note one".to_string(), "note two".to_string()];
        let raw = vec!["raw one".to_string()];
        let report = fallback_report("LLM error: boom", "Original *brief*", &notes, &raw);

        assert!(report.starts_with("# Research Report"));
        assert!(report.contains("Failed to generate comprehensive report: LLM error: boom"));
        assert!(report.contains("Original *brief*"));
        assert!(report.contains("note one\n\n---\n\nnote two"));
        assert!(report.contains("raw one"));
    }
}
