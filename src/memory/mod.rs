//! Transcript windowing and formatting for prompts.
//!
//! This module provides utilities for:
//! - Bounding what a worker sends to its decision call ([`sliding_window`])
//! - Rendering conversations and findings as prompt text

/// Sliding message window.
pub mod context_manager;

pub use context_manager::{recent_after_first, sliding_window};

use crate::types::{Message, MessageRole};

/// Default number of recent messages a worker keeps in view.
pub const DEFAULT_MESSAGE_WINDOW: usize = 8;

/// Separator placed between findings handed to the final report.
pub const FINDINGS_SEPARATOR: &str = "\n\n---\n\n";

/// Formats a conversation as `role: content` blocks for inclusion in a prompt.
///
/// System messages are skipped; they are instructions, not conversation.
pub fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .map(|m| format!("{}: {}", m.role, m.content.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Joins findings with [`FINDINGS_SEPARATOR`].
pub fn join_findings(notes: &[String]) -> String {
    notes.join(FINDINGS_SEPARATOR)
}
