//! Action catalogue shared by decision responses and tool executors
//!
//! The coordinator may `reflect`, `delegate` or `complete`; workers may
//! `search` or `reflect`. Each action is a named tool call on the wire.

use crate::types::{AppError, Result, ToolCall, ToolDefinition};
use serde_json::json;

pub const DELEGATE_RESEARCH: &str = "delegate_research";
pub const SIGNAL_COMPLETE: &str = "signal_complete";
pub const REFLECTION: &str = "reflection";
pub const WEB_SEARCH: &str = "web_search";

/// A decoded action invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Reflect(String),
    Delegate(String),
    Complete(String),
    Search(String),
}

impl Action {
    /// Decode a tool call; unknown names and missing arguments are errors
    /// for that call only.
    pub fn from_call(call: &ToolCall) -> Result<Action> {
        let required = |key: &str| {
            call.str_arg(key)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    AppError::InvalidInput(format!("'{}' requires a '{}' argument", call.name, key))
                })
        };

        match call.name.as_str() {
            REFLECTION => required("reflection").map(Action::Reflect),
            DELEGATE_RESEARCH => required("research_topic").map(Action::Delegate),
            // A completion signal ends the loop even without a summary
            SIGNAL_COMPLETE => Ok(Action::Complete(
                call.str_arg("summary").unwrap_or_default().to_string(),
            )),
            WEB_SEARCH => required("query").map(Action::Search),
            other => Err(AppError::InvalidInput(format!("Unknown action '{}'", other))),
        }
    }
}

/// Tool definitions offered to the coordinator
pub fn coordinator_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: DELEGATE_RESEARCH.to_string(),
            description: "Delegate one focused research topic to a dedicated researcher. \
                          Call several times in one turn to research topics in parallel."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "research_topic": {
                        "type": "string",
                        "description": "A self-contained description of what to research"
                    }
                },
                "required": ["research_topic"]
            }),
        },
        ToolDefinition {
            name: SIGNAL_COMPLETE.to_string(),
            description: "Signal that research is sufficient to write the final report".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "summary": {
                        "type": "string",
                        "description": "Brief summary of what was covered"
                    }
                },
                "required": ["summary"]
            }),
        },
        ToolDefinition {
            name: REFLECTION.to_string(),
            description: "Reflect on findings so far and plan the next step".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "reflection": {
                        "type": "string",
                        "description": "Assessment of progress and gaps"
                    }
                },
                "required": ["reflection"]
            }),
        },
    ]
}
