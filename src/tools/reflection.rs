//! Reflection tool: records a strategic note without side effects

use crate::tools::actions::REFLECTION;
use crate::tools::registry::Tool;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct ReflectionTool;

/// Acknowledgement text stored for a reflection
pub fn acknowledge(reflection: &str) -> String {
    format!("Reflection recorded: {}", reflection)
}

#[async_trait]
impl Tool for ReflectionTool {
    fn name(&self) -> &str {
        REFLECTION
    }

    fn description(&self) -> &str {
        "Record a reflection on progress, gaps and the next step before acting"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "reflection": {
                    "type": "string",
                    "description": "What was learned, what is missing, what to do next"
                }
            },
            "required": ["reflection"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let reflection = args
            .get("reflection")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::InvalidInput("Missing 'reflection' parameter".to_string()))?;
        Ok(Value::String(acknowledge(reflection)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reflection_acknowledged() {
        let out = ReflectionTool
            .execute(json!({"reflection": "need primary sources"}))
            .await
            .unwrap();
        assert_eq!(out, json!("Reflection recorded: need primary sources"));
    }
}
