//! Workflow Engine Module
//!
//! The [`WorkflowEngine`] is the entry point of the library: give it a
//! conversation and it returns either a clarifying question or a report.
//!
//! # Usage
//!
//! ```ignore
//! let config = ResearchConfig::load("research.toml")?;
//! let engine = WorkflowEngine::from_config(&config)?;
//! let output = engine.run_query("How do heat pumps perform below -20C?").await?;
//! println!("{}", output.text());
//! ```

pub mod engine;

pub use engine::{Outcome, WorkflowEngine, WorkflowOutput};
