//! # A.R.E.S Research
//!
//! Multi-stage research orchestration built on the A.R.E.S LLM stack. A run
//! optionally asks the user one clarifying question, writes a research brief,
//! lets a supervisor delegate topics to concurrent researchers with web search,
//! and synthesizes a markdown report.
//!
//! ## Overview
//!
//! The crate can be used in two ways:
//!
//! 1. **As a command line tool** - Run the `ares-research` binary
//! 2. **As a library** - Embed the [`WorkflowEngine`] in your own program
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use ares_research::{ResearchConfig, WorkflowEngine};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ResearchConfig::load("research.toml")?;
//!     let engine = WorkflowEngine::from_config(&config)?;
//!
//!     let output = engine.run_query("What limits sodium-ion battery adoption?").await?;
//!     println!("{}", output.text());
//!     Ok(())
//! }
//! ```
//!
//! ### Custom collaborators
//!
//! Every external call sits behind a trait: [`LLMClient`] for decisions,
//! [`search::SearchProvider`] for web search and
//! [`research::TopicResearcher`] for delegated topics. Use
//! [`WorkflowEngine::new`] to plug in your own implementations.
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `openai` | OpenAI API and compatible endpoints (default) |
//! | `duckduckgo` | DuckDuckGo search via daedra (default) |
//!
//! ## Modules
//!
//! - [`research`] - State scopes, routing interpreter and the research stages
//! - [`workflows`] - The end-to-end workflow engine
//! - [`llm`] - LLM client implementations and the provider registry
//! - [`search`] - Web search providers
//! - [`tools`] - Tool definitions, registry and the action catalogue
//! - [`memory`] - Message windows and transcript formatting
//! - [`utils`] - TOML configuration
//! - [`types`] - Messages, tool calls and error handling

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Command line parsing and terminal output.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Message windows and transcript formatting.
pub mod memory;
/// Research stages and their state machines.
pub mod research;
/// Web search providers.
pub mod search;
/// Worker tools and the action catalogue.
pub mod tools;
/// Core types (messages, tool calls, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;
/// Workflow engine for end-to-end research runs.
pub mod workflows;

// Re-export commonly used types
pub use llm::{LLMClient, LLMResponse, Provider, ProviderRegistry};
pub use tools::registry::ToolRegistry;
pub use types::{AppError, Message, Result};
pub use utils::toml_config::{ConfigManager, Preset, ResearchConfig};
pub use workflows::{Outcome, WorkflowEngine, WorkflowOutput};
