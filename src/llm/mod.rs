//! LLM Provider Clients and Abstractions
//!
//! This module provides the decision-call interface used by every research
//! stage. Provider-specific request and response formats are hidden behind
//! [`LLMClient`], so stages work with any supported backend.
//!
//! # Architecture
//!
//! - [`LLMClient`] - The core trait that all providers implement
//! - [`Provider`] - A resolved provider + model, able to build a client
//! - [`ProviderRegistry`] - Resolves `[models.*]` profiles from `research.toml`
//!
//! # Supported Providers
//!
//! Enable providers via Cargo features:
//! - `openai` - OpenAI API and compatible endpoints
//! - `ollama` - Local Ollama server
//!
//! # Example
//!
//! ```ignore
//! use ares_research::llm::ProviderRegistry;
//!
//! let registry = ProviderRegistry::from_config(&config);
//! let client = registry.create_client_for_model("decision")?;
//! let answer = client.generate("What is 2+2?").await?;
//! ```

/// Core LLM client trait, response type and structured decoding.
pub mod client;
/// Registry resolving model profiles to clients.
pub mod provider_registry;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{generate_typed, LLMClient, LLMResponse, ModelParams, Provider};
pub use provider_registry::ProviderRegistry;
