//! Web search providers
//!
//! Workers gather evidence through a [`SearchProvider`]. Providers never fail:
//! an upstream error yields an empty [`SearchResponse`] so a flaky backend
//! degrades a worker's findings instead of aborting it.
//!
//! - [`tavily::TavilySearch`] - Tavily search API
//! - [`duckduckgo::DuckDuckGoSearch`] - DuckDuckGo via daedra (`duckduckgo` feature)
//! - [`mock::MockSearch`] - deterministic offline results

#[cfg(feature = "duckduckgo")]
pub mod duckduckgo;
pub mod mock;
pub mod tavily;

use crate::types::{AppError, Result};
use crate::utils::toml_config::{SearchBackend, SearchConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    /// Results in provider rank order
    pub results: Vec<SearchResult>,
    pub total_results: usize,
    pub search_time_ms: u64,
}

impl SearchResponse {
    pub fn empty(query: &str, search_time_ms: u64) -> Self {
        Self {
            query: query.to_string(),
            results: Vec::new(),
            total_results: 0,
            search_time_ms,
        }
    }

    /// Render results as the text a worker reads back
    pub fn to_tool_output(&self) -> String {
        if self.results.is_empty() {
            return format!("No results found for \"{}\".", self.query);
        }

        let mut out = format!(
            "Search results for \"{}\" ({} of {}):\n",
            self.query,
            self.results.len(),
            self.total_results
        );
        for (i, result) in self.results.iter().enumerate() {
            out.push_str(&format!(
                "\n{}. {}\n   URL: {}\n   {}\n",
                i + 1,
                result.title,
                result.url,
                result.snippet
            ));
            if let Some(content) = result.content.as_deref() {
                out.push_str(&format!("   Content: {}\n", excerpt(content, CONTENT_EXCERPT_CHARS)));
            }
        }
        out
    }
}

const CONTENT_EXCERPT_CHARS: usize = 1_500;

fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(max_chars).collect();
    format!("{}...", head)
}

/// Search backend used by workers
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run a query; upstream failures produce an empty response
    async fn search(&self, query: &str, max_results: usize) -> SearchResponse;

    fn name(&self) -> &str;
}

/// Build the provider named in the `[search]` section
pub fn create_provider(config: &SearchConfig) -> Result<Arc<dyn SearchProvider>> {
    match config.provider {
        SearchBackend::Tavily => {
            let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                AppError::Configuration(format!(
                    "Environment variable '{}' is not set",
                    config.api_key_env
                ))
            })?;
            Ok(Arc::new(tavily::TavilySearch::new(
                api_key,
                config.api_base.clone(),
            )))
        }
        #[cfg(feature = "duckduckgo")]
        SearchBackend::DuckDuckGo => Ok(Arc::new(duckduckgo::DuckDuckGoSearch::new())),
        #[cfg(not(feature = "duckduckgo"))]
        SearchBackend::DuckDuckGo => Err(AppError::Configuration(
            "DuckDuckGo search requires the 'duckduckgo' feature".to_string(),
        )),
        SearchBackend::Mock => Ok(Arc::new(mock::MockSearch)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_response_output() {
        let response = SearchResponse::empty("quantum error correction", 12);
        assert_eq!(
            response.to_tool_output(),
            "No results found for \"quantum error correction\"."
        );
    }

    #[test]
    fn test_tool_output_numbers_results() {
        let response = SearchResponse {
            query: "rust".into(),
            results: vec![
                SearchResult {
                    title: "The Rust Book".into(),
                    url: "https://doc.rust-lang.org/book".into(),
                    snippet: "Learn Rust".into(),
                    content: Some("x".repeat(2_000)),
                    score: Some(0.9),
                    published_date: None,
                },
                SearchResult {
                    title: "Rustonomicon".into(),
                    url: "https://doc.rust-lang.org/nomicon".into(),
                    snippet: "Unsafe Rust".into(),
                    content: None,
                    score: None,
                    published_date: None,
                },
            ],
            total_results: 2,
            search_time_ms: 5,
        };
        let output = response.to_tool_output();
        assert!(output.contains("1. The Rust Book"));
        assert!(output.contains("2. Rustonomicon"));
        assert!(output.contains(&format!("{}...", "x".repeat(CONTENT_EXCERPT_CHARS))));
    }

    #[test]
    fn test_mock_provider_from_config() {
        let config = SearchConfig {
            provider: SearchBackend::Mock,
            ..SearchConfig::default()
        };
        assert_eq!(create_provider(&config).unwrap().name(), "mock");
    }

    #[test]
    fn test_tavily_requires_key() {
        let config = SearchConfig {
            api_key_env: "ARES_RESEARCH_TEST_UNSET_KEY".into(),
            ..SearchConfig::default()
        };
        assert!(matches!(
            create_provider(&config),
            Err(AppError::Configuration(_))
        ));
    }
}
