//! Tavily search API client

use super::{SearchProvider, SearchResponse, SearchResult};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;

pub struct TavilySearch {
    http_client: reqwest::Client,
    api_key: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    raw_content: Option<String>,
    score: Option<f64>,
    published_date: Option<String>,
}

impl TavilySearch {
    pub fn new(api_key: String, api_base: String) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key,
            api_base,
        }
    }

    async fn request(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let url = format!("{}/search", self.api_base.trim_end_matches('/'));
        let body = json!({
            "query": query,
            "search_depth": "advanced",
            "include_answer": false,
            "include_images": false,
            "include_raw_content": true,
            "max_results": max_results
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Search(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Search(format!(
                "Tavily request failed ({}): {}",
                status, text
            )));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| AppError::Search(format!("Failed to parse response: {}", e)))?;

        Ok(parsed
            .results
            .into_iter()
            .take(max_results)
            .map(|r| SearchResult {
                title: r.title,
                url: r.url,
                snippet: r.content,
                content: r.raw_content,
                score: r.score,
                published_date: r.published_date,
            })
            .collect())
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(&self, query: &str, max_results: usize) -> SearchResponse {
        let started = Instant::now();
        match self.request(query, max_results).await {
            Ok(results) => SearchResponse {
                query: query.to_string(),
                total_results: results.len(),
                results,
                search_time_ms: started.elapsed().as_millis() as u64,
            },
            Err(e) => {
                tracing::warn!(query, error = %e, "Tavily search failed, returning no results");
                SearchResponse::empty(query, started.elapsed().as_millis() as u64)
            }
        }
    }

    fn name(&self) -> &str {
        "tavily"
    }
}
