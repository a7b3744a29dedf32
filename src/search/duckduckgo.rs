//! DuckDuckGo search powered by daedra

use super::{SearchProvider, SearchResponse, SearchResult};
use async_trait::async_trait;
use std::time::Instant;

/// Keyless web search; useful when no Tavily key is available
#[derive(Default)]
pub struct DuckDuckGoSearch;

impl DuckDuckGoSearch {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> SearchResponse {
        let started = Instant::now();
        let search_args = daedra::SearchArgs {
            query: query.to_string(),
            options: Some(daedra::SearchOptions {
                num_results: max_results,
                ..Default::default()
            }),
        };

        match daedra::tools::search::perform_search(&search_args).await {
            Ok(response) => {
                let results: Vec<SearchResult> = response
                    .data
                    .iter()
                    .take(max_results)
                    .map(|r| SearchResult {
                        title: r.title.to_string(),
                        url: r.url.to_string(),
                        snippet: r.description.to_string(),
                        content: None,
                        score: None,
                        published_date: None,
                    })
                    .collect();

                SearchResponse {
                    query: query.to_string(),
                    total_results: results.len(),
                    results,
                    search_time_ms: started.elapsed().as_millis() as u64,
                }
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "DuckDuckGo search failed, returning no results");
                SearchResponse::empty(query, started.elapsed().as_millis() as u64)
            }
        }
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}
