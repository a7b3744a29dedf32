//! Deterministic offline search results

use super::{SearchProvider, SearchResponse, SearchResult};
use async_trait::async_trait;

const MAX_MOCK_RESULTS: usize = 3;

/// Returns up to three synthetic results with descending scores
pub struct MockSearch;

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, query: &str, max_results: usize) -> SearchResponse {
        let count = max_results.min(MAX_MOCK_RESULTS);
        let results: Vec<SearchResult> = (0..count)
            .map(|i| SearchResult {
                title: format!("Mock result {} for: {}", i + 1, query),
                url: format!("https://example.com/mock-result-{}", i + 1),
                snippet: format!(
                    "Synthetic snippet {} describing \"{}\" for offline runs.",
                    i + 1,
                    query
                ),
                content: None,
                score: Some(0.9 - i as f64 * 0.1),
                published_date: None,
            })
            .collect();

        SearchResponse {
            query: query.to_string(),
            total_results: results.len(),
            results,
            search_time_ms: 0,
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
