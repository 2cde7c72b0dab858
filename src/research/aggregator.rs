//! Multi-query search execution
//!
//! Runs a query list against one backend, removes already-collected sources,
//! optionally enriches candidates with fetched page content, then ranks the
//! pooled candidates and keeps the best unique URLs.

use crate::research::ranking::rank_results;
use crate::search::fetcher::word_count;
use crate::search::{ContentFetcher, ResultProvider};
use crate::types::{Result, SearchResult};
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Parameters of one `execute_search` call
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub queries: Vec<String>,
    pub max_filtered_results: usize,
    pub max_results_per_query: usize,
    pub fetch_full_content: bool,
    /// URLs of sources collected earlier; one entry per source
    pub exclude_urls: Vec<String>,
    pub site_restriction: Vec<String>,
}

impl SearchRequest {
    pub fn new(queries: Vec<String>) -> Self {
        Self {
            queries,
            max_filtered_results: 4,
            max_results_per_query: 8,
            fetch_full_content: false,
            exclude_urls: Vec::new(),
            site_restriction: Vec::new(),
        }
    }

    pub fn max_filtered_results(mut self, n: usize) -> Self {
        self.max_filtered_results = n;
        self
    }

    pub fn max_results_per_query(mut self, n: usize) -> Self {
        self.max_results_per_query = n;
        self
    }

    pub fn fetch_full_content(mut self, fetch: bool) -> Self {
        self.fetch_full_content = fetch;
        self
    }

    pub fn exclude<'a>(mut self, sources: impl IntoIterator<Item = &'a SearchResult>) -> Self {
        self.exclude_urls = sources.into_iter().map(|s| s.url.clone()).collect();
        self
    }

    pub fn site_restriction(mut self, sites: Vec<String>) -> Self {
        self.site_restriction = sites;
        self
    }

    /// Per-query request size, inflated so exclusions cannot starve the pool
    pub fn effective_results_per_query(&self) -> usize {
        if self.exclude_urls.is_empty() || self.queries.is_empty() {
            return self.max_results_per_query;
        }
        self.max_results_per_query + self.exclude_urls.len().div_ceil(self.queries.len())
    }
}

/// Search executor over one provider and one content fetcher
pub struct SearchAggregator {
    provider: Arc<dyn ResultProvider>,
    fetcher: Arc<dyn ContentFetcher>,
    fetch_concurrency: usize,
    min_content_words: usize,
}

impl SearchAggregator {
    pub fn new(provider: Arc<dyn ResultProvider>, fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self {
            provider,
            fetcher,
            fetch_concurrency: 10,
            min_content_words: 30,
        }
    }

    pub fn with_fetch_concurrency(mut self, concurrency: usize) -> Self {
        self.fetch_concurrency = concurrency.max(1);
        self
    }

    /// Fetched pages with this many words or fewer are discarded
    pub fn with_min_content_words(mut self, words: usize) -> Self {
        self.min_content_words = words;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run every query and return at most `max_filtered_results` results with
    /// distinct URLs, none of them excluded, in descending score order.
    ///
    /// A pool of one result or less is returned as is, without scores.
    ///
    /// # Errors
    ///
    /// Propagates the provider's error when the backend is unavailable.
    pub async fn execute_search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        let per_query = request.effective_results_per_query();
        let excluded: HashSet<&str> = request.exclude_urls.iter().map(String::as_str).collect();
        let mut pool: Vec<SearchResult> = Vec::new();

        for query in &request.queries {
            let candidates = self
                .provider
                .search(query, per_query, &request.site_restriction)
                .await?;
            let returned = candidates.len();

            let mut kept: Vec<SearchResult> = candidates
                .into_iter()
                .filter(|r| !excluded.contains(r.url.as_str()))
                .map(|mut r| {
                    r.query = query.clone();
                    r.search_engine = self.provider.name().to_string();
                    r.full_content = Some(String::new());
                    r
                })
                .collect();
            debug!(
                "Query '{}': {} returned, {} after exclusion",
                query,
                returned,
                kept.len()
            );

            if request.fetch_full_content {
                kept = self.fetch_contents(kept).await;
                debug!("Query '{}': {} with usable content", query, kept.len());
            }
            pool.extend(kept);
        }

        if pool.len() <= 1 {
            pool.truncate(request.max_filtered_results);
            return Ok(pool);
        }

        let pooled = pool.len();
        let ranked = rank_results(pool, request.max_filtered_results, request.fetch_full_content);
        info!(
            "Ranked {} pooled results from {} queries, kept {}",
            pooled,
            request.queries.len(),
            ranked.len()
        );
        Ok(ranked)
    }

    /// Fetch content for every candidate with bounded concurrency, keeping
    /// provider order and dropping failed or too-short pages.
    async fn fetch_contents(&self, candidates: Vec<SearchResult>) -> Vec<SearchResult> {
        let fetcher = &self.fetcher;
        let min_words = self.min_content_words;

        futures::stream::iter(candidates.into_iter().map(|mut result| async move {
            match fetcher.fetch(&result.url).await {
                Some(content) if word_count(&content) > min_words => {
                    result.full_content = Some(content);
                    Some(result)
                }
                Some(_) => {
                    warn!("Discarding {}: page content too short", result.url);
                    None
                }
                None => {
                    warn!("Discarding {}: content unavailable", result.url);
                    None
                }
            }
        }))
        .buffered(self.fetch_concurrency)
        .filter_map(|r| async move { r })
        .collect()
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_results_per_query() {
        let base = SearchRequest::new(vec!["a".to_string(), "b".to_string(), "c".to_string()])
            .max_results_per_query(8);
        assert_eq!(base.effective_results_per_query(), 8);

        let urls: Vec<SearchResult> = (0..4)
            .map(|i| SearchResult::new(format!("https://{}.example", i), "t", "s", 1, "Test"))
            .collect();
        let inflated = base.exclude(&urls);
        // ceil(4 / 3) = 2
        assert_eq!(inflated.effective_results_per_query(), 10);
    }

    #[test]
    fn test_effective_results_without_queries() {
        let request = SearchRequest::new(Vec::new());
        assert_eq!(request.effective_results_per_query(), 8);
    }
}
