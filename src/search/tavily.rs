//! Tavily search API backend

use crate::search::provider::{RawCandidate, ResultProvider, SiteRestriction, collect_candidates};
use crate::search::rate_limit::RateLimiter;
use crate::types::{AppError, Result, SearchResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct TavilyProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    limiter: Arc<RateLimiter>,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: Option<String>,
    title: Option<String>,
    content: Option<String>,
}

impl TavilyProvider {
    /// Create the backend. A missing key is reported on the first search.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            limiter,
        })
    }
}

#[async_trait]
impl ResultProvider for TavilyProvider {
    fn name(&self) -> &str {
        "Tavily"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        site_restriction: &[String],
    ) -> Result<Vec<SearchResult>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Provider("Tavily API key is not configured".to_string()))?;

        let restriction = SiteRestriction::new(site_restriction);
        let body = json!({
            "query": query,
            "max_results": max_results,
            "include_domains": restriction.domains(),
            "include_raw_content": false,
        });

        self.limiter.acquire().await;
        debug!("Tavily search: {}", query);

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Tavily request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "Tavily request failed ({}): {}",
                status, text
            )));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to parse Tavily response: {}", e)))?;

        let candidates = parsed.results.into_iter().map(|r| RawCandidate {
            url: r.url,
            title: r.title,
            snippet: r.content,
        });

        Ok(collect_candidates(
            self.name(),
            candidates,
            &restriction,
            max_results,
        ))
    }
}
