//! Web Search Backends
//!
//! Every backend implements [`ResultProvider`] and holds an injected
//! [`RateLimiter`]. [`SearchBackend`] is the closed set selectable through
//! the `search_api` configuration key:
//!
//! | Backend | Transport | Site restriction |
//! |---------|-----------|------------------|
//! | DuckDuckGo | daedra | `site:` operators in the query |
//! | Google | basic HTML page, parsed with scraper | `site:` operators in the query |
//! | Tavily | JSON API, `TAVILY_API_KEY` | `include_domains` |
//!
//! All backends also drop results whose host falls outside the allowlist.
//! [`ContentFetcher`] retrieves full page text for ranking and summarization.

/// DuckDuckGo via daedra.
pub mod duckduckgo;
/// Full-page content retrieval.
pub mod fetcher;
/// Google basic-HTML scraping.
pub mod google;
/// Provider trait, site restriction and candidate validation.
pub mod provider;
/// Minimum-interval call gate.
pub mod rate_limit;
/// Tavily search API.
pub mod tavily;

pub use duckduckgo::DuckDuckGoProvider;
pub use fetcher::{ContentFetcher, PageFetcher};
pub use google::GoogleProvider;
pub use provider::{RawCandidate, ResultProvider, SiteRestriction};
pub use rate_limit::RateLimiter;
pub use tavily::TavilyProvider;

use crate::types::{Result, SearchResult};
use crate::utils::config::{ResearchConfig, SearchApi};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Closed dispatch over the supported backends
pub enum SearchBackend {
    DuckDuckGo(DuckDuckGoProvider),
    Google(GoogleProvider),
    Tavily(TavilyProvider),
}

impl SearchBackend {
    /// Build the backend selected by `config.search_api` with its own limiter
    pub fn from_config(config: &ResearchConfig) -> Result<Self> {
        let limiter = Arc::new(RateLimiter::from_millis(config.search.min_call_interval_ms));
        Self::with_limiter(config.search_api, config, limiter)
    }

    /// Build a backend around an existing limiter, so several sessions can
    /// share one gate per backend type.
    pub fn with_limiter(
        api: SearchApi,
        config: &ResearchConfig,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        let timeout = Duration::from_secs(config.search.fetch_timeout_secs);

        Ok(match api {
            SearchApi::DuckDuckGo => Self::DuckDuckGo(DuckDuckGoProvider::new(limiter)),
            SearchApi::Google => Self::Google(GoogleProvider::new(
                config.search.google_base_url.clone(),
                config.search.language.clone(),
                timeout,
                limiter,
            )?),
            SearchApi::Tavily => Self::Tavily(TavilyProvider::new(
                config.search.tavily_base_url.clone(),
                config.resolve_env(&config.search.tavily_api_key_env),
                timeout,
                limiter,
            )?),
        })
    }

    pub fn api(&self) -> SearchApi {
        match self {
            Self::DuckDuckGo(_) => SearchApi::DuckDuckGo,
            Self::Google(_) => SearchApi::Google,
            Self::Tavily(_) => SearchApi::Tavily,
        }
    }

    fn inner(&self) -> &dyn ResultProvider {
        match self {
            Self::DuckDuckGo(p) => p,
            Self::Google(p) => p,
            Self::Tavily(p) => p,
        }
    }
}

#[async_trait]
impl ResultProvider for SearchBackend {
    fn name(&self) -> &str {
        self.inner().name()
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        site_restriction: &[String],
    ) -> Result<Vec<SearchResult>> {
        self.inner()
            .search(query, max_results, site_restriction)
            .await
    }
}
