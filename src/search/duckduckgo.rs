//! DuckDuckGo backend powered by daedra

use crate::search::provider::{RawCandidate, ResultProvider, SiteRestriction, collect_candidates};
use crate::search::rate_limit::RateLimiter;
use crate::types::{AppError, Result, SearchResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct DuckDuckGoProvider {
    limiter: Arc<RateLimiter>,
}

impl DuckDuckGoProvider {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl ResultProvider for DuckDuckGoProvider {
    fn name(&self) -> &str {
        "DuckDuckGo"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        site_restriction: &[String],
    ) -> Result<Vec<SearchResult>> {
        let restriction = SiteRestriction::new(site_restriction);
        let search_args = daedra::SearchArgs {
            query: restriction.apply_to_query(query),
            options: Some(daedra::SearchOptions {
                num_results: max_results,
                ..Default::default()
            }),
        };

        self.limiter.acquire().await;
        debug!("DuckDuckGo search: {}", search_args.query);

        let response = daedra::tools::search::perform_search(&search_args)
            .await
            .map_err(|e| AppError::Provider(format!("DuckDuckGo search failed: {}", e)))?;

        let candidates = response.data.iter().map(|r| RawCandidate {
            url: Some(r.url.clone()),
            title: Some(r.title.clone()),
            snippet: Some(r.description.clone()),
        });

        Ok(collect_candidates(
            self.name(),
            candidates,
            &restriction,
            max_results,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name() {
        let provider = DuckDuckGoProvider::new(Arc::new(RateLimiter::disabled()));
        assert_eq!(provider.name(), "DuckDuckGo");
    }
}
