//! Google backend scraping the basic HTML results page

use crate::search::provider::{RawCandidate, ResultProvider, SiteRestriction, collect_candidates};
use crate::search::rate_limit::RateLimiter;
use crate::types::{AppError, Result, SearchResult};
use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::{COOKIE, USER_AGENT};
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

// The basic HTML layout is only served to text browsers.
const TEXT_BROWSER_AGENT: &str = "Lynx/2.9.0dev.12 libwww-FM/2.14 SSL-MM/1.4.1 GNUTLS/3.7.8";

pub struct GoogleProvider {
    client: reqwest::Client,
    base_url: String,
    language: String,
    limiter: Arc<RateLimiter>,
}

impl GoogleProvider {
    pub fn new(
        base_url: impl Into<String>,
        language: impl Into<String>,
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
            language: language.into(),
            limiter,
        })
    }
}

#[async_trait]
impl ResultProvider for GoogleProvider {
    fn name(&self) -> &str {
        "Google"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        site_restriction: &[String],
    ) -> Result<Vec<SearchResult>> {
        let restriction = SiteRestriction::new(site_restriction);
        let full_query = restriction.apply_to_query(query);
        let num = (max_results + 2).to_string();

        self.limiter.acquire().await;
        debug!("Google search: {}", full_query);

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("q", full_query.as_str()),
                ("num", num.as_str()),
                ("hl", self.language.as_str()),
                ("safe", "active"),
            ])
            .header(USER_AGENT, TEXT_BROWSER_AGENT)
            .header(COOKIE, "CONSENT=PENDING+987; SOCS=CAESHAgBEhIaAB")
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Google request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "Google returned status {}",
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to read Google response: {}", e)))?;

        Ok(collect_candidates(
            self.name(),
            parse_results_page(&html),
            &restriction,
            max_results,
        ))
    }
}

// ============= HTML Parsing =============

/// Extract result candidates from a Google basic-HTML results page, in page
/// order. Blocks without a resolvable link still yield a candidate with the
/// missing parts unset so positions stay aligned with the page.
pub fn parse_results_page(html: &str) -> Vec<RawCandidate> {
    let document = Html::parse_document(html);

    let (Ok(block_sel), Ok(link_sel), Ok(title_sel), Ok(desc_sel)) = (
        Selector::parse("div.ezO2md"),
        Selector::parse("a[href]"),
        Selector::parse("span.CVA68e"),
        Selector::parse("span.FrIlee"),
    ) else {
        return Vec::new();
    };

    document
        .select(&block_sel)
        .map(|block| RawCandidate {
            url: block
                .select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(unwrap_redirect),
            title: block.select(&title_sel).next().map(element_text),
            snippet: block.select(&desc_sel).next().map(element_text),
        })
        .collect()
}

/// Resolve `/url?q=<target>&...` redirect links to their target
fn unwrap_redirect(href: &str) -> Option<String> {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }

    let url = Url::parse("https://www.google.com").ok()?.join(href).ok()?;
    if url.path() != "/url" {
        return None;
    }
    url.query_pairs()
        .find(|(key, _)| key == "q")
        .map(|(_, target)| target.into_owned())
        .filter(|target| target.starts_with("http://") || target.starts_with("https://"))
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
  <div class="ezO2md">
    <a href="/url?q=https://www.gazzettaufficiale.it/eli/id/2025&amp;sa=U&amp;ved=abc">
      <span class="CVA68e qXLe6d">Gazzetta   Ufficiale</span>
    </a>
    <span class="FrIlee"><span>New regulatory   update published</span></span>
  </div>
  <div class="ezO2md">
    <a href="https://example.org/direct"><span class="CVA68e">Direct link</span></a>
    <span class="FrIlee">Direct description</span>
  </div>
  <div class="ezO2md">
    <a href="/search?q=related"><span class="CVA68e">Related searches</span></a>
  </div>
</body></html>
"#;

    #[test]
    fn test_parse_results_page() {
        let candidates = parse_results_page(PAGE);
        assert_eq!(candidates.len(), 3);

        assert_eq!(
            candidates[0].url.as_deref(),
            Some("https://www.gazzettaufficiale.it/eli/id/2025")
        );
        assert_eq!(candidates[0].title.as_deref(), Some("Gazzetta Ufficiale"));
        assert_eq!(
            candidates[0].snippet.as_deref(),
            Some("New regulatory update published")
        );

        assert_eq!(candidates[1].url.as_deref(), Some("https://example.org/direct"));

        // Internal search links are not results
        assert!(candidates[2].url.is_none());
        assert!(candidates[2].snippet.is_none());
    }

    #[test]
    fn test_parse_empty_page() {
        assert!(parse_results_page("<html><body>No results</body></html>").is_empty());
    }

    #[test]
    fn test_unwrap_redirect() {
        assert_eq!(
            unwrap_redirect("/url?q=https%3A%2F%2Fa.example%2Fx%3Fy%3D1&sa=U").as_deref(),
            Some("https://a.example/x?y=1")
        );
        assert_eq!(
            unwrap_redirect("https://b.example").as_deref(),
            Some("https://b.example")
        );
        assert!(unwrap_redirect("/search?q=more").is_none());
        assert!(unwrap_redirect("/url?q=javascript:void(0)").is_none());
    }

    #[test]
    fn test_incomplete_blocks_keep_their_position() {
        let candidates = parse_results_page(PAGE);
        let results = collect_candidates("Google", candidates, &SiteRestriction::default(), 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].position, 1);
        assert_eq!(results[1].position, 2);
    }
}
