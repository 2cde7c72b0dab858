use crate::types::{Result, SearchResult};
use async_trait::async_trait;
use reqwest::Url;
use tracing::warn;

/// One external web-search backend
///
/// Implementations number results from 1 in the order the backend returned
/// them, silently drop incomplete candidates, and only fail when the backend
/// as a whole is unavailable. An empty list is a valid answer.
#[async_trait]
pub trait ResultProvider: Send + Sync {
    /// Engine name recorded on every result (`DuckDuckGo`, `Google`, `Tavily`)
    fn name(&self) -> &str;

    /// Search for `query`, returning at most `max_results` candidates.
    ///
    /// An empty `site_restriction` means any site.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        site_restriction: &[String],
    ) -> Result<Vec<SearchResult>>;
}

// ============= Site Restriction =============

/// Normalized domain allowlist
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteRestriction {
    domains: Vec<String>,
}

impl SiteRestriction {
    pub fn new(sites: &[String]) -> Self {
        let domains = sites
            .iter()
            .map(|site| normalize_domain(site))
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Query operator form understood by web search engines:
    /// `site:a OR site:b`
    pub fn query_operator(&self) -> Option<String> {
        if self.domains.is_empty() {
            return None;
        }
        Some(
            self.domains
                .iter()
                .map(|d| format!("site:{}", d))
                .collect::<Vec<_>>()
                .join(" OR "),
        )
    }

    /// Append the site operator to a query, if any restriction applies
    pub fn apply_to_query(&self, query: &str) -> String {
        match self.query_operator() {
            Some(operator) => format!("{} {}", query, operator),
            None => query.to_string(),
        }
    }

    /// Whether `url`'s host is one of the domains or a subdomain of one.
    /// Always true for an empty restriction.
    pub fn allows(&self, url: &str) -> bool {
        if self.domains.is_empty() {
            return true;
        }
        let Some(host) = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        else {
            return false;
        };
        self.domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
    }
}

fn normalize_domain(site: &str) -> String {
    let site = site.trim().to_lowercase();
    let site = site
        .strip_prefix("https://")
        .or_else(|| site.strip_prefix("http://"))
        .unwrap_or(&site);
    let site = site.split('/').next().unwrap_or_default();
    site.trim_start_matches("*.").trim_end_matches('.').to_string()
}

// ============= Candidate Collection =============

/// A backend record before validation
#[derive(Debug, Clone, Default)]
pub struct RawCandidate {
    pub url: Option<String>,
    pub title: Option<String>,
    pub snippet: Option<String>,
}

impl RawCandidate {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            url: Some(url.into()),
            title: Some(title.into()),
            snippet: Some(snippet.into()),
        }
    }
}

/// Turn raw backend records into results.
///
/// Positions follow the backend's order starting at 1 and are assigned
/// before incomplete or off-site candidates are dropped.
pub fn collect_candidates(
    engine: &str,
    candidates: impl IntoIterator<Item = RawCandidate>,
    restriction: &SiteRestriction,
    max_results: usize,
) -> Vec<SearchResult> {
    let mut results = Vec::new();

    for (index, candidate) in candidates.into_iter().take(max_results).enumerate() {
        let position = index + 1;
        let (Some(url), Some(title), Some(snippet)) = (
            non_blank(candidate.url),
            non_blank(candidate.title),
            non_blank(candidate.snippet),
        ) else {
            warn!("Incomplete result from {} at position {}, skipping", engine, position);
            continue;
        };

        if !restriction.allows(&url) {
            warn!("Result from {} outside site restriction: {}", engine, url);
            continue;
        }

        results.push(SearchResult::new(url, title, snippet, position, engine));
    }

    results
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sites(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_restriction_allows_everything() {
        let restriction = SiteRestriction::new(&[]);
        assert!(restriction.is_empty());
        assert!(restriction.allows("https://anything.example/path"));
        assert_eq!(restriction.apply_to_query("rust"), "rust");
    }

    #[test]
    fn test_query_operator() {
        let restriction = SiteRestriction::new(&sites(&["it.wikipedia.org", "gazzettaufficiale.it"]));
        assert_eq!(
            restriction.apply_to_query("regulatory update"),
            "regulatory update site:it.wikipedia.org OR site:gazzettaufficiale.it"
        );
    }

    #[test]
    fn test_domain_normalization() {
        let restriction = SiteRestriction::new(&sites(&[" HTTPS://Example.org/news ", "", "*.gov.uk"]));
        assert_eq!(restriction.domains(), &["example.org", "gov.uk"]);
    }

    #[test]
    fn test_allows_subdomains_only_on_label_boundary() {
        let restriction = SiteRestriction::new(&sites(&["example.org"]));
        assert!(restriction.allows("https://example.org/a"));
        assert!(restriction.allows("https://www.example.org/a"));
        assert!(!restriction.allows("https://badexample.org/a"));
        assert!(!restriction.allows("https://example.org.evil.com/a"));
        assert!(!restriction.allows("not a url"));
    }

    #[test]
    fn test_collect_assigns_positions_before_dropping() {
        let candidates = vec![
            RawCandidate::new("https://a.example", "A", "first"),
            RawCandidate {
                url: Some("https://b.example".to_string()),
                title: None,
                snippet: Some("missing title".to_string()),
            },
            RawCandidate::new("https://c.example", "C", "third"),
        ];

        let results = collect_candidates("Google", candidates, &SiteRestriction::default(), 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].position, 1);
        assert_eq!(results[1].position, 3);
        assert_eq!(results[1].search_engine, "Google");
    }

    #[test]
    fn test_collect_drops_blank_and_off_site() {
        let candidates = vec![
            RawCandidate::new("https://docs.rs/tokio", "tokio", "async runtime"),
            RawCandidate::new("https://blog.example/tokio", "blog", "off site"),
            RawCandidate::new("https://docs.rs/serde", "   ", "blank title"),
        ];
        let restriction = SiteRestriction::new(&sites(&["docs.rs"]));

        let results = collect_candidates("DuckDuckGo", candidates, &restriction, 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://docs.rs/tokio");
    }

    #[test]
    fn test_collect_honors_max_results() {
        let candidates =
            (1..=10).map(|i| RawCandidate::new(format!("https://{}.example", i), "t", "s"));
        let results = collect_candidates("Tavily", candidates, &SiteRestriction::default(), 4);
        assert_eq!(results.len(), 4);
        assert_eq!(results[3].position, 4);
    }
}
