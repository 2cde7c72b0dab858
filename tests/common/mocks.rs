//! Mock implementations for testing.
//!
//! These stand in for the LLM, the search backend and the page fetcher so
//! the research loop can be driven end to end without network access.

use async_trait::async_trait;
use deepsearch::llm::LLMClient;
use deepsearch::research::prompts;
use deepsearch::search::{ContentFetcher, ResultProvider, SiteRestriction};
use deepsearch::types::{AppError, Result, SearchResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============= LLM =============

/// Research step a completion call belongs to, recognized by its system prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Reformulate,
    Queries,
    Summarize,
    Extend,
    Reflect,
    Suggest,
    Unknown,
}

impl Stage {
    pub fn of(system: &str) -> Self {
        if system == prompts::REFORMULATION_SYSTEM {
            Stage::Reformulate
        } else if system.starts_with("Your goal is to generate") {
            Stage::Queries
        } else if system == prompts::SUMMARIZER_SYSTEM {
            Stage::Summarize
        } else if system == prompts::SUMMARIZER_EXTEND_SYSTEM {
            Stage::Extend
        } else if system == prompts::REFLECTION_SYSTEM {
            Stage::Reflect
        } else if system == prompts::SUGGESTIONS_SYSTEM {
            Stage::Suggest
        } else {
            Stage::Unknown
        }
    }
}

/// One recorded completion request
#[derive(Debug, Clone)]
pub struct LlmCall {
    pub stage: Stage,
    pub system: String,
    pub prompt: String,
    pub json_mode: bool,
}

type Responder = dyn Fn(&LlmCall, usize) -> Result<String> + Send + Sync;

/// Mock LLM client answering each call through a responder closure.
///
/// The responder receives the call and how many earlier calls had the same
/// stage, so scripts can vary summaries or reflections per loop.
pub struct MockLLMClient {
    responder: Box<Responder>,
    calls: Arc<Mutex<Vec<LlmCall>>>,
}

impl MockLLMClient {
    pub fn new(responder: impl Fn(&LlmCall, usize) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A client that answers every stage with well-formed output
    pub fn well_behaved() -> Self {
        Self::new(|call, nth| Ok(default_response(call, nth)))
    }

    /// Shared view of the recorded calls, usable after the client is moved
    pub fn calls(&self) -> Arc<Mutex<Vec<LlmCall>>> {
        Arc::clone(&self.calls)
    }
}

/// Well-formed output for every stage
pub fn default_response(call: &LlmCall, nth: usize) -> String {
    match call.stage {
        Stage::Reformulate => "Standalone question".to_string(),
        Stage::Queries => r#"{"queries": [
            {"query": "generated query one", "rationale": "first angle"},
            {"query": "generated query two", "rationale": "second angle"}
        ]}"#
        .to_string(),
        Stage::Summarize => "Initial summary citing [1] and [2].".to_string(),
        Stage::Extend => format!("Extended summary {} citing [1] and [3].", nth + 1),
        Stage::Reflect => format!(
            r#"{{"knowledge_gap": "gap {n}", "follow_up_query": "follow up {n}"}}"#,
            n = nth + 1
        ),
        Stage::Suggest => r#"{"original_query": "q", "analysis": "a", "suggestions": [
            {"query": "first suggestion", "rationale": "r"},
            {"query": "second suggestion", "rationale": "r"}
        ]}"#
        .to_string(),
        Stage::Unknown => String::new(),
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn complete(&self, system: &str, prompt: &str, json_mode: bool) -> Result<String> {
        let call = LlmCall {
            stage: Stage::of(system),
            system: system.to_string(),
            prompt: prompt.to_string(),
            json_mode,
        };
        let nth = {
            let mut calls = self.calls.lock().unwrap();
            let nth = calls.iter().filter(|c| c.stage == call.stage).count();
            calls.push(call.clone());
            nth
        };
        (self.responder)(&call, nth)
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

// ============= Search provider =============

/// One recorded search request
#[derive(Debug, Clone)]
pub struct SearchCall {
    pub query: String,
    pub max_results: usize,
    pub site_restriction: Vec<String>,
}

/// Mock search backend.
///
/// Queries with canned results return those; any other query yields
/// generated results `https://<slug>.example/<i>` so every loop finds fresh
/// sources.
#[derive(Clone)]
pub struct MockProvider {
    canned: HashMap<String, Vec<SearchResult>>,
    fail: bool,
    calls: Arc<Mutex<Vec<SearchCall>>>,
    call_count: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            canned: HashMap::new(),
            fail: false,
            calls: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_results(mut self, query: &str, results: Vec<SearchResult>) -> Self {
        self.canned.insert(query.to_string(), results);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<SearchCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic results for `query`, positions starting at 1
pub fn generated_results(query: &str, count: usize) -> Vec<SearchResult> {
    let slug: String = query
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    (1..=count)
        .map(|i| {
            SearchResult::new(
                format!("https://{}.example/{}", slug, i),
                format!("{} result {}", query, i),
                format!("Snippet about {} number {}", query, i),
                i,
                "Mock",
            )
        })
        .collect()
}

#[async_trait]
impl ResultProvider for MockProvider {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        site_restriction: &[String],
    ) -> Result<Vec<SearchResult>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(SearchCall {
            query: query.to_string(),
            max_results,
            site_restriction: site_restriction.to_vec(),
        });

        if self.fail {
            return Err(AppError::Provider("mock backend unavailable".to_string()));
        }

        let restriction = SiteRestriction::new(site_restriction);
        let results = self
            .canned
            .get(query)
            .cloned()
            .unwrap_or_else(|| generated_results(query, max_results));
        Ok(results
            .into_iter()
            .filter(|r| restriction.allows(&r.url))
            .take(max_results)
            .collect())
    }
}

// ============= Content fetcher =============

/// Mock page fetcher serving fixed pages; unknown URLs get the default page
/// when one is set and fail otherwise.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: HashMap<String, String>,
    default_page: Option<String>,
}

impl MockFetcher {
    /// Every fetch fails
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Every URL serves `words` words of text
    pub fn every_page(words: usize) -> Self {
        Self {
            pages: HashMap::new(),
            default_page: Some(lorem(words)),
        }
    }

    pub fn with_page(mut self, url: &str, content: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), content.into());
        self
    }
}

/// `words` space-separated words
pub fn lorem(words: usize) -> String {
    vec!["lorem"; words].join(" ")
}

#[async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        self.pages
            .get(url)
            .cloned()
            .or_else(|| self.default_page.clone())
    }
}

/// Fetcher that holds each request open briefly and records how many were
/// in flight at once
#[derive(Clone, Default)]
pub struct TrackingFetcher {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

impl TrackingFetcher {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for TrackingFetcher {
    async fn fetch(&self, _url: &str) -> Option<String> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Some(lorem(100))
    }
}
