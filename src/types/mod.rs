use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============= Search Types =============

/// One candidate web source, as produced by a search backend and enriched by
/// the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub url: String,
    pub title: String,
    pub snippet: String,
    /// Extracted page text; empty unless full-content fetching was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_content: Option<String>,
    /// Query text that surfaced this result.
    pub query: String,
    /// 1-based rank within the originating query's result list.
    pub position: usize,
    /// Session-global citation number, assigned once the result is collected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_source: Option<usize>,
    pub search_engine: String,
    /// Composite ranking score, absent until ranking completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl SearchResult {
    /// Create an unranked, unnumbered result at the given provider position.
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        snippet: impl Into<String>,
        position: usize,
        search_engine: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url: url.into(),
            title: title.into(),
            snippet: snippet.into(),
            full_content: None,
            query: String::new(),
            position,
            num_source: None,
            search_engine: search_engine.into(),
            score: None,
        }
    }

    /// Fetched content, or the empty string when none was fetched.
    pub fn content(&self) -> &str {
        self.full_content.as_deref().unwrap_or_default()
    }
}

/// Structured follow-up suggestions produced at the end of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Suggestions {
    #[serde(default)]
    pub original_query: String,
    #[serde(default)]
    pub analysis: String,
    pub suggestions: Vec<SuggestedQuery>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedQuery {
    pub query: String,
    #[serde(default)]
    pub rationale: String,
}

// ============= Conversation Types =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    /// Speaker label used when a conversation is rendered as a plain transcript.
    pub fn transcript_label(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "human",
            MessageRole::Assistant => "ai",
        }
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A search backend is unreachable or rejected the request outright.
    #[error("Search provider error: {0}")]
    Provider(String),

    #[error("LLM error: {0}")]
    LLM(String),

    /// The model returned structured output that could not be salvaged.
    #[error("Generation parse error: {0}")]
    GenerationParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
