//! # deepsearch - Iterative Deep Research
//!
//! An agent that answers a question by researching the web over a bounded
//! number of loops and writing a summary with numbered, linked references.
//!
//! ## Overview
//!
//! deepsearch can be used in two ways:
//!
//! 1. **As a command-line tool** - Run the `deepsearch` binary
//! 2. **As a library** - Embed the research loop in your own Rust project
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use deepsearch::{ResearchConfig, ResearchSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ResearchConfig::load(None)?;
//!     let mut session = ResearchSession::from_config(config)?;
//!
//!     let output = session.invoke("What changed in the EU AI act this year?").await?;
//!     println!("{}", output.running_summary);
//!
//!     // Follow-up questions are reformulated against the previous turns
//!     let output = session.invoke("And when does it apply?").await?;
//!     println!("{}", output.running_summary);
//!     Ok(())
//! }
//! ```
//!
//! ### Custom Backends
//!
//! ```rust,ignore
//! use deepsearch::research::{ResearchController, SearchAggregator};
//! use deepsearch::search::{PageFetcher, SearchBackend};
//! use std::sync::Arc;
//!
//! let backend = SearchBackend::from_config(&config)?;
//! let aggregator = SearchAggregator::new(Arc::new(backend), Arc::new(PageFetcher::default()));
//! let controller = ResearchController::new(my_llm_client, aggregator, config);
//! ```
//!
//! ## Modules
//!
//! - [`research`] - Research loop, aggregation, ranking and citation formatting
//! - [`search`] - Web search backends and page fetching
//! - [`llm`] - Chat-completion client with retry
//! - [`utils`] - Configuration and tolerant JSON extraction
//! - [`types`] - Common types and error handling
//! - [`cli`] - Command-line parsing and terminal output
//!
//! ## Configuration
//!
//! Options resolve from built-in defaults, `deepsearch.toml`,
//! `DEEPSEARCH_*` environment variables and caller overrides, in that order
//! of increasing precedence. API keys are only ever read from the
//! environment.

#![warn(rustdoc::missing_crate_level_docs)]

/// Command-line interface.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Iterative research loop.
pub mod research;
/// Web search backends.
pub mod search;
/// Core types (search results, messages, errors).
pub mod types;
/// Configuration and parsing utilities.
pub mod utils;

// Re-export commonly used types
pub use llm::{LLMClient, Provider};
pub use research::{ResearchController, ResearchOutput, ResearchSession, SearchAggregator};
pub use search::{ContentFetcher, ResultProvider, SearchBackend};
pub use types::{AppError, Result, SearchResult};
pub use utils::config::{ConfigOverrides, ResearchConfig};
