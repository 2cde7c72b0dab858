//! Iterative Deep Research
//!
//! This module turns a question into a cited answer through bounded
//! research loops:
//!
//! 1. **Reformulate** - make the question standalone given the conversation
//! 2. **Generate queries** - the question plus N model-written queries
//! 3. **Web research** - search, exclude known sources, fetch, rank
//! 4. **Summarize** - write or extend the running summary with `[n]` citations
//! 5. **Reflect** - find a knowledge gap and write one follow-up query
//! 6. Loop back to 3 while the loop counter is within the configured maximum
//! 7. **Finalize** - keep only cited sources, renumber and link them
//! 8. **Suggest** - propose follow-up questions
//!
//! # Usage
//!
//! ```ignore
//! use deepsearch::research::ResearchSession;
//! use deepsearch::utils::config::ResearchConfig;
//!
//! let mut session = ResearchSession::from_config(ResearchConfig::load(None)?)?;
//! let output = session.invoke("What changed in EU AI regulation this year?").await?;
//! println!("{}", output.running_summary);
//! ```

/// Multi-query search execution.
pub mod aggregator;
/// Research loop state machine.
pub mod controller;
/// Source rendering and citation linking.
pub mod formatter;
/// Prompt templates.
pub mod prompts;
/// Composite result scoring.
pub mod ranking;
/// Multi-turn session.
pub mod session;

pub use aggregator::{SearchAggregator, SearchRequest};
pub use controller::{ResearchController, ResearchState, ResearchStep};
pub use session::{ResearchOutput, ResearchSession};
