//! Configuration and text utilities
//!
//! - [`config`] - `ResearchConfig` layered from defaults, `deepsearch.toml`,
//!   `DEEPSEARCH_*` environment variables and caller overrides
//! - [`json_extract`] - best-effort JSON recovery from model output

/// Layered research configuration.
pub mod config;
/// Loose JSON salvage.
pub mod json_extract;

pub use config::{ConfigError, ConfigOverrides, LlmProvider, ResearchConfig, SearchApi};
pub use json_extract::parse_loose_json;
