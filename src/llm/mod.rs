//! LLM Provider Clients
//!
//! This module provides the text-completion capability the research loop
//! depends on. The loop only sees the [`LLMClient`] trait; the concrete
//! [`ChatClient`] talks to any OpenAI-compatible `/chat/completions`
//! endpoint (OpenRouter, LM Studio, Ollama) with bounded retry and backoff.
//!
//! # Example
//!
//! ```ignore
//! use deepsearch::llm::{LLMClient, Provider};
//! use deepsearch::utils::config::ResearchConfig;
//!
//! let config = ResearchConfig::load(None)?;
//! let client = config.llm_provider.create_client(&config)?;
//!
//! let answer = client.complete("You are terse.", "What is 2+2?", false).await?;
//! println!("{}", answer);
//! ```
//!
//! Reasoning markup (`<think>...</think>`) is returned untouched; callers
//! apply [`strip_thinking_tokens`] when configured to.

/// Core LLM client trait, provider selection and HTTP client.
pub mod client;
/// Reasoning markup removal.
pub mod reasoning;

pub use client::{ChatClient, ChatClientBuilder, LLMClient, Provider, RetryPolicy};
pub use reasoning::strip_thinking_tokens;
