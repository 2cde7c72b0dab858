//! LLM client abstraction and provider selection
//!
//! Every supported provider speaks the OpenAI-compatible
//! `/chat/completions` API, so one `async-openai` client ([`ChatClient`])
//! serves all of them; the provider only decides defaults (base URL, API key).

use crate::search::RateLimiter;
use crate::types::{AppError, Result};
use crate::utils::config::{LlmProvider, ResearchConfig};
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use reqwest::header::{HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Text-completion capability consumed by the research loop
///
/// Implementations return the raw model text; reasoning markup is left in
/// place and stripped by the caller.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Complete `prompt` under `system` instructions.
    ///
    /// With `json_mode` the provider is asked to emit a single JSON object.
    async fn complete(&self, system: &str, prompt: &str, json_mode: bool) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider selection
///
/// | Provider | Default base URL | API key |
/// |----------|------------------|---------|
/// | OpenRouter | `https://openrouter.ai/api/v1` | `OPENROUTER_API_KEY` |
/// | LM Studio | `http://localhost:1234/v1` | none |
/// | Ollama | `http://localhost:11434/v1` | none |
pub type Provider = LlmProvider;

impl LlmProvider {
    /// Create a client for this provider from the research configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if the provider needs an API key and the
    /// referenced environment variable is unset.
    pub fn create_client(&self, config: &ResearchConfig) -> Result<Box<dyn LLMClient>> {
        let key_env = config
            .llm
            .api_key_env
            .clone()
            .or_else(|| self.default_api_key_env().map(String::from));
        let api_key = match key_env {
            Some(env_name) if self.requires_api_key() => Some(config.require_env(&env_name)?),
            Some(env_name) => config.resolve_env(&env_name),
            None => None,
        };
        let base_url = config
            .llm
            .base_url
            .clone()
            .unwrap_or_else(|| self.default_base_url().to_string());

        let client = ChatClient::builder(*self, config.model_name.clone())
            .base_url(base_url)
            .api_key(api_key)
            .temperature(config.llm.temperature)
            .max_tokens(config.llm.max_tokens)
            .retry(RetryPolicy::new(
                config.llm.max_retries,
                Duration::from_millis(config.llm.retry_delay_ms),
            ))
            .timeout(Duration::from_secs(config.llm.timeout_secs))
            .limiter(Arc::new(RateLimiter::from_millis(
                config.llm.min_call_interval_ms,
            )))
            .build()?;

        Ok(Box::new(client))
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, LlmProvider::OpenRouter)
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::OpenRouter => "OpenRouter",
            LlmProvider::LmStudio => "LM Studio",
            LlmProvider::Ollama => "Ollama",
        }
    }
}

// ============= Retry Policy =============

/// Bounded retry with linear backoff (`base_delay × attempt`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(4, Duration::from_millis(1000))
    }
}

enum CallError {
    Retryable(String),
    Fatal(String),
}

impl From<OpenAIError> for CallError {
    fn from(err: OpenAIError) -> Self {
        match err {
            OpenAIError::Reqwest(e) => CallError::Retryable(format!("HTTP request failed: {}", e)),
            OpenAIError::ApiError(api) if is_transient(&api) => {
                CallError::Retryable(format!("API error: {}", api.message))
            }
            OpenAIError::ApiError(api) => CallError::Fatal(format!("API error: {}", api.message)),
            // Error bodies that are not OpenAI-shaped (empty 429s, proxy pages) and
            // truncated success bodies both land here
            e @ OpenAIError::JSONDeserialize(..) => {
                CallError::Retryable(format!("Failed to parse response: {}", e))
            }
            other => CallError::Fatal(other.to_string()),
        }
    }
}

/// Server errors surface without a type or code; rate limits carry one.
fn is_transient(api: &ApiError) -> bool {
    let kind = api.r#type.as_deref().unwrap_or_default();
    (api.r#type.is_none() && api.code.is_none())
        || kind.contains("rate_limit")
        || api.message.to_lowercase().contains("rate limit")
}

// ============= Chat Completions Client =============

/// OpenAI-compatible chat completions client built on `async-openai`
pub struct ChatClient {
    client: Client<OpenAIConfig>,
    provider: LlmProvider,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retry: RetryPolicy,
    limiter: Arc<RateLimiter>,
}

pub struct ChatClientBuilder {
    provider: LlmProvider,
    model: String,
    base_url: Option<String>,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
    retry: RetryPolicy,
    timeout: Duration,
    limiter: Arc<RateLimiter>,
}

impl ChatClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn build(self) -> Result<ChatClient> {
        let mut headers = HeaderMap::new();
        if self.provider == LlmProvider::OpenRouter {
            headers.insert("X-Title", HeaderValue::from_static("deepsearch"));
        }
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::LLM(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string();

        // Local servers ignore the key; an explicit empty one keeps
        // OPENAI_API_KEY from leaking in through the config defaults
        let config = OpenAIConfig::new()
            .with_api_key(self.api_key.unwrap_or_default())
            .with_api_base(base_url.clone());

        // Retries are driven by RetryPolicy, so the library's own backoff gives up at once
        let no_backoff = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();

        Ok(ChatClient {
            client: Client::with_config(config)
                .with_http_client(http)
                .with_backoff(no_backoff),
            provider: self.provider,
            base_url,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            retry: self.retry,
            limiter: self.limiter,
        })
    }
}

impl ChatClient {
    pub fn builder(provider: LlmProvider, model: impl Into<String>) -> ChatClientBuilder {
        ChatClientBuilder {
            provider,
            model: model.into(),
            base_url: None,
            api_key: None,
            temperature: 0.0,
            max_tokens: 4000,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(120),
            limiter: Arc::new(RateLimiter::disabled()),
        }
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(
        &self,
        system: &str,
        prompt: &str,
        json_mode: bool,
    ) -> Result<CreateChatCompletionRequest> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(vec![
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage::from(
                    system.to_string(),
                )),
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage::from(
                    prompt.to_string(),
                )),
            ])
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);
        if json_mode {
            args.response_format(ResponseFormat::JsonObject);
        }
        args.build()
            .map_err(|e| AppError::LLM(format!("Failed to build request: {}", e)))
    }

    async fn send_once(
        &self,
        request: CreateChatCompletionRequest,
    ) -> std::result::Result<String, CallError> {
        let response = self.client.chat().create(request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                CallError::Retryable(format!("No content in {} response", self.provider.name()))
            })
    }
}

#[async_trait]
impl LLMClient for ChatClient {
    async fn complete(&self, system: &str, prompt: &str, json_mode: bool) -> Result<String> {
        let request = self.request(system, prompt, json_mode)?;
        let mut last_error = String::new();

        for attempt in 1..=self.retry.max_attempts {
            self.limiter.acquire().await;
            debug!(
                "Completion request to {} (attempt {}/{}, json_mode={})",
                self.model, attempt, self.retry.max_attempts, json_mode
            );

            match self.send_once(request.clone()).await {
                Ok(content) => return Ok(content),
                Err(CallError::Fatal(message)) => {
                    return Err(AppError::LLM(format!(
                        "{} request failed: {}",
                        self.provider.name(),
                        message
                    )));
                }
                Err(CallError::Retryable(message)) => {
                    warn!(
                        "Completion attempt {}/{} failed: {}",
                        attempt, self.retry.max_attempts, message
                    );
                    last_error = message;
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.delay_for(attempt)).await;
                    }
                }
            }
        }

        Err(AppError::LLM(format!(
            "Giving up after {} attempts: {}",
            self.retry.max_attempts, last_error
        )))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name() {
        assert_eq!(Provider::OpenRouter.name(), "OpenRouter");
        assert_eq!(Provider::LmStudio.name(), "LM Studio");
        assert_eq!(Provider::Ollama.name(), "Ollama");
        assert!(Provider::OpenRouter.requires_api_key());
        assert!(!Provider::Ollama.requires_api_key());
    }

    #[test]
    fn test_retry_policy_backoff() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(3), Duration::from_millis(300));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[test]
    fn test_request_json_mode() {
        let client = ChatClient::builder(Provider::Ollama, "llama3.2")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434/v1");

        let plain = serde_json::to_value(client.request("sys", "hi", false).unwrap()).unwrap();
        assert!(plain.get("response_format").is_none());
        assert_eq!(plain["model"], "llama3.2");
        assert_eq!(plain["messages"][0]["role"], "system");
        assert_eq!(plain["messages"][1]["content"], "hi");

        let json_body = serde_json::to_value(client.request("sys", "hi", true).unwrap()).unwrap();
        assert_eq!(json_body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_transient_api_errors() {
        let api = |kind: Option<&str>, code: Option<&str>, message: &str| ApiError {
            message: message.to_string(),
            r#type: kind.map(String::from),
            param: None,
            code: code.map(String::from),
        };
        assert!(is_transient(&api(None, None, "upstream down")));
        assert!(is_transient(&api(Some("rate_limit_exceeded"), None, "slow down")));
        assert!(is_transient(&api(Some("requests"), Some("x"), "Rate limit reached")));
        assert!(!is_transient(&api(
            Some("invalid_request_error"),
            Some("model_not_found"),
            "The model does not exist"
        )));
    }

    #[test]
    fn test_local_providers_need_no_key() {
        let config = ResearchConfig {
            llm_provider: LlmProvider::LmStudio,
            ..Default::default()
        };
        let client = config.llm_provider.create_client(&config).unwrap();
        assert_eq!(client.model_name(), config.model_name);
    }

    #[test]
    fn test_openrouter_missing_key_errors() {
        let config = ResearchConfig {
            llm: crate::utils::config::LlmSettings {
                api_key_env: Some("DEEPSEARCH_TEST_UNSET_OPENROUTER_KEY".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = match config.llm_provider.create_client(&config) {
            Ok(_) => panic!("Expected error"),
            Err(e) => e.to_string(),
        };
        assert!(err.contains("DEEPSEARCH_TEST_UNSET_OPENROUTER_KEY"));
    }
}
