//! Research session configuration
//!
//! A flat set of named options resolved, in increasing precedence, from
//! built-in defaults, an optional `deepsearch.toml`, `DEEPSEARCH_*`
//! environment variables and caller-supplied [`ConfigOverrides`].
//!
//! Secrets are never stored here: the config names the environment variable
//! that holds an API key and the key is resolved when a client is built.

use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Default configuration file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "deepsearch.toml";

/// Prefix for environment variable overrides (`DEEPSEARCH_SEARCH_API`, ...).
pub const ENV_PREFIX: &str = "DEEPSEARCH";

/// Root configuration for a research session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Web search backend
    pub search_api: SearchApi,

    /// Domains the search is restricted to (empty for any site)
    pub sites_search_restriction: Vec<String>,

    /// Number of generated queries added to the user's own query
    pub initial_num_queries_in_addition: usize,

    /// Results kept per research loop after ranking
    pub max_filtered_results: usize,

    /// Results requested from the backend for each query
    pub max_results_per_query: usize,

    /// Fetch and rank on the full page content of every result
    pub fetch_full_page: bool,

    /// Per-source cap on full content handed to the model
    pub max_tokens_per_source: usize,

    /// Research depth; see the routing rule in `research::controller`
    pub max_web_research_loops: usize,

    pub model_name: String,

    pub llm_provider: LlmProvider,

    /// Remove `<think>` segments from every model response
    pub strip_thinking_tokens: bool,

    pub llm: LlmSettings,

    pub search: SearchSettings,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            search_api: SearchApi::default(),
            sites_search_restriction: Vec::new(),
            initial_num_queries_in_addition: 2,
            max_filtered_results: 4,
            max_results_per_query: 8,
            fetch_full_page: true,
            max_tokens_per_source: 1000,
            max_web_research_loops: 2,
            model_name: "google/gemma-3-27b-it:free".to_string(),
            llm_provider: LlmProvider::default(),
            strip_thinking_tokens: true,
            llm: LlmSettings::default(),
            search: SearchSettings::default(),
        }
    }
}

// ============= Search Backend Selection =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchApi {
    #[default]
    DuckDuckGo,
    Google,
    Tavily,
}

impl SearchApi {
    pub fn all() -> [Self; 3] {
        [Self::DuckDuckGo, Self::Google, Self::Tavily]
    }
}

impl FromStr for SearchApi {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "duckduckgo" | "ddg" => Ok(Self::DuckDuckGo),
            "google" => Ok(Self::Google),
            "tavily" => Ok(Self::Tavily),
            other => Err(ConfigError::ValidationError(format!(
                "Unknown search api: {}. Use one of: duckduckgo, google, tavily",
                other
            ))),
        }
    }
}

impl fmt::Display for SearchApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DuckDuckGo => "duckduckgo",
            Self::Google => "google",
            Self::Tavily => "tavily",
        };
        write!(f, "{}", name)
    }
}

// ============= LLM Provider Selection =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenRouter,
    LmStudio,
    Ollama,
}

impl LlmProvider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::LmStudio => "http://localhost:1234/v1",
            Self::Ollama => "http://localhost:11434/v1",
        }
    }

    /// Environment variable holding the API key, if the provider needs one
    pub fn default_api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::OpenRouter => Some("OPENROUTER_API_KEY"),
            Self::LmStudio | Self::Ollama => None,
        }
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openrouter" => Ok(Self::OpenRouter),
            "lmstudio" | "lm-studio" => Ok(Self::LmStudio),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::ValidationError(format!(
                "Unknown llm provider: {}. Use one of: openrouter, lmstudio, ollama",
                other
            ))),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OpenRouter => "openrouter",
            Self::LmStudio => "lmstudio",
            Self::Ollama => "ollama",
        };
        write!(f, "{}", name)
    }
}

// ============= LLM Client Settings =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Environment variable containing the API key (provider default if unset)
    pub api_key_env: Option<String>,

    /// Override for the provider's base URL
    pub base_url: Option<String>,

    pub temperature: f32,

    pub max_tokens: u32,

    /// Attempts per completion before giving up
    pub max_retries: u32,

    /// Base backoff between attempts, multiplied by the attempt number
    pub retry_delay_ms: u64,

    pub timeout_secs: u64,

    /// Minimum interval between two completion calls (0 disables)
    pub min_call_interval_ms: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key_env: None,
            base_url: None,
            temperature: 0.0,
            max_tokens: 4000,
            max_retries: 4,
            retry_delay_ms: 1000,
            timeout_secs: 120,
            min_call_interval_ms: 0,
        }
    }
}

// ============= Search Settings =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Minimum interval between two calls to the same backend
    pub min_call_interval_ms: u64,

    /// Concurrent page fetches per query
    pub fetch_concurrency: usize,

    pub fetch_timeout_secs: u64,

    /// Fetched pages with this many words or fewer are discarded
    pub min_content_words: usize,

    /// Interface language passed to backends that accept one
    pub language: String,

    pub tavily_api_key_env: String,

    pub tavily_base_url: String,

    pub google_base_url: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            min_call_interval_ms: 1000,
            fetch_concurrency: 10,
            fetch_timeout_secs: 60,
            min_content_words: 30,
            language: "en".to_string(),
            tavily_api_key_env: "TAVILY_API_KEY".to_string(),
            tavily_base_url: "https://api.tavily.com".to_string(),
            google_base_url: "https://www.google.com".to_string(),
        }
    }
}

// ============= Caller Overrides =============

/// Options supplied by the caller (CLI flags, embedding code); each set
/// field wins over file and environment values.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub search_api: Option<SearchApi>,
    pub sites_search_restriction: Option<Vec<String>>,
    pub initial_num_queries_in_addition: Option<usize>,
    pub max_filtered_results: Option<usize>,
    pub max_results_per_query: Option<usize>,
    pub fetch_full_page: Option<bool>,
    pub max_tokens_per_source: Option<usize>,
    pub max_web_research_loops: Option<usize>,
    pub model_name: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub strip_thinking_tokens: Option<bool>,
}

// ============= Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl From<ConfigError> for crate::types::AppError {
    fn from(err: ConfigError) -> Self {
        crate::types::AppError::Config(err.to_string())
    }
}

impl ResearchConfig {
    /// Resolve the configuration from file and environment.
    ///
    /// An explicit `path` must exist; without one, `deepsearch.toml` in the
    /// working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let (file, required) = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(path.to_path_buf()));
                }
                (path.to_path_buf(), true)
            }
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        debug!("Loading configuration from {:?}", file);

        let config: ResearchConfig = config::Config::builder()
            .add_source(
                File::from(file.as_path())
                    .format(FileFormat::Toml)
                    .required(required),
            )
            .add_source(Self::environment())
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("sites_search_restriction")
    }

    /// Apply caller-supplied overrides and re-validate
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        if let Some(v) = overrides.search_api {
            self.search_api = v;
        }
        if let Some(v) = overrides.sites_search_restriction {
            self.sites_search_restriction = v;
        }
        if let Some(v) = overrides.initial_num_queries_in_addition {
            self.initial_num_queries_in_addition = v;
        }
        if let Some(v) = overrides.max_filtered_results {
            self.max_filtered_results = v;
        }
        if let Some(v) = overrides.max_results_per_query {
            self.max_results_per_query = v;
        }
        if let Some(v) = overrides.fetch_full_page {
            self.fetch_full_page = v;
        }
        if let Some(v) = overrides.max_tokens_per_source {
            self.max_tokens_per_source = v;
        }
        if let Some(v) = overrides.max_web_research_loops {
            self.max_web_research_loops = v;
        }
        if let Some(v) = overrides.model_name {
            self.model_name = v;
        }
        if let Some(v) = overrides.llm_provider {
            self.llm_provider = v;
        }
        if let Some(v) = overrides.strip_thinking_tokens {
            self.strip_thinking_tokens = v;
        }

        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_filtered_results == 0 {
            return Err(ConfigError::ValidationError(
                "max_filtered_results must be at least 1".to_string(),
            ));
        }
        if self.max_results_per_query == 0 {
            return Err(ConfigError::ValidationError(
                "max_results_per_query must be at least 1".to_string(),
            ));
        }
        if self.max_tokens_per_source == 0 {
            return Err(ConfigError::ValidationError(
                "max_tokens_per_source must be at least 1".to_string(),
            ));
        }
        if self.search.fetch_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "search.fetch_concurrency must be at least 1".to_string(),
            ));
        }
        if self.model_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "model_name must not be empty".to_string(),
            ));
        }
        if let Some(site) = self
            .sites_search_restriction
            .iter()
            .find(|s| s.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(format!(
                "sites_search_restriction contains a blank entry: {:?}",
                site
            )));
        }
        Ok(())
    }

    /// Environment variable holding the LLM API key, if any is needed
    pub fn llm_api_key_env(&self) -> Option<String> {
        self.llm
            .api_key_env
            .clone()
            .or_else(|| self.llm_provider.default_api_key_env().map(String::from))
    }

    pub fn llm_base_url(&self) -> String {
        self.llm
            .base_url
            .clone()
            .unwrap_or_else(|| self.llm_provider.default_base_url().to_string())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok().filter(|v| !v.trim().is_empty())
    }

    /// Resolve a required env var reference
    pub fn require_env(&self, env_name: &str) -> Result<String, ConfigError> {
        self.resolve_env(env_name)
            .ok_or_else(|| ConfigError::MissingEnvVar(env_name.to_string()))
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ResearchConfig::default();
        assert_eq!(config.search_api, SearchApi::DuckDuckGo);
        assert!(config.sites_search_restriction.is_empty());
        assert_eq!(config.initial_num_queries_in_addition, 2);
        assert_eq!(config.max_filtered_results, 4);
        assert_eq!(config.max_results_per_query, 8);
        assert!(config.fetch_full_page);
        assert_eq!(config.max_tokens_per_source, 1000);
        assert_eq!(config.max_web_research_loops, 2);
        assert_eq!(config.llm_provider, LlmProvider::OpenRouter);
        assert!(config.strip_thinking_tokens);
        assert_eq!(config.search.fetch_concurrency, 10);
        assert_eq!(config.search.min_content_words, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let content = r#"
search_api = "tavily"
sites_search_restriction = ["it.wikipedia.org"]
max_web_research_loops = 1

[llm]
max_retries = 2
"#;
        let config: ResearchConfig = toml::from_str(content).expect("Failed to parse config");
        assert_eq!(config.search_api, SearchApi::Tavily);
        assert_eq!(config.sites_search_restriction, vec!["it.wikipedia.org"]);
        assert_eq!(config.max_web_research_loops, 1);
        assert_eq!(config.llm.max_retries, 2);
        assert_eq!(config.llm.retry_delay_ms, 1000);
        assert_eq!(config.max_filtered_results, 4);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "search_api = \"google\"\nmax_filtered_results = 6").unwrap();

        let config = ResearchConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.search_api, SearchApi::Google);
        assert_eq!(config.max_filtered_results, 6);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = ResearchConfig::load(Some(Path::new("/nonexistent/deepsearch.toml")));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_overrides_win() {
        let overrides = ConfigOverrides {
            search_api: Some(SearchApi::Tavily),
            max_web_research_loops: Some(5),
            sites_search_restriction: Some(vec!["example.org".to_string()]),
            fetch_full_page: Some(false),
            ..Default::default()
        };
        let config = ResearchConfig::default().with_overrides(overrides).unwrap();
        assert_eq!(config.search_api, SearchApi::Tavily);
        assert_eq!(config.max_web_research_loops, 5);
        assert_eq!(config.sites_search_restriction, vec!["example.org"]);
        assert!(!config.fetch_full_page);
    }

    #[test]
    fn test_validation_rejects_zero_results() {
        let config = ResearchConfig {
            max_filtered_results: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validation_rejects_blank_site() {
        let config = ResearchConfig {
            sites_search_restriction: vec!["ok.org".to_string(), "  ".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[rstest]
    #[case("duckduckgo", SearchApi::DuckDuckGo)]
    #[case("DDG", SearchApi::DuckDuckGo)]
    #[case("google", SearchApi::Google)]
    #[case(" Tavily ", SearchApi::Tavily)]
    fn test_search_api_from_str(#[case] input: &str, #[case] expected: SearchApi) {
        assert_eq!(input.parse::<SearchApi>().unwrap(), expected);
    }

    #[test]
    fn test_search_api_round_trips_through_display() {
        for api in SearchApi::all() {
            assert_eq!(api.to_string().parse::<SearchApi>().unwrap(), api);
        }
        assert!("bing".parse::<SearchApi>().is_err());
    }

    #[test]
    fn test_llm_provider_defaults() {
        assert_eq!(
            LlmProvider::OpenRouter.default_api_key_env(),
            Some("OPENROUTER_API_KEY")
        );
        assert!(LlmProvider::Ollama.default_api_key_env().is_none());
        assert_eq!("lm-studio".parse::<LlmProvider>().unwrap(), LlmProvider::LmStudio);

        let config = ResearchConfig {
            llm_provider: LlmProvider::LmStudio,
            ..Default::default()
        };
        assert_eq!(config.llm_base_url(), "http://localhost:1234/v1");
        assert!(config.llm_api_key_env().is_none());
    }

    #[test]
    fn test_require_env_missing() {
        let config = ResearchConfig::default();
        let result = config.require_env("DEEPSEARCH_TEST_SURELY_UNSET_VAR");
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn test_to_toml_round_trip() {
        let config = ResearchConfig::default();
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("search_api = \"duckduckgo\""));
        let parsed: ResearchConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
