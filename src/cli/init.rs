//! Init command implementation
//!
//! Writes a starter `deepsearch.toml` holding every option at its default,
//! plus an `.env.example` listing the API keys the backends read.

use super::output::Output;
use crate::utils::config::{DEFAULT_CONFIG_FILE, ResearchConfig};
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// deepsearch.toml already exists
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing deepsearch");

    let base_path = &config.path;
    if !base_path.exists() {
        if let Err(e) = fs::create_dir_all(base_path) {
            output.error(&format!("Failed to create {}: {}", base_path.display(), e));
            return InitResult::Error(e.to_string());
        }
    }

    let config_path = base_path.join(DEFAULT_CONFIG_FILE);
    if config_path.exists() && !config.force {
        output.warning(&format!("{} already exists!", DEFAULT_CONFIG_FILE));
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    let toml_content = match generate_config_toml() {
        Ok(content) => content,
        Err(e) => {
            output.error(&format!("Failed to render configuration: {}", e));
            return InitResult::Error(e);
        }
    };
    if let Err(e) = write_file(&config_path, &toml_content, config.force) {
        output.error(&format!("Failed to create {}: {}", DEFAULT_CONFIG_FILE, e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", DEFAULT_CONFIG_FILE);

    let env_example_path = base_path.join(".env.example");
    if env_example_path.exists() && !config.force {
        output.skipped(".env.example", "already exists");
    } else if let Err(e) = write_file(&env_example_path, &generate_env_example(), config.force) {
        output.error(&format!("Failed to create .env.example: {}", e));
        return InitResult::Error(e.to_string());
    } else {
        output.created("env", ".env.example");
    }

    output.complete("deepsearch initialized successfully!");

    output.header("Next Steps");
    output.info("1. Set up environment variables:");
    output.command("cp .env.example .env");
    output.command("# Edit .env and set OPENROUTER_API_KEY (and TAVILY_API_KEY for Tavily)");
    output.info("2. Run a research question:");
    output.command("deepsearch research \"your question\"");
    output.hint(&format!(
        "Edit {} to change the search backend, depth or model",
        DEFAULT_CONFIG_FILE
    ));

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

fn generate_config_toml() -> Result<String, String> {
    let body = ResearchConfig::default()
        .to_toml()
        .map_err(|e| e.to_string())?;
    Ok(format!(
        "# deepsearch configuration\n\
         # Every key can also be set as DEEPSEARCH_<KEY> (nested keys use __,\n\
         # e.g. DEEPSEARCH_LLM__TEMPERATURE). Command-line flags win over both.\n\
         # search_api: duckduckgo | google | tavily\n\
         # llm_provider: openrouter | lmstudio | ollama\n\n{}",
        body
    ))
}

fn generate_env_example() -> String {
    r#"# deepsearch Environment Variables
# Copy this file to .env and fill in the values.

# OpenRouter API key (required with llm_provider = "openrouter")
OPENROUTER_API_KEY=

# Tavily API key (required with search_api = "tavily")
# TAVILY_API_KEY=

# Optional: Logging level (trace, debug, info, warn, error)
RUST_LOG=deepsearch=info
"#
    .to_string()
}
