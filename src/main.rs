//! deepsearch CLI Entry Point
//!
//! Subcommands:
//! - `deepsearch research <question>` - Research one question and print the cited answer
//! - `deepsearch chat` - Multi-turn research session on stdin
//! - `deepsearch config` - Show or validate the resolved configuration
//! - `deepsearch init` - Write a starter deepsearch.toml and .env.example

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use deepsearch::cli::init::{self, InitConfig, InitResult};
use deepsearch::cli::output::{Output, is_exit_command};
use deepsearch::cli::{Cli, Commands, LogFormat};
use deepsearch::{ResearchConfig, ResearchSession};
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    if let Err(e) = init_tracing(cli.log_format, cli.verbose) {
        output.warning(&e.to_string());
    }

    if let Err(e) = run(cli, &output).await {
        output.error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Logs always go to stderr; `RUST_LOG` wins over the verbosity flag.
fn init_tracing(format: LogFormat, verbose: bool) -> Result<()> {
    let default_filter = if verbose {
        "deepsearch=debug"
    } else {
        "deepsearch=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    }
    .map_err(|e| anyhow!("failed to initialize tracing subscriber: {e}"))
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    if let Commands::Init { path, force } = &cli.command {
        return match init::run(
            InitConfig {
                path: path.clone(),
                force: *force,
            },
            output,
        ) {
            InitResult::Success | InitResult::AlreadyExists => Ok(()),
            InitResult::Error(e) => Err(anyhow!("init failed: {}", e)),
        };
    }

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Research {
            query,
            output: save_to,
            json,
        } => run_research(config, &query.join(" "), save_to.as_deref(), json, output).await,
        Commands::Chat => run_chat(config, output).await,
        Commands::Config { validate } => run_config(&config, validate, output),
        Commands::Init { .. } => Ok(()),
    }
}

fn load_config(cli: &Cli) -> Result<ResearchConfig> {
    let config = ResearchConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?
        .with_overrides(cli.to_overrides())
        .context("invalid command-line override")?;
    Ok(config)
}

async fn run_research(
    config: ResearchConfig,
    query: &str,
    save_to: Option<&Path>,
    json: bool,
    output: &Output,
) -> Result<()> {
    output.info(&format!(
        "Researching with {} on {} ({} loops max)",
        config.model_name,
        config.search_api,
        config.max_web_research_loops + 1
    ));

    let mut session = ResearchSession::from_config(config)?;
    let result = session.invoke(query).await?;

    let rendered = if json {
        serde_json::to_string_pretty(&result).context("failed to serialize research output")?
    } else {
        result.running_summary.clone()
    };
    output.answer(&rendered);

    if let Some(path) = save_to {
        std::fs::write(path, &rendered)
            .with_context(|| format!("failed to write {}", path.display()))?;
        output.success(&format!("Saved to {}", path.display()));
    }
    Ok(())
}

async fn run_chat(config: ResearchConfig, output: &Output) -> Result<()> {
    output.banner();
    output.hint("Ask a question; type `exit` or `quit` to leave.");

    let mut session = ResearchSession::from_config(config)?;

    while let Some(line) = output.prompt() {
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit_command(question) {
            break;
        }

        match session.invoke(question).await {
            Ok(result) => {
                output.newline();
                output.answer(&result.running_summary);
                output.newline();
            }
            // The conversation is unchanged after a failed turn; keep going
            Err(e) => output.error(&e.to_string()),
        }
    }

    output.info(&format!("Session ended after {} turns", session.turns()));
    Ok(())
}

fn run_config(config: &ResearchConfig, validate: bool, output: &Output) -> Result<()> {
    if validate {
        output.success("Configuration is valid");
        return Ok(());
    }

    output.header("Resolved configuration");
    output.kv("LLM endpoint", &config.llm_base_url());
    if let Some(env) = config.llm_api_key_env() {
        let status = if config.resolve_env(&env).is_some() {
            "set"
        } else {
            "missing"
        };
        output.kv(&env, status);
    }
    output.newline();

    output.answer(&config.to_toml()?);
    Ok(())
}
