//! CLI module for deepsearch
//!
//! Provides command-line interface parsing for the `deepsearch` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use crate::utils::config::{ConfigOverrides, LlmProvider, SearchApi};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// deepsearch - iterative web research with cited answers
///
/// Generates search queries, searches the web, ranks and reads the results,
/// and writes a summary with numbered references over a bounded number of
/// research loops.
#[derive(Parser, Debug)]
#[command(
    name = "deepsearch",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "deepsearch - iterative web research with cited answers",
    long_about = "Runs bounded research loops: query generation, web search, ranking,\n\
                  summarization with [n] citations and reflection on knowledge gaps.\n\n\
                  Configuration is read from deepsearch.toml, DEEPSEARCH_* environment\n\
                  variables and the flags below, in increasing precedence.",
    after_help = "EXAMPLES:\n    \
                  deepsearch research \"latest EU AI act updates\"\n    \
                  deepsearch --search-api tavily --loops 1 research \"rust 2024 edition\"\n    \
                  deepsearch --site europa.eu research \"AI act timeline\"\n    \
                  deepsearch chat                  # Multi-turn research session\n    \
                  deepsearch init                  # Write deepsearch.toml and .env.example"
)]
pub struct Cli {
    /// Path to the configuration file (defaults to ./deepsearch.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    /// Search backend (duckduckgo, google, tavily)
    #[arg(long, global = true)]
    pub search_api: Option<SearchApi>,

    /// Restrict search to this domain (repeatable)
    #[arg(long = "site", global = true)]
    pub sites: Vec<String>,

    /// Maximum research loops after the first pass
    #[arg(long, global = true)]
    pub loops: Option<usize>,

    /// Model name passed to the LLM provider
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// LLM provider (openrouter, lmstudio, ollama)
    #[arg(long, global = true)]
    pub provider: Option<LlmProvider>,

    /// Rank on search snippets only, without fetching pages
    #[arg(long, global = true)]
    pub no_fetch: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a single question and print the cited answer
    Research {
        /// The question to research
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Also write the answer to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the full result (answer, sources, suggestions) as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive multi-turn research session
    ///
    /// Each question is reformulated against the previous turns before
    /// researching. Type `exit` or `quit` (or send EOF) to leave.
    Chat,

    /// Show the resolved configuration
    Config {
        /// Only validate the configuration, do not print it
        #[arg(long)]
        validate: bool,
    },

    /// Write a starter deepsearch.toml and .env.example
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
}

/// Log line format for the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

impl Cli {
    /// Collect the flags that override file and environment configuration
    pub fn to_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            search_api: self.search_api,
            sites_search_restriction: (!self.sites.is_empty()).then(|| self.sites.clone()),
            max_web_research_loops: self.loops,
            model_name: self.model.clone(),
            llm_provider: self.provider,
            fetch_full_page: self.no_fetch.then_some(false),
            ..Default::default()
        }
    }
}
