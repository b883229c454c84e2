//! CLI module for BankIQ retrieval
//!
//! Command-line parsing for the bankiq-rag binary. Uses clap for argument
//! parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// BankIQ retrieval - SEC filing excerpts for peer analytics
///
/// Builds an embedding index over a directory of SEC filings and answers
/// bank-filtered similarity queries against it.
#[derive(Parser, Debug)]
#[command(
    name = "bankiq-rag",
    version,
    about = "BankIQ retrieval - SEC filing excerpts for peer analytics",
    long_about = "Builds an embedding index over SEC filings laid out as\n\
                  <root>/<bank>/<year>/<filing_type>/*.txt and answers similarity\n\
                  queries, optionally restricted to one bank.",
    after_help = "EXAMPLES:\n    \
                  bankiq-rag init                              # Write a default bankiq.toml\n    \
                  bankiq-rag build                             # Rebuild the index from filings\n    \
                  bankiq-rag search \"credit risk\" --bank ACME  # Query one bank's filings\n    \
                  bankiq-rag --config prod.toml config --validate"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "bankiq.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default bankiq.toml and data directories
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// Embedding provider to configure (ollama or openai)
        #[arg(long, default_value = "ollama")]
        provider: String,
    },

    /// Show the effective configuration
    Config {
        /// Only validate, exit non-zero on error
        #[arg(long)]
        validate: bool,
    },

    /// Rebuild the index from the filing source and save a snapshot
    Build,

    /// Search the index (loading the snapshot or building it first)
    Search {
        /// Natural-language question
        query: String,

        /// Only return excerpts whose bank name contains this text
        #[arg(short, long)]
        bank: Option<String>,

        /// Number of results (defaults to retrieval.default_k)
        #[arg(short)]
        k: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
