//! Init command implementation
//!
//! Scaffolds a working directory for bankiq-rag: a commented `bankiq.toml`,
//! the filing and snapshot directories, and an `.env.example` for secrets.

use super::output::Output;
use crate::utils::toml_config::DEFAULT_CONFIG_FILE;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug, PartialEq, Eq)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// bankiq.toml already exists and --force was not given
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
    /// Embedding provider to configure (ollama or openai)
    pub provider: String,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing BankIQ retrieval");

    let base_path = &config.path;

    let config_path = base_path.join(DEFAULT_CONFIG_FILE);
    if config_path.exists() && !config.force {
        output.warning(&format!("{} already exists!", DEFAULT_CONFIG_FILE));
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    output.subheader("Creating directories");

    for dir in ["data", "data/sec_filings"] {
        let dir_path = base_path.join(dir);
        if dir_path.exists() {
            output.skipped(dir, "already exists");
            continue;
        }
        if let Err(e) = fs::create_dir_all(&dir_path) {
            output.error(&format!("Failed to create {}: {}", dir, e));
            return InitResult::Error(e.to_string());
        }
        output.created_dir(dir);
    }

    output.subheader("Creating configuration files");

    let toml_content = generate_config_toml(&config.provider);
    if let Err(e) = write_file(&config_path, &toml_content, config.force) {
        output.error(&format!("Failed to create {}: {}", DEFAULT_CONFIG_FILE, e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", DEFAULT_CONFIG_FILE);

    let env_example_path = base_path.join(".env.example");
    if let Err(e) = write_file(&env_example_path, generate_env_example(), config.force) {
        output.error(&format!("Failed to create .env.example: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("env", ".env.example");

    let gitignore_path = base_path.join(".gitignore");
    if !gitignore_path.exists() {
        if let Err(e) = write_file(&gitignore_path, generate_gitignore(), false) {
            output.warning(&format!("Failed to create .gitignore: {}", e));
        } else {
            output.created("file", ".gitignore");
        }
    }

    output.complete("Project initialized");

    output.header("Next Steps");
    output.newline();
    output.info("1. Place filings under data/sec_filings/<BANK>/<YEAR>/<FILING_TYPE>/*.txt");
    output.newline();

    if config.provider == "openai" {
        output.info("2. Set the embedding API key:");
        output.command("cp .env.example .env");
        output.command("# Edit .env and set EMBEDDING_API_KEY");
    } else {
        output.info("2. Start Ollama and pull the embedding model:");
        output.command("ollama serve");
        output.command("ollama pull nomic-embed-text");
    }
    output.newline();

    output.info("3. Build the index and query it:");
    output.command("bankiq-rag build");
    output.command("bankiq-rag search \"allowance for credit losses\" --bank ACME");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(()); // Skip existing files unless force is true
    }
    fs::write(path, content)
}

fn generate_config_toml(provider: &str) -> String {
    let embedding_section = if provider == "openai" {
        r#"# OpenAI-compatible embeddings (OpenAI, or a gateway fronting Titan V2)
[embedding]
provider = "openai"
model = "text-embedding-3-small"
api_base = "https://api.openai.com/v1"
api_key_env = "EMBEDDING_API_KEY"
dimensions = 1024
max_input_chars = 8000
timeout_secs = 30
"#
    } else {
        r#"# Ollama - local embeddings, no API key required
[embedding]
provider = "ollama"
model = "nomic-embed-text"
base_url = "http://localhost:11434"
max_input_chars = 8000
timeout_secs = 30
"#
    };

    format!(
        r#"# BankIQ retrieval configuration

[logging]
# RUST_LOG overrides this
level = "info"
# "pretty" or "json"
format = "pretty"

{embedding_section}
[source]
# <root>/<bank>/<year>/<filing_type>/*.txt
root = "./data/sec_filings"
min_year = 2023
extension = "txt"

[index]
# Remove to keep the index in memory only
snapshot_path = "./data/sec_filings_index.bqvx"
metric = "dot_product"
require_normalized = true

[chunking]
chunk_size = 4000
min_length = 1000
boundary_ratio = 0.7

[retrieval]
default_k = 5
overfetch_factor = 3
batch_size = 10
"#
    )
}

fn generate_env_example() -> &'static str {
    r#"# Embedding API key (OpenAI-compatible provider only)
EMBEDDING_API_KEY=

# Log filter, overrides [logging].level
# RUST_LOG=bankiq=debug,info
"#
}

fn generate_gitignore() -> &'static str {
    r#"# BankIQ generated files
/data/
*.bqvx
*.bqvx.tmp

# Environment
.env
.env.local

# Rust
/target/
"#
}
