use anyhow::{bail, Context, Result};
use bankiq::cli::init::{self, InitConfig, InitResult};
use bankiq::cli::output::Output;
use bankiq::cli::{Cli, Commands};
use bankiq::utils::toml_config::{BankIqConfig, ConfigError, LogFormat, LoggingConfig};
use bankiq::Retriever;
use std::io;
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        Commands::Init {
            path,
            force,
            provider,
        } => {
            let config = InitConfig {
                path,
                force,
                provider,
            };
            match init::run(config, &output) {
                InitResult::Success => Ok(()),
                InitResult::AlreadyExists => bail!("configuration already exists"),
                InitResult::Error(e) => bail!("init failed: {}", e),
            }
        }

        Commands::Config { validate } => show_config(&cli.config, validate, &output),

        Commands::Build => {
            let config = load_config(&cli.config, &output)?;
            init_tracing(&config.logging, cli.verbose);
            build(&config, &output).await
        }

        Commands::Search {
            query,
            bank,
            k,
            json,
        } => {
            let config = load_config(&cli.config, &output)?;
            init_tracing(&config.logging, cli.verbose);
            search(&config, &query, bank.as_deref(), k, json, &output).await
        }
    }
}

/// Load the config file, falling back to defaults when it does not exist.
fn load_config(path: &Path, output: &Output) -> Result<BankIqConfig> {
    match BankIqConfig::load(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            output.warning(&format!(
                "{} not found, using defaults (run `bankiq-rag init` to create one)",
                path.display()
            ));
            let config = BankIqConfig::default();
            config.validate()?;
            Ok(config)
        }
        Err(e) => Err(e).with_context(|| format!("invalid configuration in {}", path.display())),
    }
}

fn init_tracing(config: &LoggingConfig, verbose: bool) {
    let default_directive = if verbose {
        "bankiq=debug,bankiq_vector=debug,info"
    } else {
        config.level.as_str()
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    // Logs go to stderr so `search --json` output stays machine-readable
    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_current_span(true)
                    .with_target(true),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .init(),
    }
}

fn show_config(path: &Path, validate: bool, output: &Output) -> Result<()> {
    if validate {
        return match BankIqConfig::load(path) {
            Ok(_) => {
                output.success(&format!("{} is valid", path.display()));
                Ok(())
            }
            Err(e) => {
                output.error(&e.to_string());
                bail!("configuration is invalid")
            }
        };
    }

    let config = load_config(path, output)?;
    output.header("Effective configuration");
    output.kv("file", &path.display().to_string());
    output.newline();
    println!("{}", config.to_toml()?);
    Ok(())
}

async fn build(config: &BankIqConfig, output: &Output) -> Result<()> {
    output.header("Building filing index");
    output.kv("source", &config.source.root.display().to_string());
    output.kv("model", &config.embedding.model);
    match config.index.snapshot_path {
        Some(ref path) => output.kv("snapshot", &path.display().to_string()),
        None => output.kv("snapshot", "disabled"),
    }

    let retriever = Retriever::from_config(config)?;
    if !retriever.rebuild().await {
        output.error(&retriever.status().to_string());
        bail!("index build failed");
    }

    output.success(&format!("Index {}", retriever.status()));
    Ok(())
}

async fn search(
    config: &BankIqConfig,
    query: &str,
    bank: Option<&str>,
    k: Option<usize>,
    json: bool,
    output: &Output,
) -> Result<()> {
    let retriever = Retriever::from_config(config)?;
    if !retriever.initialize().await {
        output.error(&retriever.status().to_string());
        bail!("retrieval unavailable");
    }

    let k = k.unwrap_or(retriever.settings().default_k);
    let results = retriever.search(query, bank, k).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    output.header(&format!("Results for \"{}\"", query));
    if results.is_empty() {
        output.info("No matching excerpts");
        return Ok(());
    }
    for (rank, result) in results.iter().enumerate() {
        let meta = &result.metadata;
        let source = format!(
            "{} {} {} {}#{}",
            meta.bank, meta.year, meta.filing_type, meta.file, meta.chunk_id
        );
        output.excerpt(rank + 1, result.score, &source, &result.content);
    }
    Ok(())
}
