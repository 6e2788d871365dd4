//! docqa - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

use docqa::{
    bootstrap::{BootstrapStatus, HealthCheck, EXIT_CODE_SETUP_NEEDED},
    cli::{Args, Commands, Verbosity},
    completion::RetryManager,
    config::Config,
    embedding::OllamaEmbedder,
    ingest::{Chunker, Ingestor},
    rag::{retrieval::validate_question, QaPipeline},
    repl::{display::render_answer, ReplSession},
    store::open_store,
    telemetry::init_logging,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if let Err(message) = args.validate() {
        eprintln!("{} {}", "Error:".red().bold(), message);
        std::process::exit(1);
    }

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply_overrides(&mut config);
    config.validate()?;

    let default_verbosity =
        Verbosity::parse(&config.telemetry.default_verbosity).unwrap_or(Verbosity::Normal);
    let verbosity = args.verbosity(default_verbosity);
    init_logging(verbosity);

    match &args.command {
        Some(Commands::Start) => run_repl(&config, verbosity).await?,
        Some(Commands::Ingest { paths, reset }) => {
            run_ingest(&config, paths, *reset, verbosity).await?
        }
        Some(Commands::Status) => show_status(&config).await?,
        Some(Commands::Config) => show_config(&config, &args)?,
        None => match &args.question {
            Some(question) => ask_once(&config, question, verbosity).await?,
            None => show_usage(),
        },
    }

    Ok(())
}

/// Exit with setup instructions unless Ollama and both models are ready
async fn ensure_ready(config: &Config) -> Result<()> {
    let health = HealthCheck::new(&config.ollama_url())?;
    match health.check_config(config).await? {
        BootstrapStatus::Ready => Ok(()),
        BootstrapStatus::OllamaNotRunning => {
            HealthCheck::show_ollama_install_instructions();
            std::process::exit(EXIT_CODE_SETUP_NEEDED);
        }
        BootstrapStatus::ModelNotAvailable(model) => {
            HealthCheck::show_model_pull_instructions(&model);
            std::process::exit(EXIT_CODE_SETUP_NEEDED);
        }
    }
}

fn spinner(message: &str, verbosity: Verbosity) -> ProgressBar {
    if !verbosity.show_progress() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

async fn ask_once(config: &Config, question: &str, verbosity: Verbosity) -> Result<()> {
    // reject before the health check touches the network
    if let Err(e) = validate_question(question) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
    ensure_ready(config).await?;
    let pipeline = QaPipeline::from_config(config).await?;

    let pb = spinner("Searching documents...", verbosity);
    let result = pipeline.ask(question).await;
    pb.finish_and_clear();

    match result {
        Ok(answer) => {
            println!("{}", render_answer(&answer));
            if verbosity.show_details() {
                eprintln!("{}", answer.timings.to_string().dimmed());
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn run_repl(config: &Config, verbosity: Verbosity) -> Result<()> {
    ensure_ready(config).await?;
    let pipeline = QaPipeline::from_config(config).await?;

    let mut session = match config.history_path() {
        Some(path) => ReplSession::with_history(path, verbosity)?,
        None => ReplSession::new(verbosity)?,
    };
    session.run(&pipeline, VERSION).await
}

async fn run_ingest(
    config: &Config,
    paths: &[std::path::PathBuf],
    reset: bool,
    verbosity: Verbosity,
) -> Result<()> {
    ensure_ready(config).await?;

    let timeout = Duration::from_secs(config.ollama.request_timeout_secs);
    let embedder = OllamaEmbedder::new(&config.ollama_url(), &config.ollama.embedding_model, timeout)?
        .with_retry(RetryManager::from_config(&config.retry));
    let store = open_store(config).await?;

    if reset {
        store.clear().await?;
        println!("{} Cleared document store", "✓".green());
    }

    let ingestor = Ingestor::new(
        Arc::new(embedder),
        store.clone(),
        Chunker::from_config(&config.ingest)?,
        config.ingest.batch_size,
    );

    let pb = spinner("Ingesting documents...", verbosity);
    let result = ingestor.ingest_paths(paths).await;
    pb.finish_and_clear();
    let documents = result?;

    for doc in &documents {
        println!("{} {} ({} chunks)", "✓".green(), doc.source_identifier, doc.chunks);
    }
    let total: usize = documents.iter().map(|d| d.chunks).sum();
    println!(
        "\nIngested {} documents, {} chunks. Store now holds {} chunks.",
        documents.len(),
        total,
        store.count().await?
    );

    Ok(())
}

async fn show_status(config: &Config) -> Result<()> {
    println!("\n{}", "docqa Status".bold().cyan());
    println!("{}", "=".repeat(60).cyan());

    let health = HealthCheck::new(&config.ollama_url())?;
    let status = health.check_config(config).await?;
    let ollama = match &status {
        BootstrapStatus::Ready => "ready".green(),
        BootstrapStatus::OllamaNotRunning => "not running".red(),
        BootstrapStatus::ModelNotAvailable(model) => format!("model '{}' not pulled", model).yellow(),
    };
    println!("  Ollama ({}):  {}", config.ollama_url(), ollama);
    println!("  Completion model:   {}", config.ollama.completion_model);
    println!("  Embedding model:    {}", config.ollama.embedding_model);

    match open_store(config).await {
        Ok(store) => {
            let count = store.count().await?;
            let spec = store
                .embedding_spec()
                .await?
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("  Store ({:?}):   {} chunks, built with {}", config.store.backend, count, spec);
        }
        Err(e) => println!("  Store ({:?}):   {}", config.store.backend, e.to_string().red()),
    }
    println!();

    Ok(())
}

fn show_config(config: &Config, args: &Args) -> Result<()> {
    let source = args
        .config
        .clone()
        .or_else(Config::default_path)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());

    println!("# docqa configuration ({})", source);
    println!("{}", toml::to_string_pretty(config).context("Failed to render configuration")?);
    Ok(())
}

fn show_usage() {
    println!("docqa v{} - Document Question Answering", VERSION);
    println!("\nUsage:");
    println!("  docqa <question>              Answer one question");
    println!("  docqa start                   Interactive question loop");
    println!("  docqa ingest <paths>...       Add text documents to the store");
    println!("  docqa status                  Check Ollama and the store");
    println!("  docqa config                  Show configuration");
    println!("\nExample:");
    println!("  docqa \"What is the total on the March invoice?\"");
    println!();
}
