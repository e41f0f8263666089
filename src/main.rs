//! # Datawise
//!
//! Loads the configured CSV datasets into SQLite stores, then answers each
//! question by letting a tool-calling LLM pick a dataset query or a web search.
//!
//! Usage:
//!   datawise                                  # Load datasets, run the example questions
//!   datawise "what is cancer"                 # Ask your own questions
//!   datawise --skip-load "SELECT ..."         # Reuse existing stores
//!   datawise --list-tools                     # Print tool descriptors and exit
//!   datawise --load-only                      # Load datasets and exit

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use datawise_agent::Agent;
use datawise_core::AppConfig;
use datawise_store::{LoadOutcome, LoadReport};
use datawise_tools::ToolRegistry;
use tracing_subscriber::EnvFilter;

const EXAMPLE_QUESTIONS: &[&str] = &[
    "SELECT * FROM cancer LIMIT 2;",
    "what is cancer",
    "SELECT AVG(age) FROM heart_disease;",
    "SELECT AVG(age) FROM diabetes;",
];

#[derive(Parser)]
#[command(
    name = "datawise",
    version,
    about = "Answer questions from tabular datasets or the web through a tool-calling LLM"
)]
struct Cli {
    /// Questions to answer (default: the built-in examples)
    questions: Vec<String>,

    /// Config file (default: ./datawise.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use existing stores instead of reloading the CSV files
    #[arg(long)]
    skip_load: bool,

    /// Print the tool descriptors as JSON and exit
    #[arg(long)]
    list_tools: bool,

    /// Load the datasets and exit
    #[arg(long, conflicts_with = "skip_load")]
    load_only: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Target prefixes match every `datawise_*` crate too.
    let filter = if cli.verbose { "datawise=debug" } else { "datawise=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    if cli.list_tools {
        let registry = ToolRegistry::from_config(&config, reqwest::Client::new());
        println!("{}", serde_json::to_string_pretty(&registry.list())?);
        return Ok(());
    }

    if !cli.load_only {
        config.llm.ensure_complete()?;
    }

    if !cli.skip_load {
        let datasets = config.datasets.clone();
        let reports = tokio::task::spawn_blocking(move || datawise_store::load_all(&datasets))
            .await
            .context("dataset load task failed")?;
        for report in &reports {
            print_load_report(report, cli.load_only);
        }
    }

    if cli.load_only {
        return Ok(());
    }

    let agent = Agent::from_config(&config).context("failed to initialise agent")?;

    let questions: Vec<String> = if cli.questions.is_empty() {
        EXAMPLE_QUESTIONS.iter().map(|q| q.to_string()).collect()
    } else {
        cli.questions
    };

    let rule = "=".repeat(50);
    for (i, question) in questions.iter().enumerate() {
        println!("\n{rule}");
        println!("Query {}: {}", i + 1, question);
        println!("{rule}");

        match agent.run(question).await {
            Ok(result) => println!("Result: {}", result.final_output),
            Err(e) => {
                tracing::error!(question = %question, error = %e, "question failed");
                println!("Error: {e}");
            }
        }
    }

    Ok(())
}

fn print_load_report(report: &LoadReport, verbose: bool) {
    match &report.outcome {
        LoadOutcome::Loaded {
            table,
            rows,
            columns,
        } => {
            if verbose {
                println!(
                    "Loaded {} -> {} (table '{}', {} rows, {} columns)",
                    report.source.display(),
                    report.store.display(),
                    table,
                    rows,
                    columns.len()
                );
            }
        }
        LoadOutcome::SkippedMissing => {
            println!("CSV not found: {}, skipping", report.source.display());
        }
        LoadOutcome::Failed(e) => {
            println!("Failed to load {}: {}", report.source.display(), e);
        }
    }
}
