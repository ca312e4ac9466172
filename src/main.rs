//! Fraud Model Pipeline - Main Entry Point
//!
//! `train` (default) merges new ledger rows and retrains the model.
//! `score <record.json>` scores one transaction with the saved artifact.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fraud_model_pipeline::{
    config::{AppConfig, LoggingConfig},
    ledger, ArtifactStore, OutcomePublisher, Pipeline, Scorer, TransactionRecord,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "fraud-model-pipeline", about = "Fraud model retraining and scoring")]
struct Cli {
    /// Configuration file (defaults to config/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Merge new ledger rows and retrain the model.
    Train,

    /// Score one transaction with the saved artifact.
    Score {
        /// JSON file holding a single transaction record.
        record: PathBuf,
    },
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => tracing_subscriber::EnvFilter::try_new(format!(
            "fraud_model_pipeline={}",
            config.level
        ))?,
    };

    if config.format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    init_logging(&config.logging)?;
    info!("Configuration loaded successfully");

    match cli.command.unwrap_or(Command::Train) {
        Command::Train => train(&config).await,
        Command::Score { record } => score(&config, &record).await,
    }
}

async fn train(config: &AppConfig) -> Result<()> {
    info!(
        consolidated = %config.data.consolidated_path.display(),
        ledger_enabled = config.ledger.enabled,
        leakage_threshold = config.training.leakage_threshold,
        "Starting retraining run"
    );

    let ledger = ledger::from_config(&config.ledger).context("Ledger is not configured")?;
    let report = Pipeline::from_config(config)
        .run(ledger.as_ref())
        .await
        .context("Retraining run failed")?;

    info!(
        model = %report.selected,
        score = report.score,
        rows = report.training_rows,
        features = report.feature_count,
        artifact_id = %report.artifact_id,
        "New artifact in place"
    );
    Ok(())
}

async fn score(config: &AppConfig, path: &Path) -> Result<()> {
    let raw = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let transaction: TransactionRecord =
        serde_json::from_slice(&raw).context("Record is not a valid transaction")?;

    let scorer = Scorer::from_store(&ArtifactStore::new(&config.artifacts.dir))?;
    let outcome = scorer.score(&transaction)?;

    if config.outcomes.enabled {
        match OutcomePublisher::connect(&config.outcomes.nats_url, &config.outcomes.subject).await {
            Ok(publisher) => publisher.report(&outcome).await,
            Err(e) => warn!(error = %e, "Outcome publisher unavailable, outcome not recorded"),
        }
    }

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
