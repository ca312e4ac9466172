//! Configuration management for the retraining pipeline

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub ledger: LedgerConfig,
    pub training: TrainingConfig,
    pub artifacts: ArtifactsConfig,
    pub outcomes: OutcomesConfig,
    pub logging: LoggingConfig,
}

/// Dataset locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Accumulated training data, rewritten by each merge
    pub consolidated_path: PathBuf,
    /// Baseline data used only before the first merge
    pub seed_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            consolidated_path: PathBuf::from("data/processed/training_data.csv"),
            seed_path: PathBuf::from("data/raw/transactions.csv"),
        }
    }
}

/// External ledger of newly labeled rows
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// When false, runs train on the stored dataset only
    pub enabled: bool,
    /// Endpoint returning a JSON array of row objects
    pub url: String,
    /// Environment variable holding the bearer token
    pub token_env: String,
    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,
    /// Extra attempts after the first failure
    pub retries: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://localhost:8080/ledger/rows".to_string(),
            token_env: "LEDGER_API_TOKEN".to_string(),
            timeout_secs: 10,
            retries: 1,
        }
    }
}

/// Split and selection parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Held-out share of each class
    pub test_ratio: f64,
    /// Seed for the split and every stochastic model
    pub seed: u64,
    /// Held-out scores at or above this are discarded as leakage
    pub leakage_threshold: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
            leakage_threshold: 0.999,
        }
    }
}

/// Artifact storage
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Directory holding the bundle and vocabulary snapshot
    pub dir: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("models"),
        }
    }
}

/// Score outcome publication
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutcomesConfig {
    pub enabled: bool,
    /// NATS server URL
    pub nats_url: String,
    /// Subject for published outcomes
    pub subject: String,
}

impl Default for OutcomesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            nats_url: "nats://localhost:4222".to_string(),
            subject: "fraud.outcomes".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    pub const DEFAULT_PATH: &'static str = "config/config.toml";

    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path(Self::DEFAULT_PATH)
    }

    /// Load configuration from a specific path, then apply `PIPELINE__*`
    /// environment overrides (e.g. `PIPELINE__LEDGER__ENABLED=true`).
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("PIPELINE").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
