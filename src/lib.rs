//! Fraud Model Pipeline Library
//!
//! Periodic retraining for transaction fraud scoring: merges newly labeled
//! ledger rows into the training set, fits a frozen feature encoding, trains
//! a fixed roster of classifiers and keeps the best one that does not look
//! like label leakage.

pub mod artifacts;
pub mod config;
pub mod dataset;
pub mod error;
pub mod feature_transformer;
pub mod ledger;
pub mod merger;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod producer;
pub mod scoring;
pub mod synthetic;
pub mod types;

pub use artifacts::{ArtifactStore, ModelBundle};
pub use config::AppConfig;
pub use dataset::Dataset;
pub use error::{PipelineError, Result, ScoringError};
pub use feature_transformer::{FeatureSchema, FeatureTransformer};
pub use ledger::{HttpLedger, Ledger, OfflineLedger};
pub use merger::{DataMerger, MergeOutcome};
pub use pipeline::{Pipeline, RunReport};
pub use producer::OutcomePublisher;
pub use scoring::Scorer;
pub use types::{Record, ScoreOutcome, TransactionRecord, Verdict};
