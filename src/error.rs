//! Error types for the retraining pipeline.
//!
//! Fatal conditions abort a run before anything is persisted. Ledger
//! failures are the one recoverable kind and are handled inside
//! [`DataMerger`](crate::merger::DataMerger).

use std::collections::BTreeSet;
use std::path::PathBuf;

/// Top-level pipeline error.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Missing credentials, missing required columns, unusable labels.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Feature encoding failed.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Every candidate was rejected by the leakage filter.
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// Dataset file could not be read or written.
    #[error("Dataset error at {path}: {source}")]
    Dataset {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Artifact (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Convenience alias for `std::result::Result<T, PipelineError>`.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Raised when a record does not match the fitted feature space.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("record is missing fitted fields: {0:?}")]
    MissingFields(BTreeSet<String>),

    #[error("record has fields unknown at fit time: {0:?}")]
    UnexpectedFields(BTreeSet<String>),

    #[error("field '{field}' has non-numeric value '{value}'")]
    InvalidNumber { field: String, value: String },

    #[error("feature vector length {actual} does not match fitted width {expected}")]
    WidthMismatch { expected: usize, actual: usize },
}

/// All candidates scored at or above the leakage threshold.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("all {} candidates rejected as probable label leakage (threshold {threshold}): {rejected:?}", .rejected.len())]
pub struct SelectionError {
    pub threshold: f64,
    /// (variant name, score) of every rejected candidate, in roster order.
    pub rejected: Vec<(String, f64)>,
}

/// Ledger access failure.
#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    /// Fatal: the pipeline cannot authenticate against the ledger.
    #[error("ledger credentials not found in environment variable {0}")]
    MissingCredentials(String),

    /// Fatal: the ledger refused the configured token (HTTP 401 or 403).
    #[error("ledger rejected credentials (HTTP {0})")]
    Rejected(u16),

    #[error("ledger request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("ledger request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ledger returned an unexpected payload: {0}")]
    Payload(String),
}

impl LedgerError {
    /// Only credential problems abort the run; everything else degrades.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LedgerError::MissingCredentials(_) | LedgerError::Rejected(_)
        )
    }
}

/// Errors surfaced to the scoring collaborator, kept distinct so callers can
/// render each kind differently.
#[derive(thiserror::Error, Debug)]
pub enum ScoringError {
    #[error("scorer is not configured: {0}")]
    Configuration(String),

    #[error("invalid transaction: {0}")]
    Transform(#[from] TransformError),

    #[error("model failure: {0}")]
    Model(String),
}

impl From<PipelineError> for ScoringError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Transform(e) => ScoringError::Transform(e),
            PipelineError::Configuration(msg) => ScoringError::Configuration(msg),
            other => ScoringError::Configuration(other.to_string()),
        }
    }
}
