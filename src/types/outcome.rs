//! Scoring outcome reported to the audit sink

use crate::types::transaction::TransactionRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Binary decision derived from the fraud probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Legitimate,
    Fraud,
}

impl Verdict {
    /// Probability at or above which a transaction is flagged
    pub const DECISION_THRESHOLD: f64 = 0.5;

    pub fn from_probability(probability: f64) -> Self {
        if probability >= Self::DECISION_THRESHOLD {
            Verdict::Fraud
        } else {
            Verdict::Legitimate
        }
    }

    /// Numeric label as used in the training data
    pub fn as_label(self) -> u8 {
        match self {
            Verdict::Legitimate => 0,
            Verdict::Fraud => 1,
        }
    }
}

/// One scored transaction, as appended to the external ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreOutcome {
    /// Unique outcome identifier
    pub outcome_id: String,

    /// Scored transaction (label-free)
    pub transaction: TransactionRecord,

    /// Decision at the default threshold
    pub verdict: Verdict,

    /// Predicted probability of fraud (0.0 - 1.0)
    pub probability: f64,

    /// Roster variant that produced the score
    pub model_name: String,

    /// Artifact identifier the scorer was loaded from
    pub model_version: String,

    /// Scoring timestamp
    pub timestamp: DateTime<Utc>,
}

impl ScoreOutcome {
    /// Create a new outcome
    pub fn new(transaction: TransactionRecord, probability: f64) -> Self {
        Self {
            outcome_id: uuid::Uuid::new_v4().to_string(),
            transaction,
            verdict: Verdict::from_probability(probability),
            probability,
            model_name: String::new(),
            model_version: String::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach model provenance
    pub fn with_model(mut self, model_name: impl Into<String>, model_version: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self.model_version = model_version.into();
        self
    }
}
