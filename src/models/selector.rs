//! Leakage-aware model selection.

use crate::error::SelectionError;
use tracing::{info, warn};

/// Anything carrying a variant name and a held-out score.
pub trait Scored {
    fn name(&self) -> &str;
    fn score(&self) -> f64;
}

/// Picks the best candidate after discarding implausibly perfect scores.
#[derive(Debug, Clone, Copy)]
pub struct ModelSelector {
    /// Scores at or above this are treated as label leakage.
    leakage_threshold: f64,
}

impl ModelSelector {
    pub const DEFAULT_LEAKAGE_THRESHOLD: f64 = 0.999;

    pub fn new(leakage_threshold: f64) -> Self {
        Self { leakage_threshold }
    }

    pub fn leakage_threshold(&self) -> f64 {
        self.leakage_threshold
    }

    /// Whether a held-out score may be selected: finite and below the
    /// leakage threshold.
    pub fn is_admissible(&self, score: f64) -> bool {
        !score.is_nan() && score < self.leakage_threshold
    }

    /// Return the strictly highest-scoring admissible candidate.
    ///
    /// Ties keep the earlier candidate. NaN scores are inadmissible.
    pub fn select<T: Scored>(&self, candidates: Vec<T>) -> Result<T, SelectionError> {
        let mut best: Option<T> = None;
        let mut rejected = Vec::new();

        for candidate in candidates {
            let score = candidate.score();
            if !self.is_admissible(score) {
                warn!(
                    model = candidate.name(),
                    score,
                    threshold = self.leakage_threshold,
                    "Candidate rejected as probable label leakage"
                );
                rejected.push((candidate.name().to_string(), score));
                continue;
            }

            if best.as_ref().map_or(true, |current| score > current.score()) {
                best = Some(candidate);
            }
        }

        match best {
            Some(winner) => {
                info!(model = winner.name(), score = winner.score(), "Model selected");
                Ok(winner)
            }
            None => Err(SelectionError {
                threshold: self.leakage_threshold,
                rejected,
            }),
        }
    }
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LEAKAGE_THRESHOLD)
    }
}
