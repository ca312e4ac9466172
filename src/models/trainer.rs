//! Fits the fixed roster on a stratified split and scores each member.

use crate::error::{PipelineError, Result};
use crate::feature_transformer::TrainingSet;
use crate::metrics::roc_auc;
use crate::models::selector::Scored;
use crate::models::split::stratified_split;
use crate::models::{Classifier, FittedModel, ModelVariant};
use ndarray::Axis;
use std::time::{Duration, Instant};
use tracing::info;

/// A fitted roster member with its held-out ROC-AUC.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub variant: ModelVariant,
    pub score: f64,
    pub model: FittedModel,
    pub fit_time: Duration,
}

impl Scored for Candidate {
    fn name(&self) -> &str {
        self.variant.name()
    }

    fn score(&self) -> f64 {
        self.score
    }
}

/// Trains every [`ModelVariant::ROSTER`] member. Chooses nothing.
#[derive(Debug, Clone)]
pub struct CandidateTrainer {
    test_ratio: f64,
    seed: u64,
}

impl CandidateTrainer {
    pub const DEFAULT_TEST_RATIO: f64 = 0.2;
    pub const DEFAULT_SEED: u64 = 42;

    pub fn new(test_ratio: f64, seed: u64) -> Self {
        Self { test_ratio, seed }
    }

    /// Fit each variant on the training partition and score it on the test
    /// partition. Candidates come back in roster order.
    pub fn train(&self, data: &TrainingSet) -> Result<Vec<Candidate>> {
        if data.features.nrows() != data.labels.len() {
            return Err(PipelineError::configuration(format!(
                "feature matrix has {} rows but {} labels",
                data.features.nrows(),
                data.labels.len()
            )));
        }

        let split = stratified_split(data.labels.view(), self.test_ratio, self.seed)?;
        let x_train = data.features.select(Axis(0), &split.train);
        let y_train = data.labels.select(Axis(0), &split.train);
        let x_test = data.features.select(Axis(0), &split.test);
        let y_test: Vec<u8> = split.test.iter().map(|&i| data.labels[i]).collect();

        info!(
            train_rows = split.train.len(),
            test_rows = split.test.len(),
            features = data.features.ncols(),
            "Training candidate roster"
        );

        let mut candidates = Vec::with_capacity(ModelVariant::ROSTER.len());
        for variant in ModelVariant::ROSTER {
            let started = Instant::now();
            let model = variant.fit(x_train.view(), y_train.view(), self.seed);
            let fit_time = started.elapsed();

            let probabilities = model.predict_proba(x_test.view()).to_vec();
            let score = roc_auc(&y_test, &probabilities).ok_or_else(|| {
                PipelineError::configuration("test partition lacks one of the label classes")
            })?;

            info!(
                model = variant.name(),
                auc = score,
                fit_ms = fit_time.as_millis() as u64,
                "Candidate scored"
            );
            candidates.push(Candidate {
                variant,
                score,
                model,
                fit_time,
            });
        }

        Ok(candidates)
    }
}

impl Default for CandidateTrainer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TEST_RATIO, Self::DEFAULT_SEED)
    }
}
