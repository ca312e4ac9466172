//! Candidate classifiers, training and selection

pub mod boosting;
pub mod forest;
pub mod logistic;
pub mod selector;
pub mod split;
pub mod trainer;
pub mod tree;

pub use boosting::{GradientBoosting, GRADIENT_BOOSTING};
pub use forest::{RandomForest, RANDOM_FOREST};
pub use logistic::{LogisticRegression, LOGISTIC};
pub use selector::{ModelSelector, Scored};
pub use split::{stratified_split, Split};
pub use trainer::{Candidate, CandidateTrainer};

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary classifier producing class-1 probabilities.
pub trait Classifier {
    fn predict_proba_row(&self, row: ArrayView1<f64>) -> f64;

    fn predict_proba(&self, x: ArrayView2<f64>) -> Array1<f64> {
        x.rows()
            .into_iter()
            .map(|row| self.predict_proba_row(row))
            .collect()
    }
}

/// The fixed roster. Order is the selection tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    Logistic,
    RandomForest,
    GradientBoosting,
}

impl ModelVariant {
    pub const ROSTER: [ModelVariant; 3] = [
        ModelVariant::Logistic,
        ModelVariant::RandomForest,
        ModelVariant::GradientBoosting,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModelVariant::Logistic => "logistic",
            ModelVariant::RandomForest => "random_forest",
            ModelVariant::GradientBoosting => "gradient_boosting",
        }
    }

    /// Fit this variant with its fixed configuration.
    pub fn fit(self, x: ArrayView2<f64>, y: ArrayView1<u8>, seed: u64) -> FittedModel {
        match self {
            ModelVariant::Logistic => FittedModel::Logistic(LogisticRegression::fit(&LOGISTIC, x, y)),
            ModelVariant::RandomForest => {
                FittedModel::RandomForest(RandomForest::fit(&RANDOM_FOREST, x, y, seed))
            }
            ModelVariant::GradientBoosting => {
                FittedModel::GradientBoosting(GradientBoosting::fit(&GRADIENT_BOOSTING, x, y, seed))
            }
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A trained roster member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedModel {
    Logistic(LogisticRegression),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
}

impl FittedModel {
    pub fn variant(&self) -> ModelVariant {
        match self {
            FittedModel::Logistic(_) => ModelVariant::Logistic,
            FittedModel::RandomForest(_) => ModelVariant::RandomForest,
            FittedModel::GradientBoosting(_) => ModelVariant::GradientBoosting,
        }
    }
}

impl Classifier for FittedModel {
    fn predict_proba_row(&self, row: ArrayView1<f64>) -> f64 {
        match self {
            FittedModel::Logistic(m) => m.predict_proba_row(row),
            FittedModel::RandomForest(m) => m.predict_proba_row(row),
            FittedModel::GradientBoosting(m) => m.predict_proba_row(row),
        }
    }
}
