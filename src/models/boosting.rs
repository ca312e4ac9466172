//! Gradient-boosted trees on logistic loss.

use crate::models::logistic::sigmoid;
use crate::models::tree::{BinnedMatrix, FeatureSampling, Newton, Stats, Tree, TreeGrower, MAX_BINS};
use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fixed hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostingConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Fraction of rows drawn (without replacement) per tree.
    pub subsample: f64,
    /// Fraction of features drawn per tree.
    pub colsample_bytree: f64,
    /// L2 penalty on leaf weights.
    pub lambda: f64,
    pub min_child_weight: f64,
}

pub const GRADIENT_BOOSTING: BoostingConfig = BoostingConfig {
    n_estimators: 300,
    max_depth: 6,
    learning_rate: 0.05,
    subsample: 0.8,
    colsample_bytree: 0.8,
    lambda: 1.0,
    min_child_weight: 1.0,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    /// Starting log-odds: the training prior.
    base_margin: f64,
    trees: Vec<Tree>,
}

impl GradientBoosting {
    pub fn fit(config: &BoostingConfig, x: ArrayView2<f64>, y: ArrayView1<u8>, seed: u64) -> Self {
        let n = x.nrows();
        let d = x.ncols();
        let binned = BinnedMatrix::new(x, MAX_BINS);
        let criterion = Newton {
            lambda: config.lambda,
            min_child_weight: config.min_child_weight,
        };

        let prior = (y.iter().map(|&v| f64::from(v)).sum::<f64>() / n.max(1) as f64)
            .clamp(1e-6, 1.0 - 1e-6);
        let base_margin = (prior / (1.0 - prior)).ln();

        let rows_per_tree = fraction_of(n, config.subsample);
        let features_per_tree = fraction_of(d, config.colsample_bytree);

        let mut rng = StdRng::seed_from_u64(seed);
        let mut margins = vec![base_margin; n];
        let mut trees = Vec::with_capacity(config.n_estimators);

        for _ in 0..config.n_estimators {
            let stats: Vec<Stats> = margins
                .iter()
                .zip(y.iter())
                .map(|(&m, &label)| {
                    let p = sigmoid(m);
                    Stats::new(p - f64::from(label), (p * (1.0 - p)).max(1e-16))
                })
                .collect();

            let rows = index::sample(&mut rng, n, rows_per_tree).into_vec();
            let mut features = index::sample(&mut rng, d, features_per_tree).into_vec();
            features.sort_unstable();

            let grower = TreeGrower {
                data: &binned,
                criterion: &criterion,
                max_depth: config.max_depth,
                sampling: FeatureSampling::Fixed(features),
            };
            let mut tree = grower.grow(rows, &stats, &mut rng);
            tree.scale_leaves(config.learning_rate);

            for (i, margin) in margins.iter_mut().enumerate() {
                *margin += tree.predict(x.row(i));
            }
            trees.push(tree);
        }

        debug!(
            trees = trees.len(),
            base_margin,
            rows_per_tree,
            features_per_tree,
            "Gradient boosting fitted"
        );

        Self { base_margin, trees }
    }

    pub fn predict_proba_row(&self, row: ArrayView1<f64>) -> f64 {
        let margin = self.base_margin + self.trees.iter().map(|t| t.predict(row)).sum::<f64>();
        sigmoid(margin)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

fn fraction_of(total: usize, fraction: f64) -> usize {
    ((total as f64 * fraction).round() as usize).clamp(1usize.min(total), total)
}
