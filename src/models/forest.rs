//! Bagged gini trees (random forest).

use crate::models::tree::{BinnedMatrix, FeatureSampling, Gini, Stats, Tree, TreeGrower, MAX_BINS};
use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fixed hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Resample rows with replacement for every tree.
    pub bootstrap: bool,
}

pub const RANDOM_FOREST: ForestConfig = ForestConfig {
    n_estimators: 200,
    max_depth: 10,
    min_samples_leaf: 20,
    bootstrap: true,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<Tree>,
}

impl RandomForest {
    /// Grow `n_estimators` trees, each on a bootstrap sample with
    /// `sqrt(n_features)` candidate features per split.
    pub fn fit(config: &ForestConfig, x: ArrayView2<f64>, y: ArrayView1<u8>, seed: u64) -> Self {
        let n = x.nrows();
        let binned = BinnedMatrix::new(x, MAX_BINS);
        let max_features = ((x.ncols() as f64).sqrt().floor() as usize).max(1);
        let criterion = Gini {
            min_samples_leaf: config.min_samples_leaf as f64,
        };
        let grower = TreeGrower {
            data: &binned,
            criterion: &criterion,
            max_depth: config.max_depth,
            sampling: FeatureSampling::PerSplit(max_features),
        };

        let mut rng = StdRng::seed_from_u64(seed);
        let mut trees = Vec::with_capacity(config.n_estimators);
        for _ in 0..config.n_estimators {
            let mut counts = vec![0u32; n];
            if config.bootstrap {
                for _ in 0..n {
                    counts[rng.gen_range(0..n)] += 1;
                }
            } else {
                counts.fill(1);
            }

            let stats: Vec<Stats> = counts
                .iter()
                .zip(y.iter())
                .map(|(&c, &label)| Stats::new(f64::from(c) * f64::from(label), f64::from(c)))
                .collect();
            let rows: Vec<usize> = (0..n).filter(|&r| counts[r] > 0).collect();

            trees.push(grower.grow(rows, &stats, &mut rng));
        }

        debug!(
            trees = trees.len(),
            max_features,
            mean_nodes = trees.iter().map(Tree::node_count).sum::<usize>() / trees.len().max(1),
            "Random forest fitted"
        );

        Self { trees }
    }

    /// Mean of the per-tree positive fractions.
    pub fn predict_proba_row(&self, row: ArrayView1<f64>) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn threshold_data() -> (Array2<f64>, Array1<u8>) {
        let n = 200;
        let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => i as f64 / n as f64,
            1 => ((i * 7) % 13) as f64,
            _ => 1.0,
        });
        let y = Array1::from_shape_fn(n, |i| u8::from(i >= n / 2));
        (x, y)
    }

    #[test]
    fn test_forest_ranks_by_signal() {
        let (x, y) = threshold_data();
        let config = ForestConfig {
            n_estimators: 25,
            ..RANDOM_FOREST
        };

        let forest = RandomForest::fit(&config, x.view(), y.view(), 42);

        assert_eq!(forest.n_trees(), 25);
        let low = forest.predict_proba_row(x.row(10));
        let high = forest.predict_proba_row(x.row(190));
        assert!(high > low);
        assert!((0.0..=1.0).contains(&low) && (0.0..=1.0).contains(&high));
    }

    #[test]
    fn test_forest_is_reproducible() {
        let (x, y) = threshold_data();
        let config = ForestConfig {
            n_estimators: 5,
            ..RANDOM_FOREST
        };

        let a = RandomForest::fit(&config, x.view(), y.view(), 7);
        let b = RandomForest::fit(&config, x.view(), y.view(), 7);
        assert_eq!(a, b);
    }

    #[test]
    fn test_trees_respect_max_depth() {
        let (x, y) = threshold_data();
        let config = ForestConfig {
            n_estimators: 3,
            max_depth: 2,
            min_samples_leaf: 1,
            bootstrap: false,
        };

        let forest = RandomForest::fit(&config, x.view(), y.view(), 1);
        assert!(forest.trees.iter().all(|t| t.depth() <= 2));
    }
}
