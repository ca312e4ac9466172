//! L2-regularized logistic regression with balanced class weights.

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fixed hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticConfig {
    /// Inverse regularization strength.
    pub c: f64,
    pub max_iter: usize,
    /// Stop once the largest gradient component falls below this.
    pub tol: f64,
    /// Weight each class by `n / (2 * n_class)`.
    pub balanced: bool,
}

pub const LOGISTIC: LogisticConfig = LogisticConfig {
    c: 1.0,
    max_iter: 1000,
    tol: 1e-6,
    balanced: true,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    coefficients: Vec<f64>,
    intercept: f64,
    iterations: usize,
}

impl LogisticRegression {
    /// Minimize weighted mean log-loss plus `|w|^2 / (2 C W)` by gradient
    /// descent with backtracking line search.
    pub fn fit(config: &LogisticConfig, x: ArrayView2<f64>, y: ArrayView1<u8>) -> Self {
        let n = x.nrows();
        let targets: Array1<f64> = y.mapv(f64::from);
        let weights = sample_weights(y, config.balanced);
        let total_weight = weights.sum();
        let l2 = 1.0 / (config.c * total_weight);

        let objective = |beta: &Array1<f64>, b: f64| -> f64 {
            let margins = x.dot(beta) + b;
            let loss: f64 = margins
                .iter()
                .zip(targets.iter())
                .zip(weights.iter())
                .map(|((&z, &t), &w)| w * (softplus(z) - t * z))
                .sum();
            loss / total_weight + 0.5 * l2 * beta.dot(beta)
        };

        let mut beta = Array1::<f64>::zeros(x.ncols());
        let mut intercept = 0.0;
        let mut step: f64 = 1.0;
        let mut current = objective(&beta, intercept);
        let mut iterations = 0;

        while iterations < config.max_iter {
            iterations += 1;

            let margins = x.dot(&beta) + intercept;
            let residual = (margins.mapv(sigmoid) - &targets) * &weights;
            let grad_beta = x.t().dot(&residual) / total_weight + &beta * l2;
            let grad_intercept = residual.sum() / total_weight;

            let max_grad = grad_beta
                .iter()
                .fold(grad_intercept.abs(), |m, g| m.max(g.abs()));
            if max_grad < config.tol {
                break;
            }

            let grad_norm_sq = grad_beta.dot(&grad_beta) + grad_intercept * grad_intercept;
            step = (step * 2.0).min(64.0);
            loop {
                let candidate_beta = &beta - &(&grad_beta * step);
                let candidate_intercept = intercept - step * grad_intercept;
                let value = objective(&candidate_beta, candidate_intercept);
                if value <= current - 0.5 * step * grad_norm_sq || step < 1e-10 {
                    beta = candidate_beta;
                    intercept = candidate_intercept;
                    current = value;
                    break;
                }
                step *= 0.5;
            }
        }

        debug!(rows = n, iterations, objective = current, "Logistic regression fitted");

        Self {
            coefficients: beta.to_vec(),
            intercept,
            iterations,
        }
    }

    pub fn predict_proba_row(&self, row: ArrayView1<f64>) -> f64 {
        let margin: f64 = row
            .iter()
            .zip(&self.coefficients)
            .map(|(x, w)| x * w)
            .sum::<f64>()
            + self.intercept;
        sigmoid(margin)
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

fn sample_weights(y: ArrayView1<u8>, balanced: bool) -> Array1<f64> {
    if !balanced {
        return Array1::ones(y.len());
    }
    let n = y.len() as f64;
    let positives = y.iter().filter(|&&v| v == 1).count() as f64;
    let negatives = n - positives;
    y.mapv(|v| {
        let class_count = if v == 1 { positives } else { negatives };
        n / (2.0 * class_count)
    })
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^z)` without overflow.
fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}
