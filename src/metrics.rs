//! Evaluation metrics and run statistics for the training pipeline.

use std::cmp::Ordering;
use std::time::Duration;
use tracing::info;

/// Area under the ROC curve via the rank-sum statistic.
///
/// Tied scores receive their average rank. Returns `None` when either
/// class is absent or the inputs disagree in length.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Option<f64> {
    if labels.len() != scores.len() {
        return None;
    }

    let positives = labels.iter().filter(|&&y| y == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based; the tie group shares the mean of start+1..=end
        let rank = (start + 1 + end) as f64 / 2.0;
        let tied_positives = order[start..end].iter().filter(|&&i| labels[i] == 1).count();
        positive_rank_sum += rank * tied_positives as f64;
        start = end;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

/// Evaluation result of one roster member.
#[derive(Debug, Clone)]
pub struct CandidateStats {
    pub name: String,
    pub auc: f64,
    pub fit_time: Duration,
    pub rejected: bool,
}

/// Timings and outcomes collected over one training run.
#[derive(Debug, Default, Clone)]
pub struct RunMetrics {
    pub merged_rows: usize,
    pub appended_rows: usize,
    pub training_rows: usize,
    pub dropped_rows: usize,
    pub feature_count: usize,
    pub merge_time: Duration,
    pub fit_time: Duration,
    pub train_time: Duration,
    pub save_time: Duration,
    pub candidates: Vec<CandidateStats>,
    pub selected: Option<String>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_candidate(&mut self, name: &str, auc: f64, fit_time: Duration) {
        self.candidates.push(CandidateStats {
            name: name.to_string(),
            auc,
            fit_time,
            rejected: false,
        });
    }

    pub fn mark_rejected(&mut self, name: &str) {
        if let Some(stats) = self.candidates.iter_mut().find(|c| c.name == name) {
            stats.rejected = true;
        }
    }

    pub fn total_time(&self) -> Duration {
        self.merge_time + self.fit_time + self.train_time + self.save_time
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            FRAUD MODEL PIPELINE - TRAINING SUMMARY           ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Merged Rows:   {:>8}  │  Appended From Ledger: {:>8}     ║",
            self.merged_rows, self.appended_rows
        );
        info!(
            "║ Training Rows: {:>8}  │  Dropped (bad label):  {:>8}     ║",
            self.training_rows, self.dropped_rows
        );
        info!("║ Encoded Features: {:>6}                                     ║", self.feature_count);
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Stage Time (ms): merge={:>6} fit={:>6} train={:>7} save={:>5} ║",
            self.merge_time.as_millis(),
            self.fit_time.as_millis(),
            self.train_time.as_millis(),
            self.save_time.as_millis()
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Candidates:                                                  ║");
        for stats in &self.candidates {
            let marker = if stats.rejected {
                "rejected"
            } else if self.selected.as_deref() == Some(stats.name.as_str()) {
                "selected"
            } else {
                ""
            };
            info!(
                "║   {:18} auc={:.4} fit={:>7}ms {:8}           ║",
                stats.name,
                stats.auc,
                stats.fit_time.as_millis(),
                marker
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_ranking() {
        let auc = roc_auc(&[0, 0, 1, 1], &[0.1, 0.2, 0.8, 0.9]).unwrap();
        assert!((auc - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverted_ranking() {
        let auc = roc_auc(&[1, 1, 0, 0], &[0.1, 0.2, 0.8, 0.9]).unwrap();
        assert!(auc.abs() < 1e-12);
    }

    #[test]
    fn test_ties_count_half() {
        let auc = roc_auc(&[0, 1, 0, 1], &[0.5, 0.5, 0.5, 0.5]).unwrap();
        assert!((auc - 0.5).abs() < 1e-12);

        // one positive above both negatives, one tied with a negative
        let auc = roc_auc(&[0, 0, 1, 1], &[0.2, 0.6, 0.6, 0.9]).unwrap();
        assert!((auc - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_single_class_has_no_auc() {
        assert!(roc_auc(&[1, 1, 1], &[0.1, 0.5, 0.9]).is_none());
        assert!(roc_auc(&[0, 1], &[0.1]).is_none());
    }

    #[test]
    fn test_run_metrics_tracks_candidates() {
        let mut metrics = RunMetrics::new();
        metrics.record_candidate("logistic", 0.81, Duration::from_millis(5));
        metrics.record_candidate("random_forest", 0.9995, Duration::from_millis(40));
        metrics.mark_rejected("random_forest");
        metrics.fit_time = Duration::from_millis(3);
        metrics.train_time = Duration::from_millis(45);

        assert!(!metrics.candidates[0].rejected);
        assert!(metrics.candidates[1].rejected);
        assert_eq!(metrics.total_time(), Duration::from_millis(48));
        metrics.print_summary();
    }
}
