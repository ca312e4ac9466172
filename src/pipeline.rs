//! The retraining run: merge, fit, train, select, save.

use crate::artifacts::{ArtifactStore, ModelBundle};
use crate::config::AppConfig;
use crate::error::Result;
use crate::feature_transformer::{FeatureSchema, FeatureTransformer};
use crate::ledger::Ledger;
use crate::merger::{DataMerger, MergeOutcome};
use crate::metrics::RunMetrics;
use crate::models::{CandidateTrainer, ModelSelector, Scored};
use std::time::Instant;
use tracing::{error, info};

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub merge_outcome: MergeOutcome,
    pub seeded: bool,
    pub training_rows: usize,
    pub feature_count: usize,
    /// (variant name, held-out ROC-AUC) in roster order
    pub candidates: Vec<(String, f64)>,
    pub selected: String,
    pub score: f64,
    pub artifact_id: String,
    pub metrics: RunMetrics,
}

/// Run-to-completion retraining job. Nothing is persisted to the artifact
/// store unless every stage succeeds.
#[derive(Debug, Clone)]
pub struct Pipeline {
    merger: DataMerger,
    schema: FeatureSchema,
    trainer: CandidateTrainer,
    selector: ModelSelector,
    store: ArtifactStore,
}

impl Pipeline {
    pub fn new(
        merger: DataMerger,
        schema: FeatureSchema,
        trainer: CandidateTrainer,
        selector: ModelSelector,
        store: ArtifactStore,
    ) -> Self {
        Self {
            merger,
            schema,
            trainer,
            selector,
            store,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            DataMerger::new(&config.data.consolidated_path, &config.data.seed_path),
            FeatureSchema::transactions(),
            CandidateTrainer::new(config.training.test_ratio, config.training.seed),
            ModelSelector::new(config.training.leakage_threshold),
            ArtifactStore::new(&config.artifacts.dir),
        )
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub async fn run(&self, ledger: &dyn Ledger) -> Result<RunReport> {
        let mut metrics = RunMetrics::new();

        let started = Instant::now();
        let (dataset, merge) = self.merger.merge(ledger).await?;
        metrics.merge_time = started.elapsed();
        metrics.merged_rows = merge.total_rows;
        if let MergeOutcome::Appended { rows } = merge.outcome {
            metrics.appended_rows = rows;
        }

        let started = Instant::now();
        let (transformer, training) = FeatureTransformer::fit(&dataset, &self.schema)?;
        metrics.fit_time = started.elapsed();
        metrics.training_rows = training.labels.len();
        metrics.dropped_rows = training.dropped_rows;
        metrics.feature_count = transformer.feature_count();

        let started = Instant::now();
        let candidates = self.trainer.train(&training)?;
        metrics.train_time = started.elapsed();

        for candidate in &candidates {
            metrics.record_candidate(candidate.name(), candidate.score, candidate.fit_time);
            if !self.selector.is_admissible(candidate.score) {
                metrics.mark_rejected(candidate.name());
            }
        }
        let scores: Vec<(String, f64)> = candidates
            .iter()
            .map(|c| (c.name().to_string(), c.score))
            .collect();

        let winner = match self.selector.select(candidates) {
            Ok(winner) => winner,
            Err(e) => {
                error!(error = %e, "No admissible candidate, previous artifact left in place");
                metrics.print_summary();
                return Err(e.into());
            }
        };
        metrics.selected = Some(winner.name().to_string());
        let selected = winner.name().to_string();
        let score = winner.score;

        let started = Instant::now();
        let vocabulary = transformer.vocabulary();
        let bundle =
            ModelBundle::new(transformer, winner, vocabulary).with_training_rows(training.labels.len());
        self.store.save(&bundle)?;
        metrics.save_time = started.elapsed();

        info!(
            model = %selected,
            score,
            artifact_id = %bundle.artifact_id,
            total_ms = metrics.total_time().as_millis() as u64,
            "Retraining run complete"
        );
        metrics.print_summary();

        Ok(RunReport {
            merge_outcome: merge.outcome,
            seeded: merge.seeded,
            training_rows: training.labels.len(),
            feature_count: bundle.feature_names.len(),
            candidates: scores,
            selected,
            score,
            artifact_id: bundle.artifact_id,
            metrics,
        })
    }
}
