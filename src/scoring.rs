//! Scoring handle built from a saved artifact.

use crate::artifacts::{ArtifactStore, ModelBundle};
use crate::error::ScoringError;
use crate::models::Classifier;
use crate::types::{Record, ScoreOutcome, TransactionRecord, Verdict};
use ndarray::ArrayView1;
use tracing::debug;

/// Decision and probability for one record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub verdict: Verdict,
    pub probability: f64,
}

/// Scores transactions with one loaded bundle. Holds no global state; build
/// a new scorer to pick up a newer artifact.
#[derive(Debug, Clone)]
pub struct Scorer {
    bundle: ModelBundle,
}

impl Scorer {
    pub fn new(bundle: ModelBundle) -> Self {
        Self { bundle }
    }

    pub fn from_store(store: &ArtifactStore) -> Result<Self, ScoringError> {
        Ok(Self::new(store.load()?))
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    /// Score a loose record carrying exactly the fitted fields.
    pub fn score_record(&self, record: &Record) -> Result<Prediction, ScoringError> {
        let features = self.bundle.transformer.transform(record)?;
        let probability = self
            .bundle
            .model
            .predict_proba_row(ArrayView1::from(features.as_slice()));

        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(ScoringError::Model(format!(
                "{} produced probability {probability}",
                self.bundle.model_name
            )));
        }

        Ok(Prediction {
            verdict: Verdict::from_probability(probability),
            probability,
        })
    }

    /// Score a transaction and wrap the result as a publishable outcome.
    pub fn score(&self, transaction: &TransactionRecord) -> Result<ScoreOutcome, ScoringError> {
        let prediction = self.score_record(&transaction.to_record())?;

        debug!(
            model = %self.bundle.model_name,
            probability = prediction.probability,
            verdict = ?prediction.verdict,
            "Transaction scored"
        );

        let mut unlabeled = transaction.clone();
        unlabeled.fraud_flag = None;
        Ok(ScoreOutcome::new(unlabeled, prediction.probability)
            .with_model(&self.bundle.model_name, &self.bundle.artifact_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::feature_transformer::{FeatureSchema, FeatureTransformer};
    use crate::models::{Candidate, ModelVariant};
    use crate::synthetic::TransactionGenerator;
    use crate::error::TransformError;
    use tempfile::tempdir;

    fn trained_scorer() -> Scorer {
        let records = TransactionGenerator::new(7)
            .generate_dataset(120, 80)
            .iter()
            .map(TransactionRecord::to_labeled_record)
            .collect();
        let dataset = Dataset::from_records(records);
        let (transformer, data) =
            FeatureTransformer::fit(&dataset, &FeatureSchema::transactions()).unwrap();
        let candidate = Candidate {
            variant: ModelVariant::Logistic,
            score: 0.8,
            model: ModelVariant::Logistic.fit(data.features.view(), data.labels.view(), 42),
            fit_time: std::time::Duration::ZERO,
        };
        let vocabulary = transformer.vocabulary();
        Scorer::new(ModelBundle::new(transformer, candidate, vocabulary))
    }

    #[test]
    fn test_score_produces_outcome() {
        let scorer = trained_scorer();
        let tx = TransactionGenerator::new(99).generate_suspicious();

        let outcome = scorer.score(&tx).unwrap();

        assert!((0.0..=1.0).contains(&outcome.probability));
        assert_eq!(outcome.verdict, Verdict::from_probability(outcome.probability));
        assert_eq!(outcome.model_name, "logistic");
        assert_eq!(outcome.model_version, scorer.bundle().artifact_id);
        assert!(outcome.transaction.fraud_flag.is_none());
    }

    #[test]
    fn test_unknown_category_still_scores() {
        let scorer = trained_scorer();
        let mut tx = TransactionGenerator::new(3).generate_legitimate();
        tx.sender_bank = "Bank Nobody Has Heard Of".to_string();

        assert!(scorer.score(&tx).is_ok());
    }

    #[test]
    fn test_field_mismatch_is_transform_error() {
        let scorer = trained_scorer();
        let mut record = TransactionGenerator::new(3).generate_legitimate().to_record();
        record.remove("device_type");

        match scorer.score_record(&record) {
            Err(ScoringError::Transform(TransformError::MissingFields(fields))) => {
                assert!(fields.contains("device_type"));
            }
            other => panic!("expected missing field error, got {other:?}"),
        }
    }

    #[test]
    fn test_from_empty_store_is_configuration_error() {
        let dir = tempdir().unwrap();
        let err = Scorer::from_store(&ArtifactStore::new(dir.path())).unwrap_err();
        assert!(matches!(err, ScoringError::Configuration(_)));
    }
}
