//! Persistence of the selected model together with its feature encoding.

use crate::error::{PipelineError, Result};
use crate::feature_transformer::{FeatureTransformer, Vocabulary};
use crate::models::{Candidate, FittedModel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Everything needed to score a transaction, saved and loaded as one unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    /// Unique artifact identifier
    pub artifact_id: String,
    pub created_at: DateTime<Utc>,
    /// Roster variant that won selection
    pub model_name: String,
    /// Held-out ROC-AUC of the winner
    pub score: f64,
    pub training_rows: usize,
    /// Encoded column names in vector order
    pub feature_names: Vec<String>,
    pub transformer: FeatureTransformer,
    pub model: FittedModel,
    /// Categorical values seen at fit time
    pub vocabulary: Vocabulary,
}

impl ModelBundle {
    pub fn new(transformer: FeatureTransformer, candidate: Candidate, vocabulary: Vocabulary) -> Self {
        Self {
            artifact_id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            model_name: candidate.variant.name().to_string(),
            score: candidate.score,
            training_rows: 0,
            feature_names: transformer.feature_names(),
            transformer,
            model: candidate.model,
            vocabulary,
        }
    }

    pub fn with_training_rows(mut self, rows: usize) -> Self {
        self.training_rows = rows;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.model_name != self.model.variant().name() {
            return Err(PipelineError::configuration(format!(
                "bundle names model '{}' but carries a {} model",
                self.model_name,
                self.model.variant()
            )));
        }
        if self.feature_names != self.transformer.feature_names() {
            return Err(PipelineError::configuration(
                "bundle feature names disagree with its transformer",
            ));
        }
        Ok(())
    }
}

/// Single-slot artifact directory. Each save replaces the previous bundle.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub const BUNDLE_FILE: &'static str = "model_bundle.json";
    pub const VOCABULARY_FILE: &'static str = "unique_values.json";

    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn bundle_path(&self) -> PathBuf {
        self.dir.join(Self::BUNDLE_FILE)
    }

    pub fn vocabulary_path(&self) -> PathBuf {
        self.dir.join(Self::VOCABULARY_FILE)
    }

    pub fn exists(&self) -> bool {
        self.bundle_path().is_file()
    }

    /// Persist the bundle and the standalone vocabulary snapshot.
    ///
    /// Both files are staged beside their targets before anything is
    /// renamed. The bundle rename is the commit point: if any step fails,
    /// staged files are removed and the previous artifact stays in place.
    pub fn save(&self, bundle: &ModelBundle) -> Result<()> {
        bundle.validate()?;
        fs::create_dir_all(&self.dir)?;

        let bundle_path = self.bundle_path();
        let vocabulary_path = self.vocabulary_path();

        let staged_bundle = stage(&bundle_path, &serde_json::to_vec(bundle)?)?;
        let staged_vocabulary =
            match stage(&vocabulary_path, &serde_json::to_vec_pretty(&bundle.vocabulary)?) {
                Ok(path) => path,
                Err(e) => {
                    discard(&staged_bundle);
                    return Err(e);
                }
            };

        let previous_vocabulary = fs::read(&vocabulary_path).ok();
        if let Err(e) = fs::rename(&staged_vocabulary, &vocabulary_path) {
            discard(&staged_vocabulary);
            discard(&staged_bundle);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&staged_bundle, &bundle_path) {
            discard(&staged_bundle);
            let restored = match previous_vocabulary {
                Some(bytes) => fs::write(&vocabulary_path, bytes),
                None => fs::remove_file(&vocabulary_path),
            };
            if let Err(restore) = restored {
                warn!(error = %restore, "Failed to restore previous vocabulary snapshot");
            }
            return Err(e.into());
        }

        info!(
            artifact_id = %bundle.artifact_id,
            model = %bundle.model_name,
            score = bundle.score,
            path = %self.bundle_path().display(),
            "Artifact saved"
        );
        Ok(())
    }

    /// Load the current bundle. A missing bundle means no training run has
    /// completed yet.
    pub fn load(&self) -> Result<ModelBundle> {
        let path = self.bundle_path();
        if !path.is_file() {
            return Err(PipelineError::configuration(format!(
                "no model artifact at {}; run training first",
                path.display()
            )));
        }

        let bundle: ModelBundle = serde_json::from_slice(&fs::read(&path)?)?;
        bundle.validate()?;

        info!(
            artifact_id = %bundle.artifact_id,
            model = %bundle.model_name,
            features = bundle.feature_names.len(),
            "Artifact loaded"
        );
        Ok(bundle)
    }

    /// Read only the vocabulary snapshot.
    pub fn load_vocabulary(&self) -> Result<Vocabulary> {
        Ok(serde_json::from_slice(&fs::read(self.vocabulary_path())?)?)
    }
}

/// Write `bytes` to `<path>.tmp` and return the staged path.
fn stage(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    if let Err(e) = fs::write(&tmp, bytes) {
        discard(&tmp);
        return Err(e.into());
    }
    Ok(tmp)
}

fn discard(staged: &Path) {
    if staged.is_file() {
        if let Err(e) = fs::remove_file(staged) {
            warn!(path = %staged.display(), error = %e, "Failed to remove staged artifact file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::feature_transformer::FeatureSchema;
    use crate::models::ModelVariant;
    use crate::types::Record;
    use tempfile::tempdir;

    fn record(amount: &str, device: &str, label: &str) -> Record {
        [("amount", amount), ("device", device), ("label", label)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn bundle() -> ModelBundle {
        let dataset = Dataset::from_records(vec![
            record("10", "iOS", "0"),
            record("20", "Web", "1"),
            record("12", "Android", "0"),
            record("25", "Web", "1"),
        ]);
        let schema = FeatureSchema {
            numeric: vec!["amount".into()],
            categorical: vec!["device".into()],
            label: "label".into(),
        };
        let (transformer, data) = FeatureTransformer::fit(&dataset, &schema).unwrap();
        let model = ModelVariant::Logistic.fit(data.features.view(), data.labels.view(), 42);
        let candidate = Candidate {
            variant: ModelVariant::Logistic,
            score: 0.9,
            model,
            fit_time: std::time::Duration::ZERO,
        };
        let vocabulary = transformer.vocabulary();
        ModelBundle::new(transformer, candidate, vocabulary).with_training_rows(4)
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("artifacts"));
        let saved = bundle();

        store.save(&saved).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.artifact_id, saved.artifact_id);
        assert_eq!(loaded.model_name, "logistic");
        assert_eq!(loaded.training_rows, 4);
        assert_eq!(loaded.transformer, saved.transformer);
        assert_eq!(loaded.model, saved.model);
        assert_eq!(
            store.load_vocabulary().unwrap()["device"],
            vec!["Android", "Web", "iOS"]
        );
    }

    #[test]
    fn test_save_replaces_previous_bundle() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let first = bundle();
        let second = bundle();

        store.save(&first).unwrap();
        store.save(&second).unwrap();

        assert_eq!(store.load().unwrap().artifact_id, second.artifact_id);
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_failed_snapshot_write_keeps_previous_bundle() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let first = bundle();
        store.save(&first).unwrap();
        let before = fs::read(store.bundle_path()).unwrap();

        // a directory in the snapshot's place makes its rename fail
        fs::remove_file(store.vocabulary_path()).unwrap();
        fs::create_dir(store.vocabulary_path()).unwrap();

        assert!(store.save(&bundle()).is_err());
        assert_eq!(fs::read(store.bundle_path()).unwrap(), before);
        assert_eq!(store.load().unwrap().artifact_id, first.artifact_id);
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_missing_bundle_is_configuration_error() {
        let dir = tempdir().unwrap();
        let err = ArtifactStore::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_inconsistent_bundle_is_refused() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let mut broken = bundle();
        broken.model_name = "random_forest".into();

        assert!(store.save(&broken).is_err());
        assert!(!store.exists());
    }
}
