//! Consolidation of the stored training set with newly labeled ledger rows.

use crate::dataset::Dataset;
use crate::error::{PipelineError, Result};
use crate::ledger::Ledger;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What the ledger contributed to this merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// New rows appended after the existing ones
    Appended { rows: usize },
    /// The ledger answered with nothing new
    NoNewRows,
    /// The ledger could not be reached; training proceeds on stored data
    LedgerUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    pub outcome: MergeOutcome,
    /// True when no consolidated dataset existed and the seed was used
    pub seeded: bool,
    pub total_rows: usize,
}

/// Appends ledger rows to the consolidated dataset. No validation or
/// deduplication is done here; rows ingested twice are kept twice.
#[derive(Debug, Clone)]
pub struct DataMerger {
    consolidated_path: PathBuf,
    seed_path: PathBuf,
}

impl DataMerger {
    pub fn new<P: Into<PathBuf>, S: Into<PathBuf>>(consolidated_path: P, seed_path: S) -> Self {
        Self {
            consolidated_path: consolidated_path.into(),
            seed_path: seed_path.into(),
        }
    }

    pub fn consolidated_path(&self) -> &Path {
        &self.consolidated_path
    }

    /// Load (or seed) the consolidated dataset, append whatever the ledger
    /// returns and store the result.
    ///
    /// The file is rewritten only when rows were appended or when this run
    /// created it from the seed.
    pub async fn merge(&self, ledger: &dyn Ledger) -> Result<(Dataset, MergeReport)> {
        let seeded = !self.consolidated_path.is_file();
        let mut dataset = if seeded {
            info!(seed = %self.seed_path.display(), "No consolidated dataset, seeding from raw data");
            Dataset::read_csv(&self.seed_path)?
        } else {
            Dataset::read_csv(&self.consolidated_path)?
        };

        let outcome = match ledger.fetch_rows().await {
            Ok(rows) if rows.is_empty() => {
                info!("No new ledger rows");
                MergeOutcome::NoNewRows
            }
            Ok(rows) => {
                let count = rows.len();
                info!(rows = count, existing = dataset.len(), "Merging new ledger rows");
                dataset.append(rows);
                MergeOutcome::Appended { rows: count }
            }
            Err(e) if e.is_fatal() => return Err(PipelineError::configuration(e.to_string())),
            Err(e) => {
                warn!(error = %e, "Ledger unavailable, training on stored data");
                MergeOutcome::LedgerUnavailable
            }
        };

        if seeded || matches!(outcome, MergeOutcome::Appended { .. }) {
            dataset.write_csv(&self.consolidated_path)?;
            info!(
                path = %self.consolidated_path.display(),
                rows = dataset.len(),
                "Consolidated dataset saved"
            );
        }

        let report = MergeReport {
            outcome,
            seeded,
            total_rows: dataset.len(),
        };
        Ok((dataset, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::types::Record;
    use async_trait::async_trait;
    use std::fs;
    use tempfile::tempdir;

    struct FixedLedger(Vec<Record>);

    #[async_trait]
    impl Ledger for FixedLedger {
        async fn fetch_rows(&self) -> std::result::Result<Vec<Record>, LedgerError> {
            Ok(self.0.clone())
        }
    }

    struct FailingLedger(fn() -> LedgerError);

    #[async_trait]
    impl Ledger for FailingLedger {
        async fn fetch_rows(&self) -> std::result::Result<Vec<Record>, LedgerError> {
            Err((self.0)())
        }
    }

    fn row(id: &str, label: &str) -> Record {
        [("id", id), ("fraud_flag", label)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn seeded_merger(dir: &Path) -> DataMerger {
        let seed = dir.join("raw/transactions.csv");
        fs::create_dir_all(seed.parent().unwrap()).unwrap();
        fs::write(&seed, "id,fraud_flag\n1,0\n2,1\n").unwrap();
        DataMerger::new(dir.join("processed/training_data.csv"), seed)
    }

    #[tokio::test]
    async fn test_seed_run_writes_consolidated_file() {
        let dir = tempdir().unwrap();
        let merger = seeded_merger(dir.path());

        let (dataset, report) = merger.merge(&FixedLedger(vec![])).await.unwrap();

        assert!(report.seeded);
        assert_eq!(report.outcome, MergeOutcome::NoNewRows);
        assert_eq!(dataset.len(), 2);
        assert!(merger.consolidated_path().is_file());
    }

    #[tokio::test]
    async fn test_empty_fetch_is_idempotent() {
        let dir = tempdir().unwrap();
        let merger = seeded_merger(dir.path());
        merger.merge(&FixedLedger(vec![])).await.unwrap();
        let before = fs::read(merger.consolidated_path()).unwrap();
        let modified = fs::metadata(merger.consolidated_path()).unwrap().modified().unwrap();

        let (_, report) = merger.merge(&FixedLedger(vec![])).await.unwrap();

        assert!(!report.seeded);
        assert_eq!(report.outcome, MergeOutcome::NoNewRows);
        assert_eq!(fs::read(merger.consolidated_path()).unwrap(), before);
        assert_eq!(
            fs::metadata(merger.consolidated_path()).unwrap().modified().unwrap(),
            modified
        );
    }

    #[tokio::test]
    async fn test_rows_append_in_arrival_order_without_dedup() {
        let dir = tempdir().unwrap();
        let merger = seeded_merger(dir.path());
        let ledger = FixedLedger(vec![row("3", "0"), row("1", "0")]);

        merger.merge(&ledger).await.unwrap();
        let (dataset, report) = merger.merge(&ledger).await.unwrap();

        assert_eq!(report.outcome, MergeOutcome::Appended { rows: 2 });
        let ids: Vec<&str> = dataset.rows().iter().map(|r| r["id"].as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "1", "3", "1"]);

        let stored = Dataset::read_csv(merger.consolidated_path()).unwrap();
        assert_eq!(stored.len(), 6);
    }

    #[tokio::test]
    async fn test_unreachable_ledger_degrades() {
        let dir = tempdir().unwrap();
        let merger = seeded_merger(dir.path());
        let ledger = FailingLedger(|| LedgerError::Timeout(std::time::Duration::from_secs(10)));

        let (dataset, report) = merger.merge(&ledger).await.unwrap();

        assert_eq!(report.outcome, MergeOutcome::LedgerUnavailable);
        assert_eq!(dataset.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_credentials_abort() {
        let dir = tempdir().unwrap();
        let merger = seeded_merger(dir.path());
        let ledger = FailingLedger(|| LedgerError::MissingCredentials("LEDGER_API_TOKEN".into()));

        let err = merger.merge(&ledger).await.unwrap_err();

        assert!(matches!(err, PipelineError::Configuration(_)));
        assert!(!merger.consolidated_path().exists());
    }

    #[tokio::test]
    async fn test_rejected_credentials_abort() {
        let dir = tempdir().unwrap();
        let merger = seeded_merger(dir.path());
        let ledger = FailingLedger(|| LedgerError::Rejected(403));

        let err = merger.merge(&ledger).await.unwrap_err();

        assert!(matches!(err, PipelineError::Configuration(msg) if msg.contains("403")));
        assert!(!merger.consolidated_path().exists());
    }

    #[tokio::test]
    async fn test_missing_seed_is_dataset_error() {
        let dir = tempdir().unwrap();
        let merger = DataMerger::new(dir.path().join("a.csv"), dir.path().join("b.csv"));

        let err = merger.merge(&FixedLedger(vec![])).await.unwrap_err();
        assert!(matches!(err, PipelineError::Dataset { .. }));
    }
}
