//! Seed Dataset Generator
//!
//! Writes a synthetic labeled transaction CSV to bootstrap local training
//! runs before any real data exists.
//!
//! Usage: seed_generator [output.csv] [count] [fraud_rate] [seed]

use anyhow::{ensure, Context};
use fraud_model_pipeline::synthetic::TransactionGenerator;
use fraud_model_pipeline::types::{TransactionRecord, CATEGORICAL_FIELDS, LABEL_FIELD, NUMERIC_FIELDS};
use fraud_model_pipeline::Dataset;
use tracing::info;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("seed_generator=info".parse()?),
        )
        .init();

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let output = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("data/raw/transactions.csv");
    let count: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(5000);
    let fraud_rate: f64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let seed: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(42);

    ensure!(
        (0.0..=1.0).contains(&fraud_rate),
        "fraud rate must be within [0, 1], got {fraud_rate}"
    );

    let positives = (count as f64 * fraud_rate).round() as usize;
    let negatives = count - positives;
    info!(
        output = %output,
        count,
        positives,
        seed,
        "Generating seed dataset"
    );

    let header = NUMERIC_FIELDS
        .iter()
        .chain(CATEGORICAL_FIELDS.iter())
        .chain(std::iter::once(&LABEL_FIELD))
        .map(|s| s.to_string())
        .collect();
    let mut dataset = Dataset::with_header(header);
    dataset.append(
        TransactionGenerator::new(seed)
            .generate_dataset(negatives, positives)
            .iter()
            .map(TransactionRecord::to_labeled_record)
            .collect(),
    );

    dataset
        .write_csv(output)
        .with_context(|| format!("Failed to write {output}"))?;

    info!(rows = dataset.len(), output = %output, "Seed dataset written");
    Ok(())
}
