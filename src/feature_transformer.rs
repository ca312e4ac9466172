//! Feature encoding shared by training and scoring.
//!
//! The transformer standardizes numeric fields and one-hot encodes
//! categorical fields against a vocabulary frozen at fit time. Column order
//! is numeric fields in schema order, then one block per categorical field
//! in schema order, each block in sorted vocabulary order. Training and
//! scoring must agree on this layout, so a record with a different field
//! set is rejected rather than reshaped.

use crate::dataset::Dataset;
use crate::error::{PipelineError, Result, TransformError};
use crate::types::{Record, CATEGORICAL_FIELDS, LABEL_FIELD, NUMERIC_FIELDS};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Per-field sorted list of categorical values observed at fit time.
pub type Vocabulary = BTreeMap<String, Vec<String>>;

/// Which columns feed the model, and which column holds the label.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    pub label: String,
}

impl FeatureSchema {
    /// The transaction schema used by the fraud model.
    pub fn transactions() -> Self {
        Self {
            numeric: NUMERIC_FIELDS.iter().map(|s| s.to_string()).collect(),
            categorical: CATEGORICAL_FIELDS.iter().map(|s| s.to_string()).collect(),
            label: LABEL_FIELD.to_string(),
        }
    }

    fn feature_fields(&self) -> impl Iterator<Item = &String> {
        self.numeric.iter().chain(self.categorical.iter())
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::transactions()
    }
}

/// Standardization parameters for one numeric field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericScaler {
    pub name: String,
    pub mean: f64,
    pub scale: f64,
}

/// Frozen vocabulary for one categorical field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalEncoder {
    pub name: String,
    pub vocabulary: Vec<String>,
}

/// Encoded training data produced by [`FeatureTransformer::fit`].
#[derive(Debug, Clone)]
pub struct TrainingSet {
    /// One row per labeled record, `feature_count()` columns.
    pub features: Array2<f64>,
    /// 0 = legitimate, 1 = fraud.
    pub labels: Array1<u8>,
    /// Rows skipped because their label was missing or not 0/1.
    pub dropped_rows: usize,
}

/// Fitted feature encoding. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTransformer {
    numeric: Vec<NumericScaler>,
    categorical: Vec<CategoricalEncoder>,
}

impl FeatureTransformer {
    /// Lower bound for a numeric field's scale; keeps constant columns finite.
    pub const SCALE_EPSILON: f64 = 1e-8;

    /// Fit the encoding on a labeled dataset and encode it.
    ///
    /// Columns outside the schema are ignored. Rows without a 0/1 label are
    /// dropped. A dataset lacking any schema column is a configuration error.
    pub fn fit(dataset: &Dataset, schema: &FeatureSchema) -> Result<(Self, TrainingSet)> {
        let missing: Vec<&str> = schema
            .feature_fields()
            .chain(std::iter::once(&schema.label))
            .filter(|field| !dataset.has_column(field))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::configuration(format!(
                "dataset is missing required columns: {}",
                missing.join(", ")
            )));
        }

        let mut rows: Vec<Record> = Vec::with_capacity(dataset.len());
        let mut labels: Vec<u8> = Vec::with_capacity(dataset.len());
        for row in dataset.rows() {
            let Some(label) = row.get(&schema.label).and_then(|v| parse_label(v)) else {
                continue;
            };
            let projected: Record = schema
                .feature_fields()
                .map(|field| (field.clone(), row.get(field).cloned().unwrap_or_default()))
                .collect();
            rows.push(projected);
            labels.push(label);
        }

        let dropped_rows = dataset.len() - rows.len();
        if dropped_rows > 0 {
            warn!(dropped = dropped_rows, "Skipped rows without a valid 0/1 label");
        }
        if rows.is_empty() {
            return Err(PipelineError::configuration(
                "dataset contains no rows with a valid label",
            ));
        }

        let mut numeric = Vec::with_capacity(schema.numeric.len());
        for name in &schema.numeric {
            let values = rows
                .iter()
                .map(|row| parse_numeric(name, &row[name]))
                .collect::<std::result::Result<Vec<f64>, TransformError>>()?;
            let (mean, scale) = mean_and_scale(&values);
            debug!(field = %name, mean, scale, "Fitted numeric scaler");
            numeric.push(NumericScaler {
                name: name.clone(),
                mean,
                scale,
            });
        }

        let categorical: Vec<CategoricalEncoder> = schema
            .categorical
            .iter()
            .map(|name| {
                let distinct: BTreeSet<&str> = rows
                    .iter()
                    .map(|row| row[name].as_str())
                    .filter(|value| !value.trim().is_empty())
                    .collect();
                CategoricalEncoder {
                    name: name.clone(),
                    vocabulary: distinct.into_iter().map(str::to_string).collect(),
                }
            })
            .collect();

        let transformer = Self {
            numeric,
            categorical,
        };
        let features = transformer.transform_batch(&rows)?;

        info!(
            rows = rows.len(),
            features = transformer.feature_count(),
            "Feature transformer fitted"
        );

        Ok((
            transformer,
            TrainingSet {
                features,
                labels: Array1::from(labels),
                dropped_rows,
            },
        ))
    }

    /// Encode one record.
    ///
    /// The record must carry exactly the fitted fields. A categorical value
    /// outside the vocabulary encodes as an all-zero block.
    pub fn transform(&self, record: &Record) -> std::result::Result<Vec<f64>, TransformError> {
        self.check_fields(record)?;

        let mut features = Vec::with_capacity(self.feature_count());
        for scaler in &self.numeric {
            let value = parse_numeric(&scaler.name, &record[&scaler.name])?;
            features.push((value - scaler.mean) / scaler.scale);
        }
        for encoder in &self.categorical {
            let value = record[&encoder.name].as_str();
            let hot = encoder
                .vocabulary
                .binary_search_by(|known| known.as_str().cmp(value))
                .ok();
            features.extend((0..encoder.vocabulary.len()).map(|i| {
                if Some(i) == hot {
                    1.0
                } else {
                    0.0
                }
            }));
        }
        Ok(features)
    }

    /// Encode many records into a matrix, one row per record.
    pub fn transform_batch(&self, records: &[Record]) -> std::result::Result<Array2<f64>, TransformError> {
        let width = self.feature_count();
        let mut flat = Vec::with_capacity(records.len() * width);
        for record in records {
            flat.extend(self.transform(record)?);
        }
        let total = flat.len();
        Array2::from_shape_vec((records.len(), width), flat).map_err(|_| {
            TransformError::WidthMismatch {
                expected: width * records.len(),
                actual: total,
            }
        })
    }

    /// Length of every vector this transformer produces.
    pub fn feature_count(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|encoder| encoder.vocabulary.len())
                .sum::<usize>()
    }

    /// Column names in vector order (`field=value` for one-hot columns).
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.numeric.iter().map(|s| s.name.clone()).collect();
        for encoder in &self.categorical {
            names.extend(
                encoder
                    .vocabulary
                    .iter()
                    .map(|value| format!("{}={}", encoder.name, value)),
            );
        }
        names
    }

    /// The fields a record must carry, no more and no less.
    pub fn field_names(&self) -> BTreeSet<String> {
        self.numeric
            .iter()
            .map(|s| s.name.clone())
            .chain(self.categorical.iter().map(|e| e.name.clone()))
            .collect()
    }

    /// Snapshot of the categorical vocabularies.
    pub fn vocabulary(&self) -> Vocabulary {
        self.categorical
            .iter()
            .map(|encoder| (encoder.name.clone(), encoder.vocabulary.clone()))
            .collect()
    }

    pub fn numeric_scalers(&self) -> &[NumericScaler] {
        &self.numeric
    }

    fn check_fields(&self, record: &Record) -> std::result::Result<(), TransformError> {
        let expected = self.field_names();
        let actual: BTreeSet<String> = record.keys().cloned().collect();

        let missing: BTreeSet<String> = expected.difference(&actual).cloned().collect();
        if !missing.is_empty() {
            return Err(TransformError::MissingFields(missing));
        }
        let unexpected: BTreeSet<String> = actual.difference(&expected).cloned().collect();
        if !unexpected.is_empty() {
            return Err(TransformError::UnexpectedFields(unexpected));
        }
        Ok(())
    }
}

fn parse_numeric(field: &str, raw: &str) -> std::result::Result<f64, TransformError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| TransformError::InvalidNumber {
            field: field.to_string(),
            value: raw.to_string(),
        })
}

/// Accepts "0"/"1" as well as float renderings such as "1.0".
fn parse_label(raw: &str) -> Option<u8> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v == 0.0 => Some(0),
        Ok(v) if v == 1.0 => Some(1),
        _ => None,
    }
}

/// Population mean and standard deviation, with the deviation floored.
fn mean_and_scale(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt().max(FeatureTransformer::SCALE_EPSILON))
}
