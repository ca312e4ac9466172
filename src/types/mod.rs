//! Type definitions for the fraud model pipeline

pub mod outcome;
pub mod transaction;

pub use outcome::{ScoreOutcome, Verdict};
pub use transaction::{
    Record, TransactionRecord, CATEGORICAL_FIELDS, LABEL_FIELD, NUMERIC_FIELDS,
};
