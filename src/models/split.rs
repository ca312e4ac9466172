//! Stratified train/test partitioning.

use crate::error::{PipelineError, Result};
use ndarray::ArrayView1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Row indices of each partition, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Partition rows so every class keeps its share in both halves.
///
/// Each class sends `round(n_class * test_ratio)` rows to the test side,
/// clamped so both sides hold at least one row of every class.
pub fn stratified_split(labels: ArrayView1<u8>, test_ratio: f64, seed: u64) -> Result<Split> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(PipelineError::configuration(format!(
            "test ratio must be in (0, 1), got {test_ratio}"
        )));
    }

    let mut by_class: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(idx);
    }

    if by_class.len() < 2 {
        return Err(PipelineError::configuration(format!(
            "stratified split needs two label classes, found {}",
            by_class.len()
        )));
    }
    if let Some((class, rows)) = by_class.iter().find(|(_, rows)| rows.len() < 2) {
        return Err(PipelineError::configuration(format!(
            "label class {class} has {} row(s); at least 2 are needed to stratify",
            rows.len()
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for rows in by_class.values_mut() {
        rows.shuffle(&mut rng);
        let n_test = ((rows.len() as f64 * test_ratio).round() as usize).clamp(1, rows.len() - 1);
        test.extend_from_slice(&rows[..n_test]);
        train.extend_from_slice(&rows[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(Split { train, test })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    fn positive_share(labels: &Array1<u8>, rows: &[usize]) -> f64 {
        rows.iter().filter(|&&r| labels[r] == 1).count() as f64 / rows.len() as f64
    }

    #[test]
    fn test_split_sizes_and_disjointness() {
        let labels = Array1::from_shape_fn(100, |i| u8::from(i % 4 == 0));
        let split = stratified_split(labels.view(), 0.2, 42).unwrap();

        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_class_proportions_are_preserved() {
        for (n, every) in [(20usize, 2usize), (37, 3), (250, 7), (1000, 5)] {
            let labels = Array1::from_shape_fn(n, |i| u8::from(i % every == 0));
            let full = labels.iter().filter(|&&v| v == 1).count() as f64 / n as f64;

            let split = stratified_split(labels.view(), 0.2, 42).unwrap();

            assert!((positive_share(&labels, &split.train) - full).abs() < 0.05, "n={n}");
            assert!((positive_share(&labels, &split.test) - full).abs() < 0.05, "n={n}");
        }
    }

    #[test]
    fn test_split_is_seeded() {
        let labels = Array1::from_shape_fn(50, |i| u8::from(i % 3 == 0));
        let a = stratified_split(labels.view(), 0.2, 42).unwrap();
        let b = stratified_split(labels.view(), 0.2, 42).unwrap();
        let c = stratified_split(labels.view(), 0.2, 43).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_single_class_is_configuration_error() {
        let labels = Array1::from(vec![0u8; 30]);
        let err = stratified_split(labels.view(), 0.2, 42).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_singleton_class_is_configuration_error() {
        let mut labels = vec![0u8; 30];
        labels[4] = 1;
        let err = stratified_split(Array1::from(labels).view(), 0.2, 42).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(msg) if msg.contains("class 1")));
    }
}
