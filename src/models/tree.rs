//! Binary decision trees shared by the bagged and boosted ensembles.
//!
//! Training works on a [`BinnedMatrix`]: every feature column is reduced to
//! a handful of quantile cut points, and split search sweeps per-node
//! histograms over those bins. The split criterion is pluggable so the same
//! grower serves gini-impurity forests and second-order boosting.

use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};
use std::ops::{AddAssign, Sub};

/// Upper bound on cut points per feature.
#[cfg(not(feature = "exact-splits"))]
pub const MAX_BINS: usize = 64;

/// Every distinct value is a candidate threshold.
#[cfg(feature = "exact-splits")]
pub const MAX_BINS: usize = usize::MAX;

/// Gains below this are treated as no improvement.
const MIN_GAIN: f64 = 1e-12;

/// Fitted tree node. `x <= threshold` goes left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted tree, root at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn predict(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Multiply every leaf value by `factor` (boosting shrinkage).
    pub fn scale_leaves(&mut self, factor: f64) {
        for node in &mut self.nodes {
            if let Node::Leaf { value } = node {
                *value *= factor;
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Quantized copy of a feature matrix.
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    /// Per feature: ascending cut points. Bin `b` holds `cuts[b-1] < x <= cuts[b]`.
    cuts: Vec<Vec<f64>>,
    /// Per feature, per row: bin index.
    bins: Vec<Vec<u32>>,
}

impl BinnedMatrix {
    pub fn new(x: ArrayView2<f64>, max_bins: usize) -> Self {
        let mut cuts = Vec::with_capacity(x.ncols());
        let mut bins = Vec::with_capacity(x.ncols());

        for column in x.columns() {
            let values: Vec<f64> = column.to_vec();
            let feature_cuts = cut_points(&values, max_bins);
            let feature_bins = values
                .iter()
                .map(|v| feature_cuts.partition_point(|c| c < v) as u32)
                .collect();
            cuts.push(feature_cuts);
            bins.push(feature_bins);
        }

        Self { cuts, bins }
    }

    pub fn n_features(&self) -> usize {
        self.cuts.len()
    }

    pub fn n_rows(&self) -> usize {
        self.bins.first().map(Vec::len).unwrap_or(0)
    }

    pub fn n_bins(&self, feature: usize) -> usize {
        self.cuts[feature].len() + 1
    }
}

fn cut_points(values: &[f64], max_bins: usize) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut distinct = sorted.clone();
    distinct.dedup();
    if distinct.len() < 2 {
        return Vec::new();
    }

    if distinct.len() <= max_bins {
        return distinct.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    }

    let max = distinct[distinct.len() - 1];
    let n = sorted.len();
    let mut cuts: Vec<f64> = Vec::with_capacity(max_bins);
    for k in 1..max_bins {
        let candidate = sorted[k * n / max_bins];
        if candidate < max && cuts.last().map_or(true, |last| *last < candidate) {
            cuts.push(candidate);
        }
    }
    cuts
}

/// Additive per-row statistics accumulated into histograms.
///
/// Gini trees use `(positive weight, total weight)`; boosting uses
/// `(gradient, hessian)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    pub a: f64,
    pub b: f64,
}

impl Stats {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, rhs: Self) {
        self.a += rhs.a;
        self.b += rhs.b;
    }
}

impl Sub for Stats {
    type Output = Stats;

    fn sub(self, rhs: Self) -> Stats {
        Stats::new(self.a - rhs.a, self.b - rhs.b)
    }
}

/// How a node is scored and when a split is allowed.
pub trait SplitCriterion {
    /// Node quality; split gain is `score(left) + score(right) - score(parent)`.
    fn score(&self, stats: Stats) -> f64;

    fn leaf_value(&self, stats: Stats) -> f64;

    fn admissible(&self, left: Stats, right: Stats) -> bool;
}

/// Weighted gini impurity with a minimum leaf weight.
#[derive(Debug, Clone, Copy)]
pub struct Gini {
    pub min_samples_leaf: f64,
}

impl SplitCriterion for Gini {
    fn score(&self, stats: Stats) -> f64 {
        if stats.b <= 0.0 {
            return 0.0;
        }
        let (pos, total) = (stats.a, stats.b);
        -2.0 * pos * (total - pos) / total
    }

    fn leaf_value(&self, stats: Stats) -> f64 {
        if stats.b > 0.0 {
            stats.a / stats.b
        } else {
            0.0
        }
    }

    fn admissible(&self, left: Stats, right: Stats) -> bool {
        left.b >= self.min_samples_leaf && right.b >= self.min_samples_leaf
    }
}

/// Second-order (gradient/hessian) gain with L2 leaf regularization.
#[derive(Debug, Clone, Copy)]
pub struct Newton {
    pub lambda: f64,
    pub min_child_weight: f64,
}

impl SplitCriterion for Newton {
    fn score(&self, stats: Stats) -> f64 {
        stats.a * stats.a / (stats.b + self.lambda)
    }

    fn leaf_value(&self, stats: Stats) -> f64 {
        -stats.a / (stats.b + self.lambda)
    }

    fn admissible(&self, left: Stats, right: Stats) -> bool {
        left.b >= self.min_child_weight && right.b >= self.min_child_weight
    }
}

/// Candidate features at each node.
#[derive(Debug, Clone)]
pub enum FeatureSampling {
    /// Every listed feature at every node.
    Fixed(Vec<usize>),
    /// A fresh random subset of this size at every node.
    PerSplit(usize),
}

struct BestSplit {
    feature: usize,
    bin: usize,
    gain: f64,
}

/// Depth-first tree grower.
pub struct TreeGrower<'a, C: SplitCriterion> {
    pub data: &'a BinnedMatrix,
    pub criterion: &'a C,
    pub max_depth: usize,
    pub sampling: FeatureSampling,
}

impl<'a, C: SplitCriterion> TreeGrower<'a, C> {
    /// Grow a tree over `rows`, reading per-row statistics from `stats`
    /// (indexed by row id).
    pub fn grow(&self, rows: Vec<usize>, stats: &[Stats], rng: &mut StdRng) -> Tree {
        let mut nodes = Vec::new();
        self.grow_node(rows, stats, 0, &mut nodes, rng);
        Tree { nodes }
    }

    fn grow_node(
        &self,
        rows: Vec<usize>,
        stats: &[Stats],
        depth: usize,
        nodes: &mut Vec<Node>,
        rng: &mut StdRng,
    ) -> usize {
        let mut total = Stats::default();
        for &r in &rows {
            total += stats[r];
        }

        let idx = nodes.len();
        nodes.push(Node::Leaf {
            value: self.criterion.leaf_value(total),
        });

        if depth >= self.max_depth || rows.len() < 2 {
            return idx;
        }
        let Some(best) = self.find_split(&rows, stats, total, rng) else {
            return idx;
        };

        let feature_bins = &self.data.bins[best.feature];
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| feature_bins[r] as usize <= best.bin);

        let left = self.grow_node(left_rows, stats, depth + 1, nodes, rng);
        let right = self.grow_node(right_rows, stats, depth + 1, nodes, rng);
        nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: self.data.cuts[best.feature][best.bin],
            left,
            right,
        };
        idx
    }

    fn find_split(
        &self,
        rows: &[usize],
        stats: &[Stats],
        total: Stats,
        rng: &mut StdRng,
    ) -> Option<BestSplit> {
        // Constant features do not count toward the per-split budget.
        let (candidates, budget): (Vec<usize>, usize) = match &self.sampling {
            FeatureSampling::Fixed(features) => (features.clone(), usize::MAX),
            FeatureSampling::PerSplit(k) => {
                let n = self.data.n_features();
                (index::sample(rng, n, n).into_vec(), *k)
            }
        };

        let parent_score = self.criterion.score(total);
        let mut best: Option<BestSplit> = None;
        let mut evaluated = 0;

        for feature in candidates {
            if evaluated >= budget {
                break;
            }
            let n_bins = self.data.n_bins(feature);
            if n_bins < 2 {
                continue;
            }
            evaluated += 1;

            let mut histogram = vec![Stats::default(); n_bins];
            let feature_bins = &self.data.bins[feature];
            for &r in rows {
                histogram[feature_bins[r] as usize] += stats[r];
            }

            let mut left = Stats::default();
            for (bin, bucket) in histogram.iter().enumerate().take(n_bins - 1) {
                left += *bucket;
                let right = total - left;
                if !self.criterion.admissible(left, right) {
                    continue;
                }
                let gain = self.criterion.score(left) + self.criterion.score(right) - parent_score;
                let improves = best.as_ref().map_or(true, |b| gain > b.gain + MIN_GAIN);
                if gain > MIN_GAIN && improves {
                    best = Some(BestSplit { feature, bin, gain });
                }
            }
        }

        best
    }
}
