//! Gradient-boosted trees with leaf-wise growth
//!
//! Each round fits one regression tree to the weighted logistic-loss
//! gradients. Trees grow best-first: the leaf whose split gains the most is
//! split next, until `max_leaves` is reached or nothing gains.

use super::{check_width, sigmoid, ClassWeight, Classifier};
use crate::error::{Result, RiskError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::debug;

/// Deepest tree a fitted model may hold. Deeper trees nest past what
/// `serde_json` reads back from `model.json`.
pub const MAX_TREE_DEPTH: usize = 48;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_leaves: usize,
    pub max_depth: Option<usize>,
    pub min_child_samples: usize,
    /// Minimum hessian sum on each side of a split
    pub min_child_weight: f64,
    pub reg_lambda: f64,
    pub reg_alpha: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub class_weight: ClassWeight,
    pub random_state: u64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_leaves: 31,
            max_depth: None,
            min_child_samples: 20,
            min_child_weight: 1e-3,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            class_weight: ClassWeight::Balanced,
            random_state: 22,
        }
    }
}

impl BoostingConfig {
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_leaves(mut self, n: usize) -> Self {
        self.max_leaves = n;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_child_samples(mut self, n: usize) -> Self {
        self.min_child_samples = n;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(RiskError::ConfigError("n_estimators must be positive".into()));
        }
        if self.max_leaves < 2 {
            return Err(RiskError::ConfigError("max_leaves must be at least 2".into()));
        }
        if self.max_depth == Some(0) {
            return Err(RiskError::ConfigError("max_depth must be positive".into()));
        }
        // a leaf-wise tree with n leaves is at most n - 1 splits deep
        let depth = self
            .max_depth
            .map_or(self.max_leaves - 1, |d| d.min(self.max_leaves - 1));
        if depth > MAX_TREE_DEPTH {
            return Err(RiskError::ConfigError(format!(
                "trees could grow {} levels deep, the limit is {}; set max_depth or lower max_leaves",
                depth, MAX_TREE_DEPTH
            )));
        }
        if !(self.learning_rate > 0.0) {
            return Err(RiskError::ConfigError("learning_rate must be positive".into()));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0)
            || !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0)
        {
            return Err(RiskError::ConfigError(
                "subsample and colsample_bytree must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, sample: &ArrayView1<f64>) -> f64 {
        match self {
            Node::Leaf { value } => *value,
            Node::Split { feature, threshold, left, right } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }
}

fn leaf_weight(g: f64, h: f64, lambda: f64, alpha: f64) -> f64 {
    let g_adj = if g.abs() <= alpha { 0.0 } else { g - alpha * g.signum() };
    -g_adj / (h + lambda)
}

fn gain_term(g: f64, h: f64, lambda: f64) -> f64 {
    g * g / (h + lambda)
}

/// Gradient statistics for one boosting round
struct Stats<'a> {
    grad: &'a [f64],
    hess: &'a [f64],
}

impl Stats<'_> {
    fn sums(&self, indices: &[usize]) -> (f64, f64) {
        indices
            .iter()
            .fold((0.0, 0.0), |(g, h), &i| (g + self.grad[i], h + self.hess[i]))
    }

    fn leaf(&self, indices: &[usize], config: &BoostingConfig) -> Node {
        let (g, h) = self.sums(indices);
        Node::Leaf { value: leaf_weight(g, h, config.reg_lambda, config.reg_alpha) }
    }
}

struct Candidate {
    gain: f64,
    node: usize,
    feature: usize,
    threshold: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    // Ties go to the lower node id so growth order is reproducible.
    fn cmp(&self, other: &Self) -> Ordering {
        self.gain
            .total_cmp(&other.gain)
            .then_with(|| other.node.cmp(&self.node))
    }
}

fn best_split_for_feature(
    x: &Array2<f64>,
    stats: &Stats,
    indices: &[usize],
    feature: usize,
    config: &BoostingConfig,
) -> Option<(f64, f64, Vec<usize>, Vec<usize>)> {
    let mut sorted: Vec<(usize, f64)> = indices.iter().map(|&i| (i, x[[i, feature]])).collect();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    let (total_g, total_h) = stats.sums(indices);
    let parent = gain_term(total_g, total_h, config.reg_lambda);

    let mut left_g = 0.0;
    let mut left_h = 0.0;
    let mut best_gain = 0.0;
    let mut best: Option<(f64, usize)> = None;

    for i in 0..sorted.len().saturating_sub(1) {
        left_g += stats.grad[sorted[i].0];
        left_h += stats.hess[sorted[i].0];
        let right_g = total_g - left_g;
        let right_h = total_h - left_h;

        if i + 1 < config.min_child_samples || sorted.len() - i - 1 < config.min_child_samples {
            continue;
        }
        if sorted[i].1 == sorted[i + 1].1 {
            continue;
        }
        if left_h < config.min_child_weight || right_h < config.min_child_weight {
            continue;
        }

        let gain = gain_term(left_g, left_h, config.reg_lambda)
            + gain_term(right_g, right_h, config.reg_lambda)
            - parent;
        if gain > best_gain {
            best_gain = gain;
            best = Some(((sorted[i].1 + sorted[i + 1].1) / 2.0, i + 1));
        }
    }

    let (threshold, pos) = best?;
    let left = sorted[..pos].iter().map(|&(i, _)| i).collect();
    let right = sorted[pos..].iter().map(|&(i, _)| i).collect();
    Some((threshold, best_gain, left, right))
}

fn best_split(
    x: &Array2<f64>,
    stats: &Stats,
    indices: &[usize],
    features: &[usize],
    node: usize,
    config: &BoostingConfig,
) -> Option<Candidate> {
    if indices.len() < config.min_child_samples * 2 {
        return None;
    }
    features
        .par_iter()
        .filter_map(|&feature| {
            best_split_for_feature(x, stats, indices, feature, config)
                .map(|(threshold, gain, left, right)| Candidate { gain, node, feature, threshold, left, right })
        })
        .max_by(|a, b| a.gain.total_cmp(&b.gain).then_with(|| b.feature.cmp(&a.feature)))
}

enum Slot {
    Leaf(Vec<usize>),
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

fn build_tree(
    x: &Array2<f64>,
    stats: &Stats,
    indices: Vec<usize>,
    config: &BoostingConfig,
    rng: &mut Xoshiro256PlusPlus,
) -> Node {
    let n_features = x.ncols();
    let n_selected = ((n_features as f64 * config.colsample_bytree).ceil() as usize).clamp(1, n_features);
    let mut features: Vec<usize> = (0..n_features).collect();
    features.shuffle(rng);
    features.truncate(n_selected);
    features.sort_unstable();

    let max_depth = config.max_depth.unwrap_or(usize::MAX);
    let mut heap = BinaryHeap::new();
    if let Some(root) = best_split(x, stats, &indices, &features, 0, config) {
        heap.push(root);
    }
    let mut slots = vec![Slot::Leaf(indices)];
    let mut depths = vec![0usize];
    let mut n_leaves = 1;

    while n_leaves < config.max_leaves {
        let Some(split) = heap.pop() else { break };
        let depth = depths[split.node];
        if depth >= max_depth {
            continue;
        }

        let left_id = slots.len();
        let right_id = left_id + 1;
        for (child, child_indices) in [(left_id, &split.left), (right_id, &split.right)] {
            if depth + 1 < max_depth {
                if let Some(c) = best_split(x, stats, child_indices, &features, child, config) {
                    heap.push(c);
                }
            }
        }
        slots.push(Slot::Leaf(split.left));
        slots.push(Slot::Leaf(split.right));
        depths.push(depth + 1);
        depths.push(depth + 1);
        slots[split.node] = Slot::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: left_id,
            right: right_id,
        };
        n_leaves += 1;
    }

    fn to_node(slots: &[Slot], id: usize, stats: &Stats, config: &BoostingConfig) -> Node {
        match &slots[id] {
            Slot::Leaf(indices) => stats.leaf(indices, config),
            Slot::Split { feature, threshold, left, right } => Node::Split {
                feature: *feature,
                threshold: *threshold,
                left: Box::new(to_node(slots, *left, stats, config)),
                right: Box::new(to_node(slots, *right, stats, config)),
            },
        }
    }
    to_node(&slots, 0, stats, config)
}

/// Binary gradient-boosted tree classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostedClassifier {
    pub config: BoostingConfig,
    trees: Vec<Node>,
    base_score: f64,
    n_features: usize,
}

impl BoostedClassifier {
    pub fn new(config: BoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: 0.0,
            n_features: 0,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.config.validate()?;
        let n = x.nrows();
        if n == 0 || x.ncols() == 0 {
            return Err(RiskError::TrainingError("empty training matrix".into()));
        }
        let weights = self.config.class_weight.sample_weights(y)?;

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let w_pos: f64 = weights.iter().zip(y.iter()).filter(|(_, &t)| t > 0.5).map(|(w, _)| w).sum();
        let w_neg: f64 = weights.sum() - w_pos;
        self.base_score = (w_pos / w_neg).ln();
        self.n_features = x.ncols();
        self.trees.clear();

        let mut raw = Array1::from_elem(n, self.base_score);
        for round in 0..self.config.n_estimators {
            let mut grad = Vec::with_capacity(n);
            let mut hess = Vec::with_capacity(n);
            for i in 0..n {
                let p = sigmoid(raw[i]);
                grad.push(weights[i] * (p - y[i]));
                hess.push(weights[i] * (p * (1.0 - p)).max(1e-16));
            }
            let stats = Stats { grad: &grad, hess: &hess };

            let indices = if self.config.subsample < 1.0 {
                let k = ((n as f64 * self.config.subsample).ceil() as usize).max(1);
                let mut idx: Vec<usize> = (0..n).collect();
                idx.shuffle(&mut rng);
                idx.truncate(k);
                idx
            } else {
                (0..n).collect()
            };

            let tree = build_tree(x, &stats, indices, &self.config, &mut rng);
            for (i, row) in x.rows().into_iter().enumerate() {
                raw[i] += self.config.learning_rate * tree.predict(&row);
            }
            self.trees.push(tree);

            if round % 25 == 0 {
                debug!(round, n_trees = self.trees.len(), "Boosting round complete");
            }
        }
        Ok(())
    }

    fn predict_raw(&self, x: &Array2<f64>) -> Array1<f64> {
        x.rows()
            .into_iter()
            .map(|row| {
                self.base_score
                    + self
                        .trees
                        .iter()
                        .map(|t| self.config.learning_rate * t.predict(&row))
                        .sum::<f64>()
            })
            .collect()
    }
}

impl Classifier for BoostedClassifier {
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.n_features == 0 {
            return Err(RiskError::TrainingError("model is not fitted".into()));
        }
        check_width(self.n_features, x)?;
        Ok(self.predict_raw(x).mapv(sigmoid))
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn name(&self) -> &'static str {
        "gradient_boosting"
    }
}
