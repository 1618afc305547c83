//! CART regression tree builder for boosting residuals
//!
//! Splits are chosen by friedman-MSE improvement on the residuals, with
//! thresholds at the midpoint between consecutive distinct values. Leaf
//! values are a Newton step `factor * sum(residual) / sum(hessian)`.

use crate::tree::{Node, Tree};
use mlops_core::LcgRng;

/// Node impurity at or below this is treated as pure
const IMPURITY_EPSILON: f64 = 10.0 * f64::EPSILON;

/// Growth limits for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// Best split found for a node
#[derive(Debug, Clone, PartialEq)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    improvement: f64,
}

/// Builds one regression tree over a fixed feature matrix
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<f64>],
    residuals: &'a [f64],
    hessians: &'a [f64],
    leaf_factor: f64,
    feature_count: usize,
}

impl<'a> CartBuilder<'a> {
    /// `residuals` drive the splits, `hessians` only the leaf values
    pub fn new(
        features: &'a [Vec<f64>],
        residuals: &'a [f64],
        hessians: &'a [f64],
        config: TreeConfig,
    ) -> Self {
        debug_assert_eq!(features.len(), residuals.len());
        debug_assert_eq!(features.len(), hessians.len());

        let feature_count = features.first().map_or(0, Vec::len);
        Self {
            config,
            features,
            residuals,
            hessians,
            leaf_factor: 1.0,
            feature_count,
        }
    }

    /// Scale applied to every Newton leaf value
    pub fn with_leaf_factor(mut self, factor: f64) -> Self {
        self.leaf_factor = factor;
        self
    }

    /// Grow the tree; `rng` shuffles the feature visiting order at each node
    pub fn build(&self, rng: &mut LcgRng) -> Tree {
        let mut nodes = Vec::new();
        let indices: Vec<usize> = (0..self.residuals.len()).collect();
        self.build_node(&indices, 0, &mut nodes, rng);
        Tree::new(nodes)
    }

    fn build_node(
        &self,
        indices: &[usize],
        depth: usize,
        nodes: &mut Vec<Node>,
        rng: &mut LcgRng,
    ) -> i32 {
        let current = nodes.len() as i32;

        let stop = depth >= self.config.max_depth
            || indices.len() < self.config.min_samples_split
            || indices.len() < 2 * self.config.min_samples_leaf
            || self.impurity(indices) <= IMPURITY_EPSILON;

        let split = if stop {
            None
        } else {
            self.find_best_split(indices, rng)
        };

        let Some(split) = split else {
            nodes.push(Node::leaf(current, self.leaf_value(indices)));
            return current;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| self.features[i][split.feature_idx] <= split.threshold);

        // Reserve the slot, children are appended after it
        nodes.push(Node::internal(current, split.feature_idx as i32, split.threshold, -1, -1));
        let left_idx = self.build_node(&left, depth + 1, nodes, rng);
        let right_idx = self.build_node(&right, depth + 1, nodes, rng);

        let node = &mut nodes[current as usize];
        node.left = left_idx;
        node.right = right_idx;
        current
    }

    /// Exact-greedy search; earlier features in the shuffled order win ties
    fn find_best_split(&self, indices: &[usize], rng: &mut LcgRng) -> Option<SplitCandidate> {
        let n = indices.len();
        let total: f64 = indices.iter().map(|&i| self.residuals[i]).sum();
        let min_leaf = self.config.min_samples_leaf;
        let mut best: Option<SplitCandidate> = None;

        let mut sorted = indices.to_vec();
        for feature_idx in rng.permutation(self.feature_count) {
            sorted.sort_by(|&a, &b| {
                self.features[a][feature_idx].total_cmp(&self.features[b][feature_idx])
            });

            let mut left_sum = 0.0;
            for pos in 0..n - 1 {
                left_sum += self.residuals[sorted[pos]];
                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let here = self.features[sorted[pos]][feature_idx];
                let next = self.features[sorted[pos + 1]][feature_idx];
                if next <= here {
                    continue;
                }

                let right_sum = total - left_sum;
                let diff = left_sum / n_left as f64 - right_sum / n_right as f64;
                let improvement = (n_left * n_right) as f64 / n as f64 * diff * diff;

                if best.as_ref().map_or(true, |b| improvement > b.improvement) {
                    let mut threshold = here + (next - here) / 2.0;
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(SplitCandidate {
                        feature_idx,
                        threshold,
                        improvement,
                    });
                }
            }
        }

        best
    }

    /// Mean squared deviation of residuals
    fn impurity(&self, indices: &[usize]) -> f64 {
        let n = indices.len() as f64;
        let mean = indices.iter().map(|&i| self.residuals[i]).sum::<f64>() / n;
        indices
            .iter()
            .map(|&i| (self.residuals[i] - mean).powi(2))
            .sum::<f64>()
            / n
    }

    /// Newton step, 0 when the curvature vanishes
    fn leaf_value(&self, indices: &[usize]) -> f64 {
        let (sum_r, sum_h) = indices.iter().fold((0.0, 0.0), |(r, h), &i| {
            (r + self.residuals[i], h + self.hessians[i])
        });
        if sum_h.abs() < 1e-150 {
            0.0
        } else {
            self.leaf_factor * sum_r / sum_h
        }
    }
}
