//! Regression tree structures used as boosting weak learners
//!
//! Nodes live in a flat vector with node 0 as the root. Traversal goes left
//! when `feature <= threshold`.

use serde::{Deserialize, Serialize};

/// A decision tree node (internal or leaf)
///
/// For internal nodes `feature_idx >= 0` and `left`/`right` index into the
/// node vector. Leaves have `feature_idx == -1` and carry `leaf`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: i32,
    pub left: i32,
    pub right: i32,
    pub feature_idx: i32,
    pub threshold: f64,
    pub leaf: Option<f64>,
}

impl Node {
    /// Create a new internal (split) node
    pub fn internal(id: i32, feature_idx: i32, threshold: f64, left: i32, right: i32) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
        }
    }

    /// Create a new leaf node
    pub fn leaf(id: i32, value: f64) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0.0,
            leaf: Some(value),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }
}

/// A single regression tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Index of the leaf reached by `features`
    pub fn leaf_index(&self, features: &[f64]) -> Option<usize> {
        let mut idx = 0usize;
        // a well-formed tree never visits more nodes than it has
        for _ in 0..=self.nodes.len() {
            let node = self.nodes.get(idx)?;
            if node.is_leaf() {
                return Some(idx);
            }
            let value = *features.get(node.feature_idx as usize)?;
            let next = if value <= node.threshold { node.left } else { node.right };
            if next < 0 {
                return None;
            }
            idx = next as usize;
        }
        None
    }

    /// Leaf value reached by `features`, 0.0 for malformed trees
    pub fn evaluate(&self, features: &[f64]) -> f64 {
        self.leaf_index(features)
            .and_then(|i| self.nodes[i].leaf)
            .unwrap_or(0.0)
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Depth of the deepest leaf (a lone root has depth 0)
    pub fn depth(&self) -> usize {
        fn walk(tree: &Tree, idx: usize, depth: usize) -> usize {
            match tree.nodes.get(idx) {
                Some(node) if !node.is_leaf() => {
                    let l = walk(tree, node.left as usize, depth + 1);
                    let r = walk(tree, node.right as usize, depth + 1);
                    l.max(r)
                }
                _ => depth,
            }
        }
        walk(self, 0, 0)
    }

    /// Validate tree structure
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        let len = self.nodes.len() as i32;
        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                match node.leaf {
                    Some(v) if v.is_finite() => {}
                    _ => return Err(format!("leaf {i} has no finite value")),
                }
            } else {
                if !(0..len).contains(&node.left) || !(0..len).contains(&node.right) {
                    return Err(format!("node {i} has invalid children"));
                }
                if node.feature_idx < 0 || node.feature_idx as usize >= n_features {
                    return Err(format!("node {i} splits on unknown feature {}", node.feature_idx));
                }
            }
        }
        Ok(())
    }
}
