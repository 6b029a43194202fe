//! Regression tree structures
//!
//! Trees are stored as flat node arrays with node 0 as the root. Internal
//! nodes send a row left when `feature <= threshold`. A missing (NaN) feature
//! follows the child that saw more training samples.

use serde::{Deserialize, Serialize};

/// A decision tree node (internal or leaf)
///
/// For internal nodes `feature_idx >= 0`, `left`/`right` index into the
/// tree's node array and `leaf` is `None`. Leaves have `feature_idx == -1`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Left child index (-1 for leaf nodes)
    pub left: i32,

    /// Right child index (-1 for leaf nodes)
    pub right: i32,

    /// Feature index to split on (-1 for leaf nodes)
    pub feature_idx: i32,

    /// Split threshold
    pub threshold: f64,

    /// Prediction value for leaf nodes
    pub leaf: Option<f64>,

    /// Number of training samples that reached this node
    pub samples: u32,

    /// Direction taken by rows whose split feature is missing
    pub missing_left: bool,
}

impl Node {
    /// Create a new internal (split) node
    pub fn internal(
        feature_idx: i32,
        threshold: f64,
        left: i32,
        right: i32,
        samples: u32,
        missing_left: bool,
    ) -> Self {
        Self {
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
            samples,
            missing_left,
        }
    }

    /// Create a new leaf node
    pub fn leaf(value: f64, samples: u32) -> Self {
        Self {
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0.0,
            leaf: Some(value),
            samples,
            missing_left: true,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx < 0 || self.leaf.is_some()
    }
}

/// A single regression tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Evaluate this tree on a dense feature vector.
    ///
    /// Returns `None` when the structure is broken or a split refers to a
    /// feature the vector does not have.
    pub fn evaluate(&self, features: &[f64]) -> Option<f64> {
        let mut idx = 0usize;

        // A well-formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..=self.nodes.len() {
            let node = self.nodes.get(idx)?;

            if let Some(value) = node.leaf {
                return Some(value);
            }

            let value = *features.get(usize::try_from(node.feature_idx).ok()?)?;
            let go_left = if value.is_nan() {
                node.missing_left
            } else {
                value <= node.threshold
            };

            let next = if go_left { node.left } else { node.right };
            idx = usize::try_from(next).ok()?;
        }

        None
    }

    /// Validate tree structure
    pub fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                match node.leaf {
                    Some(v) if v.is_finite() => {}
                    Some(_) => return Err(format!("Leaf node {i} has a non-finite value")),
                    None => return Err(format!("Leaf node {i} has no leaf value")),
                }
                continue;
            }

            for (side, child) in [("left", node.left), ("right", node.right)] {
                // Children are written after their parent.
                if child <= i as i32 || child as usize >= self.nodes.len() {
                    return Err(format!("Node {i} has invalid {side} child: {child}"));
                }
            }

            if !node.threshold.is_finite() {
                return Err(format!("Node {i} has a non-finite threshold"));
            }
        }

        Ok(())
    }

    /// Largest feature index referenced by any split
    pub fn max_feature_index(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter(|n| !n.is_leaf())
            .map(|n| n.feature_idx as usize)
            .max()
    }
}
