//! Decision forest for per-sample classification.
//!
//! Each tree is a flat node array; node 0 is the root and children always
//! sit after their parent. A split sends `x[feature] <= threshold` left.
//! The forest takes a strict-majority vote, ties go to honest.

use super::{Label, SampleModel};
use crate::features::{FeatureVector, FEATURE_DIM};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// One node of a decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf(Label),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    /// A single-leaf tree.
    pub fn leaf(label: Label) -> Self {
        Self::new(vec![TreeNode::Leaf(label)])
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// True if the tree is non-empty, only splits on known features, and
    /// every child index points forward into the array.
    pub fn is_well_formed(&self) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(idx, node)| match node {
                TreeNode::Leaf(_) => true,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    *feature < FEATURE_DIM
                        && threshold.is_finite()
                        && (idx + 1..self.nodes.len()).contains(left)
                        && (idx + 1..self.nodes.len()).contains(right)
                }
            })
    }

    pub fn predict(&self, x: &FeatureVector) -> Label {
        let mut idx = 0;

        // Bounded walk: a malformed tree degrades to honest instead of looping
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf(label)) => return *label,
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = x.0.get(*feature).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
                None => break,
            }
        }

        warn!("Decision tree walk left the node array at index {}", idx);
        Label::Honest
    }
}

/// Majority vote over a set of trees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionForest {
    trees: Vec<DecisionTree>,
}

impl DecisionForest {
    pub fn new(trees: Vec<DecisionTree>) -> Self {
        Self { trees }
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn is_well_formed(&self) -> bool {
        !self.trees.is_empty() && self.trees.iter().all(DecisionTree::is_well_formed)
    }

    pub fn classify(&self, x: &FeatureVector) -> Label {
        let faulty = self.trees.iter().filter(|t| t.predict(x).is_faulty()).count();
        if faulty * 2 > self.trees.len() {
            Label::Faulty
        } else {
            Label::Honest
        }
    }
}

impl SampleModel for DecisionForest {
    fn predict(&self, batch: &[FeatureVector]) -> Vec<Label> {
        batch.iter().map(|x| self.classify(x)).collect()
    }
}
