//! Decision tree implementation.
//!
//! Nodes live in a contiguous vector with the root at index 0. Leaf outputs
//! are stored unscaled; every prediction multiplies them by the tree's
//! shrinkage.

use crate::core::types::{FeatureIndex, ImportanceType, NodeIndex};
use crate::tree::node::{NodeSplit, TreeNode};
use crate::tree::split::SplitInfo;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Decision tree structure representing a single tree in the ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    /// Vector of tree nodes (index 0 is always the root)
    nodes: Vec<TreeNode>,
    /// Maximum number of leaves allowed in the tree
    max_leaves: usize,
    /// Current number of leaf nodes
    num_leaves: usize,
    /// Tree shrinkage factor (learning rate)
    shrinkage: f64,
    /// Maximum tree depth
    max_depth: usize,
}

impl Tree {
    /// Creates a new tree with a single root node.
    pub fn new(max_leaves: usize) -> Self {
        let root = TreeNode::new_leaf(0.0, 0.0, 0, 0, None);

        Tree {
            nodes: vec![root],
            max_leaves,
            num_leaves: 1,
            shrinkage: 1.0,
            max_depth: 0,
        }
    }

    /// Creates a new tree with specified capacity and shrinkage.
    pub fn with_capacity(max_leaves: usize, shrinkage: f64) -> Self {
        let mut tree = Self::new(max_leaves);
        tree.shrinkage = shrinkage;
        tree
    }

    /// Rebuilds a tree from nodes whose splits and leaf outputs are already
    /// set, e.g. when reading a saved model. Parents and depths are derived
    /// from the child links.
    pub fn from_nodes(mut nodes: Vec<TreeNode>, shrinkage: f64) -> anyhow::Result<Self> {
        if nodes.is_empty() {
            return Err(anyhow::anyhow!("Tree has no nodes"));
        }

        let mut visited = vec![false; nodes.len()];
        let mut stack = vec![(0usize, None, 0usize)];
        let mut max_depth = 0;

        while let Some((index, parent, depth)) = stack.pop() {
            let node = nodes
                .get_mut(index)
                .ok_or_else(|| anyhow::anyhow!("Child index {} out of bounds", index))?;
            if std::mem::replace(&mut visited[index], true) {
                return Err(anyhow::anyhow!("Node {} is reachable twice", index));
            }
            node.set_parent(parent);
            node.set_depth(depth);
            max_depth = max_depth.max(depth);

            if let Some(split) = node.split().copied() {
                stack.push((split.right_child, Some(index), depth + 1));
                stack.push((split.left_child, Some(index), depth + 1));
            }
        }

        if let Some(orphan) = visited.iter().position(|&v| !v) {
            return Err(anyhow::anyhow!("Node {} is not reachable from the root", orphan));
        }

        let num_leaves = nodes.iter().filter(|n| n.is_leaf()).count();
        let tree = Tree {
            nodes,
            max_leaves: num_leaves,
            num_leaves,
            shrinkage,
            max_depth,
        };
        tree.validate()?;
        Ok(tree)
    }

    /// Returns the number of nodes in the tree.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of leaf nodes in the tree.
    pub fn num_leaves(&self) -> usize {
        self.num_leaves
    }

    /// Returns the maximum number of leaves allowed.
    pub fn max_leaves(&self) -> usize {
        self.max_leaves
    }

    /// Returns the tree depth (maximum depth of any node).
    pub fn depth(&self) -> usize {
        self.max_depth
    }

    /// Returns the shrinkage factor.
    pub fn shrinkage(&self) -> f64 {
        self.shrinkage
    }

    /// Returns all nodes in index order.
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Returns a reference to the node at the given index.
    pub fn node(&self, index: NodeIndex) -> Option<&TreeNode> {
        self.nodes.get(index)
    }

    /// Returns a mutable reference to the node at the given index.
    pub fn node_mut(&mut self, index: NodeIndex) -> Option<&mut TreeNode> {
        self.nodes.get_mut(index)
    }

    /// Returns the root node of the tree.
    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    /// Walks from the root to the leaf reached by `features`, returning every
    /// visited node index (root first, leaf last).
    pub fn decision_path(&self, features: &ArrayView1<'_, f32>) -> anyhow::Result<Vec<NodeIndex>> {
        let mut path = Vec::with_capacity(self.max_depth + 1);
        let mut node_index = 0;

        loop {
            let node = self
                .nodes
                .get(node_index)
                .ok_or_else(|| anyhow::anyhow!("Node index {} out of bounds", node_index))?;
            path.push(node_index);

            let Some(split) = node.split() else {
                return Ok(path);
            };

            let value = features.get(split.feature).copied().ok_or_else(|| {
                anyhow::anyhow!(
                    "Feature {} out of bounds for input of length {}",
                    split.feature,
                    features.len()
                )
            })?;
            node_index = split.next_node(value as f64);
        }
    }

    /// Predicts the leaf index for a single data point.
    pub fn predict_leaf_index(&self, features: &ArrayView1<'_, f32>) -> anyhow::Result<NodeIndex> {
        let path = self.decision_path(features)?;
        path.last()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Empty decision path"))
    }

    /// Predicts the output for a single data point.
    pub fn predict(&self, features: &ArrayView1<'_, f32>) -> anyhow::Result<f64> {
        let leaf = self.predict_leaf_index(features)?;
        Ok(self.nodes[leaf].leaf_output() * self.shrinkage)
    }

    /// Features tested on the way to the leaf reached by `features`.
    pub fn path_features(&self, features: &ArrayView1<'_, f32>) -> anyhow::Result<Vec<FeatureIndex>> {
        let path = self.decision_path(features)?;
        Ok(path
            .iter()
            .filter_map(|&i| self.nodes[i].split_feature())
            .collect())
    }

    /// Sets the leaf output for the node at the given index.
    pub fn set_leaf_output(&mut self, node_index: NodeIndex, output: f64) -> anyhow::Result<()> {
        let node = self
            .nodes
            .get_mut(node_index)
            .ok_or_else(|| anyhow::anyhow!("Node index {} out of bounds", node_index))?;

        if !node.is_leaf() {
            return Err(anyhow::anyhow!("Cannot set output for non-leaf node"));
        }
        node.set_leaf_output(output);

        Ok(())
    }

    /// Splits a leaf node into an internal node with two children.
    ///
    /// The children receive the statistics and outputs carried by `split`.
    pub fn split_node(
        &mut self,
        node_index: NodeIndex,
        split: &SplitInfo,
    ) -> anyhow::Result<(NodeIndex, NodeIndex)> {
        if node_index >= self.nodes.len() {
            return Err(anyhow::anyhow!("Node index {} out of bounds", node_index));
        }

        if !self.nodes[node_index].is_leaf() {
            return Err(anyhow::anyhow!("Cannot split non-leaf node"));
        }

        if self.num_leaves >= self.max_leaves {
            return Err(anyhow::anyhow!("Maximum number of leaves reached"));
        }

        let child_depth = self.nodes[node_index].depth() + 1;
        self.max_depth = self.max_depth.max(child_depth);

        let left_child_index = self.nodes.len();
        let right_child_index = self.nodes.len() + 1;

        let mut left_child = TreeNode::new_leaf(
            split.left_sum_gradient,
            split.left_sum_hessian,
            split.left_count,
            child_depth,
            Some(node_index),
        );
        left_child.set_leaf_output(split.left_output);

        let mut right_child = TreeNode::new_leaf(
            split.right_sum_gradient,
            split.right_sum_hessian,
            split.right_count,
            child_depth,
            Some(node_index),
        );
        right_child.set_leaf_output(split.right_output);

        self.nodes.push(left_child);
        self.nodes.push(right_child);

        self.nodes[node_index].set_split(NodeSplit {
            feature: split.feature,
            threshold: split.threshold_value,
            gain: split.gain,
            default_left: split.default_left,
            left_child: left_child_index,
            right_child: right_child_index,
        });

        // Added 2 leaves, removed 1
        self.num_leaves += 1;

        Ok((left_child_index, right_child_index))
    }

    /// Distinct features used by any split of this tree.
    pub fn used_features(&self) -> BTreeSet<FeatureIndex> {
        self.nodes.iter().filter_map(|n| n.split_feature()).collect()
    }

    /// Accumulates split counts or split gains per feature into `importance`.
    pub fn add_feature_importance(&self, importance: &mut [f64], importance_type: ImportanceType) {
        for split in self.nodes.iter().filter_map(|n| n.split()) {
            if let Some(slot) = importance.get_mut(split.feature) {
                *slot += match importance_type {
                    ImportanceType::Split => 1.0,
                    ImportanceType::Gain => split.gain,
                };
            }
        }
    }

    /// Calculates feature importance of this tree alone.
    pub fn feature_importance(&self, num_features: usize, importance_type: ImportanceType) -> Vec<f64> {
        let mut importance = vec![0.0; num_features];
        self.add_feature_importance(&mut importance, importance_type);
        importance
    }

    /// Returns a textual representation of the tree structure.
    pub fn to_string_representation(&self) -> String {
        let mut result = String::new();
        self.tree_to_string_recursive(0, "", true, &mut result);
        result
    }

    fn tree_to_string_recursive(
        &self,
        node_index: NodeIndex,
        prefix: &str,
        is_last: bool,
        result: &mut String,
    ) {
        let Some(node) = self.nodes.get(node_index) else {
            return;
        };

        let current_prefix = if is_last { "└── " } else { "├── " };
        result.push_str(&format!("{}{}{}\n", prefix, current_prefix, node));

        if let Some(split) = node.split() {
            let new_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
            self.tree_to_string_recursive(split.left_child, &new_prefix, false, result);
            self.tree_to_string_recursive(split.right_child, &new_prefix, true, result);
        }
    }

    /// Validates the tree structure consistency.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.nodes.is_empty() {
            return Err(anyhow::anyhow!("Tree has no nodes"));
        }

        if self.nodes[0].parent().is_some() {
            return Err(anyhow::anyhow!("Root node should not have a parent"));
        }

        let mut leaf_count = 0;
        for (i, node) in self.nodes.iter().enumerate() {
            let Some(split) = node.split() else {
                leaf_count += 1;
                continue;
            };

            for child in [split.left_child, split.right_child] {
                let child_node = self
                    .nodes
                    .get(child)
                    .ok_or_else(|| anyhow::anyhow!("Node {} has invalid child index {}", i, child))?;
                if child_node.parent() != Some(i) {
                    return Err(anyhow::anyhow!("Child {} parent mismatch", child));
                }
            }

            if split.threshold.is_nan() {
                return Err(anyhow::anyhow!("Node {} has a NaN threshold", i));
            }
        }

        if leaf_count != self.num_leaves {
            return Err(anyhow::anyhow!(
                "Leaf count mismatch: expected {}, found {}",
                self.num_leaves,
                leaf_count
            ));
        }

        Ok(())
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tree(nodes={}, leaves={}, depth={}, shrinkage={})",
            self.num_nodes(),
            self.num_leaves(),
            self.depth(),
            self.shrinkage()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    fn stump(feature: FeatureIndex, threshold: f64, gain: f64) -> Tree {
        let mut tree = Tree::new(31);
        tree.node_mut(0).unwrap().update_statistics(0.0, 10.0, 100);

        let split = SplitInfo {
            feature,
            threshold_value: threshold,
            gain,
            left_sum_gradient: -10.0,
            left_sum_hessian: 5.0,
            left_count: 60,
            right_sum_gradient: 10.0,
            right_sum_hessian: 5.0,
            right_count: 40,
            left_output: 1.0,
            right_output: -1.0,
            ..SplitInfo::default()
        };
        tree.split_node(0, &split).unwrap();
        tree
    }

    #[test]
    fn test_new_tree() {
        let tree = Tree::new(31);
        assert_eq!(tree.num_nodes(), 1);
        assert_eq!(tree.num_leaves(), 1);
        assert_eq!(tree.max_leaves(), 31);
        assert_eq!(tree.depth(), 0);
        assert!(tree.root().is_leaf());
    }

    #[test]
    fn test_split_node() {
        let tree = stump(5, 2.5, 1.5);

        assert_eq!(tree.num_nodes(), 3);
        assert_eq!(tree.num_leaves(), 2);
        assert_eq!(tree.depth(), 1);
        assert!(!tree.root().is_leaf());
        assert_eq!(tree.root().split_feature(), Some(5));
        assert_eq!(tree.node(1).unwrap().data_count(), 60);
        assert_eq!(tree.node(2).unwrap().leaf_output(), -1.0);
    }

    #[test]
    fn test_split_respects_max_leaves() {
        let mut tree = Tree::new(1);
        let result = tree.split_node(0, &SplitInfo::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_predict_simple() {
        let tree = stump(0, 2.5, 1.0);

        let features1 = Array1::from(vec![2.0, 0.0, 0.0]);
        let features2 = Array1::from(vec![3.0, 0.0, 0.0]);
        let missing = Array1::from(vec![f32::NAN, 0.0, 0.0]);

        assert_eq!(tree.predict(&features1.view()).unwrap(), 1.0);
        assert_eq!(tree.predict(&features2.view()).unwrap(), -1.0);
        assert_eq!(tree.predict(&missing.view()).unwrap(), 1.0);
    }

    #[test]
    fn test_predict_applies_shrinkage() {
        let mut tree = Tree::with_capacity(4, 0.5);
        tree.set_leaf_output(0, 3.0).unwrap();
        let features = Array1::from(vec![1.0]);
        assert_eq!(tree.predict(&features.view()).unwrap(), 1.5);
    }

    #[test]
    fn test_predict_leaf_index_and_path() {
        let tree = stump(0, 2.5, 1.0);

        let features1 = Array1::from(vec![2.0]);
        let features2 = Array1::from(vec![3.0]);

        assert_eq!(tree.predict_leaf_index(&features1.view()).unwrap(), 1);
        assert_eq!(tree.predict_leaf_index(&features2.view()).unwrap(), 2);
        assert_eq!(tree.decision_path(&features2.view()).unwrap(), vec![0, 2]);
        assert_eq!(tree.path_features(&features2.view()).unwrap(), vec![0]);
    }

    #[test]
    fn test_predict_short_input_is_error() {
        let tree = stump(3, 2.5, 1.0);
        let features = Array1::from(vec![1.0]);
        assert!(tree.predict(&features.view()).is_err());
    }

    #[test]
    fn test_feature_importance() {
        let tree = stump(2, 2.5, 1.5);

        let gain = tree.feature_importance(5, ImportanceType::Gain);
        assert_eq!(gain, vec![0.0, 0.0, 1.5, 0.0, 0.0]);

        let split = tree.feature_importance(3, ImportanceType::Split);
        assert_eq!(split, vec![0.0, 0.0, 1.0]);
        assert_eq!(tree.used_features().into_iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_tree_validation() {
        assert!(Tree::new(31).validate().is_ok());
        assert!(stump(0, 2.5, 1.0).validate().is_ok());
    }

    #[test]
    fn test_from_nodes_rebuilds_structure() {
        let original = stump(1, 0.5, 2.0);
        let rebuilt = Tree::from_nodes(original.nodes().to_vec(), original.shrinkage()).unwrap();

        assert_eq!(rebuilt.num_leaves(), 2);
        assert_eq!(rebuilt.depth(), 1);
        assert_eq!(rebuilt.node(2).unwrap().parent(), Some(0));
    }

    #[test]
    fn test_from_nodes_rejects_dangling_child() {
        let mut root = TreeNode::new_leaf(0.0, 0.0, 0, 0, None);
        root.set_split(NodeSplit {
            feature: 0,
            threshold: 1.0,
            gain: 1.0,
            default_left: true,
            left_child: 1,
            right_child: 7,
        });
        let leaf = TreeNode::new_leaf(0.0, 0.0, 0, 0, None);

        assert!(Tree::from_nodes(vec![root, leaf], 1.0).is_err());
        assert!(Tree::from_nodes(Vec::new(), 1.0).is_err());
    }

    #[test]
    fn test_string_representation() {
        let text = stump(0, 2.5, 1.0).to_string_representation();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("Internal(feature=0"));
    }
}
