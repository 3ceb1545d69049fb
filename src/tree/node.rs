//! Tree node implementation.
//!
//! A node is either a leaf carrying an output value or an internal node
//! carrying a numerical split `value <= threshold` and two children.

use crate::core::types::{DataSize, FeatureIndex, NodeIndex};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Split stored on an internal node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeSplit {
    /// Feature compared at this node
    pub feature: FeatureIndex,
    /// Values `<= threshold` go left
    pub threshold: f64,
    /// Raw statistical gain of the split
    pub gain: f64,
    /// Direction taken by missing (NaN) values
    pub default_left: bool,
    /// Left child node index
    pub left_child: NodeIndex,
    /// Right child node index
    pub right_child: NodeIndex,
}

impl NodeSplit {
    /// Child reached by a feature value.
    pub fn next_node(&self, value: f64) -> NodeIndex {
        let go_left = if value.is_nan() {
            self.default_left
        } else {
            value <= self.threshold
        };
        if go_left {
            self.left_child
        } else {
            self.right_child
        }
    }
}

/// Tree node representation supporting both internal and leaf nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Parent node index (None for root node)
    parent: Option<NodeIndex>,
    /// Split (None for leaves)
    split: Option<NodeSplit>,
    /// Output value; meaningful for leaves
    leaf_output: f64,
    /// Sum of gradients in this node
    sum_gradients: f64,
    /// Sum of hessians in this node
    sum_hessians: f64,
    /// Number of data points in this node
    data_count: DataSize,
    /// Node depth in the tree
    depth: usize,
}

impl TreeNode {
    /// Creates a new leaf node with the given statistics.
    pub fn new_leaf(
        sum_gradients: f64,
        sum_hessians: f64,
        data_count: DataSize,
        depth: usize,
        parent: Option<NodeIndex>,
    ) -> Self {
        TreeNode {
            parent,
            split: None,
            leaf_output: 0.0,
            sum_gradients,
            sum_hessians,
            data_count,
            depth,
        }
    }

    /// Returns true if this node is a leaf node.
    pub fn is_leaf(&self) -> bool {
        self.split.is_none()
    }

    /// Returns the split of an internal node.
    pub fn split(&self) -> Option<&NodeSplit> {
        self.split.as_ref()
    }

    /// Returns the split feature index (for internal nodes).
    pub fn split_feature(&self) -> Option<FeatureIndex> {
        self.split.map(|s| s.feature)
    }

    /// Returns the split gain, 0 for leaves.
    pub fn split_gain(&self) -> f64 {
        self.split.map_or(0.0, |s| s.gain)
    }

    /// Returns the parent node index.
    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeIndex>) {
        self.parent = parent;
    }

    /// Returns the leaf output value.
    pub fn leaf_output(&self) -> f64 {
        self.leaf_output
    }

    /// Sets the leaf output value.
    pub fn set_leaf_output(&mut self, output: f64) {
        self.leaf_output = output;
    }

    /// Returns the sum of gradients in this node.
    pub fn sum_gradients(&self) -> f64 {
        self.sum_gradients
    }

    /// Returns the sum of hessians in this node.
    pub fn sum_hessians(&self) -> f64 {
        self.sum_hessians
    }

    /// Returns the number of data points in this node.
    pub fn data_count(&self) -> DataSize {
        self.data_count
    }

    /// Returns the node depth in the tree.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
    }

    /// Converts this node from leaf to internal node with the given split.
    pub fn set_split(&mut self, split: NodeSplit) {
        self.split = Some(split);
        self.leaf_output = 0.0;
    }

    /// Updates the node statistics.
    pub fn update_statistics(&mut self, sum_gradients: f64, sum_hessians: f64, data_count: DataSize) {
        self.sum_gradients = sum_gradients;
        self.sum_hessians = sum_hessians;
        self.data_count = data_count;
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.split {
            None => write!(
                f,
                "Leaf(output={:.4}, data_count={}, sum_gradients={:.4}, sum_hessians={:.4})",
                self.leaf_output, self.data_count, self.sum_gradients, self.sum_hessians
            ),
            Some(split) => write!(
                f,
                "Internal(feature={}, threshold={:.4}, gain={:.4}, data_count={})",
                split.feature, split.threshold, split.gain, self.data_count
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_split() -> NodeSplit {
        NodeSplit {
            feature: 3,
            threshold: 2.5,
            gain: 1.2,
            default_left: true,
            left_child: 1,
            right_child: 2,
        }
    }

    #[test]
    fn test_new_leaf_node() {
        let node = TreeNode::new_leaf(10.0, 5.0, 100, 2, Some(0));

        assert!(node.is_leaf());
        assert_eq!(node.sum_gradients(), 10.0);
        assert_eq!(node.sum_hessians(), 5.0);
        assert_eq!(node.data_count(), 100);
        assert_eq!(node.depth(), 2);
        assert_eq!(node.parent(), Some(0));
        assert!(node.split().is_none());
        assert_eq!(node.split_gain(), 0.0);
    }

    #[test]
    fn test_set_split() {
        let mut node = TreeNode::new_leaf(10.0, 5.0, 100, 1, Some(0));
        node.set_leaf_output(0.7);
        node.set_split(sample_split());

        assert!(!node.is_leaf());
        assert_eq!(node.split_feature(), Some(3));
        assert_eq!(node.split_gain(), 1.2);
        assert_eq!(node.leaf_output(), 0.0);
    }

    #[test]
    fn test_next_node() {
        let split = sample_split();
        assert_eq!(split.next_node(2.5), 1);
        assert_eq!(split.next_node(2.6), 2);
        assert_eq!(split.next_node(f64::NAN), 1);

        let right_default = NodeSplit {
            default_left: false,
            ..split
        };
        assert_eq!(right_default.next_node(f64::NAN), 2);
    }

    #[test]
    fn test_display() {
        let mut node = TreeNode::new_leaf(1.0, 2.0, 3, 0, None);
        assert!(node.to_string().starts_with("Leaf("));
        node.set_split(sample_split());
        assert!(node.to_string().contains("feature=3"));
    }
}
