//! Serial tree learner implementation.
//!
//! Grows a tree leaf-wise (best-first): at every step the open leaf whose
//! best split has the largest gain is split. The primitives used here
//! (`init_root`, `find_best_thresholds`, `split`) are public so other
//! learners can drive growth with their own leaf selection.

use crate::config::Config;
use crate::core::types::{DataSize, FeatureIndex, NodeIndex, Score};
use crate::dataset::Dataset;
use crate::tree::histogram::{FeatureHistogram, HistogramBuilder, HistogramBuilderConfig};
use crate::tree::split::{SplitFinder, SplitFinderConfig, SplitInfo};
use crate::tree::tree::Tree;
use ndarray::ArrayView1;
use std::collections::BTreeSet;

/// Configuration for the serial tree learner.
#[derive(Debug, Clone)]
pub struct SerialTreeLearnerConfig {
    /// Maximum number of leaves in the tree
    pub num_leaves: usize,
    /// Maximum tree depth, `<= 0` means unlimited
    pub max_depth: i32,
    /// Minimum number of data points required in each leaf
    pub min_data_in_leaf: DataSize,
    /// Minimum sum of hessians required in each leaf
    pub min_sum_hessian_in_leaf: f64,
    /// L1 regularization parameter
    pub lambda_l1: f64,
    /// L2 regularization parameter
    pub lambda_l2: f64,
    /// Minimum gain required for a split
    pub min_gain_to_split: f64,
    /// Learning rate (shrinkage) for the tree
    pub learning_rate: f64,
    /// Histogram builder configuration
    pub histogram_config: HistogramBuilderConfig,
}

impl Default for SerialTreeLearnerConfig {
    fn default() -> Self {
        SerialTreeLearnerConfig::from_config(&Config::default())
    }
}

impl SerialTreeLearnerConfig {
    /// Extracts tree growth parameters from a boosting configuration.
    pub fn from_config(config: &Config) -> Self {
        SerialTreeLearnerConfig {
            num_leaves: config.num_leaves,
            max_depth: config.max_depth,
            min_data_in_leaf: config.min_data_in_leaf,
            min_sum_hessian_in_leaf: config.min_sum_hessian_in_leaf,
            lambda_l1: config.lambda_l1,
            lambda_l2: config.lambda_l2,
            min_gain_to_split: config.min_gain_to_split,
            learning_rate: config.learning_rate,
            histogram_config: HistogramBuilderConfig {
                num_threads: config.effective_num_threads(),
                ..HistogramBuilderConfig::default()
            },
        }
    }

    fn split_finder_config(&self) -> SplitFinderConfig {
        SplitFinderConfig {
            min_data_in_leaf: self.min_data_in_leaf,
            min_sum_hessian_in_leaf: self.min_sum_hessian_in_leaf,
            lambda_l1: self.lambda_l1,
            lambda_l2: self.lambda_l2,
            min_gain_to_split: self.min_gain_to_split,
        }
    }
}

/// Information about an open leaf of the tree being grown.
#[derive(Debug, Clone)]
pub struct LeafState {
    /// Node index in the tree
    pub node_index: NodeIndex,
    /// Data indices belonging to this leaf
    pub data_indices: Vec<DataSize>,
    /// Leaf depth
    pub depth: usize,
    /// Sum of gradients in this leaf
    pub sum_gradients: f64,
    /// Sum of hessians in this leaf
    pub sum_hessians: f64,
    /// Features split on along the path from the root to this leaf
    pub path_features: BTreeSet<FeatureIndex>,
    /// Histograms of every feature, kept for sibling subtraction
    histograms: Option<Vec<FeatureHistogram>>,
}

impl LeafState {
    /// Number of rows in this leaf.
    pub fn num_data(&self) -> DataSize {
        self.data_indices.len() as DataSize
    }
}

/// Picks the highest-gain candidate; ties go to the lowest feature index.
pub fn best_candidate(candidates: &[Option<SplitInfo>]) -> Option<&SplitInfo> {
    let mut best: Option<&SplitInfo> = None;
    for split in candidates.iter().flatten() {
        if best.map_or(true, |b| split.gain > b.gain) {
            best = Some(split);
        }
    }
    best
}

/// Serial tree learner implementing the core GBDT tree construction algorithm.
#[derive(Debug, Clone)]
pub struct SerialTreeLearner {
    config: SerialTreeLearnerConfig,
    histogram_builder: HistogramBuilder,
    split_finder: SplitFinder,
}

impl SerialTreeLearner {
    /// Creates a new serial tree learner with the given configuration.
    pub fn new(config: SerialTreeLearnerConfig) -> anyhow::Result<Self> {
        if config.num_leaves < 2 {
            return Err(anyhow::anyhow!(
                "num_leaves must be at least 2, got {}",
                config.num_leaves
            ));
        }

        let histogram_builder = HistogramBuilder::new(config.histogram_config.clone());
        let split_finder = SplitFinder::new(config.split_finder_config());

        Ok(SerialTreeLearner {
            config,
            histogram_builder,
            split_finder,
        })
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &SerialTreeLearnerConfig {
        &self.config
    }

    /// Prepares the root leaf: statistics, output and row set.
    ///
    /// With `bagging` only the listed rows take part in growth.
    pub fn init_root(
        &self,
        tree: &mut Tree,
        dataset: &Dataset,
        gradients: &ArrayView1<'_, Score>,
        hessians: &ArrayView1<'_, Score>,
        bagging: Option<&[DataSize]>,
    ) -> anyhow::Result<LeafState> {
        let num_data = dataset.num_data();
        if gradients.len() != num_data || hessians.len() != num_data {
            return Err(anyhow::anyhow!(
                "Gradient and hessian arrays must match dataset size {}",
                num_data
            ));
        }

        let data_indices: Vec<DataSize> = match bagging {
            Some(indices) => {
                if let Some(&bad) = indices.iter().find(|&&i| i < 0 || i as usize >= num_data) {
                    return Err(anyhow::anyhow!("Bagging index {} out of bounds", bad));
                }
                indices.to_vec()
            }
            None => (0..num_data as DataSize).collect(),
        };

        if data_indices.is_empty() {
            return Err(anyhow::anyhow!("No data to grow a tree on"));
        }

        let sum_gradients: f64 = data_indices.iter().map(|&i| gradients[i as usize] as f64).sum();
        let sum_hessians: f64 = data_indices.iter().map(|&i| hessians[i as usize] as f64).sum();

        let root_output = self.split_finder.leaf_output(sum_gradients, sum_hessians);
        let root = tree
            .node_mut(0)
            .ok_or_else(|| anyhow::anyhow!("Tree has no root"))?;
        root.update_statistics(sum_gradients, sum_hessians, data_indices.len() as DataSize);
        root.set_leaf_output(root_output);

        Ok(LeafState {
            node_index: 0,
            data_indices,
            depth: 0,
            sum_gradients,
            sum_hessians,
            path_features: BTreeSet::new(),
            histograms: None,
        })
    }

    /// Returns false when depth, row count or hessian mass rule out any split.
    pub fn can_split(&self, leaf: &LeafState) -> bool {
        if self.config.max_depth > 0 && leaf.depth >= self.config.max_depth as usize {
            return false;
        }
        leaf.num_data() >= 2 * self.config.min_data_in_leaf.max(1)
            && leaf.sum_hessians >= 2.0 * self.config.min_sum_hessian_in_leaf
    }

    /// Best threshold of every feature for `leaf`, indexed by feature.
    ///
    /// Histograms are built (or reused from the split that created the
    /// leaf) and cached on the leaf for its children.
    pub fn find_best_thresholds(
        &self,
        dataset: &Dataset,
        gradients: &ArrayView1<'_, Score>,
        hessians: &ArrayView1<'_, Score>,
        leaf: &mut LeafState,
    ) -> anyhow::Result<Vec<Option<SplitInfo>>> {
        let num_features = dataset.num_features();
        if !self.can_split(leaf) {
            return Ok(vec![None; num_features]);
        }

        let histograms = match leaf.histograms.take() {
            Some(histograms) => histograms,
            None => {
                let features: Vec<FeatureIndex> = (0..num_features).collect();
                self.histogram_builder.construct_histograms(
                    dataset,
                    gradients,
                    hessians,
                    &leaf.data_indices,
                    &features,
                )?
            }
        };

        let mut candidates = Vec::with_capacity(num_features);
        for histogram in &histograms {
            let bin_mapper = dataset
                .bin_mapper(histogram.feature_index())
                .ok_or_else(|| anyhow::anyhow!("Feature {} has no bin mapper", histogram.feature_index()))?;
            candidates.push(self.split_finder.find_best_split_for_feature(
                histogram,
                leaf.sum_gradients,
                leaf.sum_hessians,
                leaf.num_data(),
                bin_mapper.bin_upper_bounds(),
            ));
        }

        leaf.histograms = Some(histograms);
        Ok(candidates)
    }

    /// Commits `split` on `leaf` and returns the two child leaves.
    ///
    /// Rows whose bin is `<= split.threshold_bin` go left. When the parent
    /// histograms are cached, only the smaller child is rebuilt and the
    /// larger one is derived by subtraction.
    pub fn split(
        &self,
        tree: &mut Tree,
        dataset: &Dataset,
        gradients: &ArrayView1<'_, Score>,
        hessians: &ArrayView1<'_, Score>,
        leaf: &LeafState,
        split: &SplitInfo,
    ) -> anyhow::Result<(LeafState, LeafState)> {
        let bins = dataset.feature_bins(split.feature);
        let (left_indices, right_indices): (Vec<DataSize>, Vec<DataSize>) = leaf
            .data_indices
            .iter()
            .partition(|&&i| bins[i as usize] <= split.threshold_bin);

        if left_indices.len() as DataSize != split.left_count
            || right_indices.len() as DataSize != split.right_count
        {
            return Err(anyhow::anyhow!(
                "Partition of leaf {} on feature {} disagrees with its histogram: {}/{} vs {}/{}",
                leaf.node_index,
                split.feature,
                left_indices.len(),
                right_indices.len(),
                split.left_count,
                split.right_count
            ));
        }

        let (left_node, right_node) = tree.split_node(leaf.node_index, split)?;

        let (left_histograms, right_histograms) = match &leaf.histograms {
            Some(parent) => {
                let features: Vec<FeatureIndex> = (0..dataset.num_features()).collect();
                let left_is_smaller = left_indices.len() <= right_indices.len();
                let smaller_indices = if left_is_smaller { &left_indices } else { &right_indices };
                let smaller = self.histogram_builder.construct_histograms(
                    dataset,
                    gradients,
                    hessians,
                    smaller_indices,
                    &features,
                )?;
                let larger = parent
                    .iter()
                    .zip(&smaller)
                    .map(|(p, s)| self.histogram_builder.construct_histogram_by_subtraction(p, s))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                if left_is_smaller {
                    (Some(smaller), Some(larger))
                } else {
                    (Some(larger), Some(smaller))
                }
            }
            None => (None, None),
        };

        let mut path_features = leaf.path_features.clone();
        path_features.insert(split.feature);

        let left = LeafState {
            node_index: left_node,
            data_indices: left_indices,
            depth: leaf.depth + 1,
            sum_gradients: split.left_sum_gradient,
            sum_hessians: split.left_sum_hessian,
            path_features: path_features.clone(),
            histograms: left_histograms,
        };
        let right = LeafState {
            node_index: right_node,
            data_indices: right_indices,
            depth: leaf.depth + 1,
            sum_gradients: split.right_sum_gradient,
            sum_hessians: split.right_sum_hessian,
            path_features,
            histograms: right_histograms,
        };

        Ok((left, right))
    }

    /// Trains a decision tree using the given dataset, gradients, and hessians.
    pub fn train(
        &self,
        dataset: &Dataset,
        gradients: &ArrayView1<'_, Score>,
        hessians: &ArrayView1<'_, Score>,
        bagging: Option<&[DataSize]>,
    ) -> anyhow::Result<Tree> {
        let mut tree = Tree::with_capacity(self.config.num_leaves, self.config.learning_rate);
        let root = self.init_root(&mut tree, dataset, gradients, hessians, bagging)?;

        let mut open: Vec<(LeafState, Option<SplitInfo>)> = Vec::new();
        let mut pending = vec![root];

        while tree.num_leaves() < self.config.num_leaves {
            for mut leaf in pending.drain(..) {
                let candidates = self.find_best_thresholds(dataset, gradients, hessians, &mut leaf)?;
                let best = best_candidate(&candidates).cloned();
                open.push((leaf, best));
            }

            let mut chosen: Option<usize> = None;
            for (i, (leaf, best)) in open.iter().enumerate() {
                let Some(split) = best else { continue };
                let better = match chosen {
                    None => true,
                    Some(c) => {
                        let (current_leaf, current) = &open[c];
                        let current_gain = current.as_ref().map_or(f64::NEG_INFINITY, |s| s.gain);
                        split.gain > current_gain
                            || (split.gain == current_gain && leaf.node_index < current_leaf.node_index)
                    }
                };
                if better {
                    chosen = Some(i);
                }
            }

            let Some(index) = chosen else { break };
            let (leaf, best) = open.swap_remove(index);
            let Some(split) = best else { break };

            log::trace!(
                "Splitting leaf {} on feature {} (gain={:.6})",
                leaf.node_index,
                split.feature,
                split.gain
            );
            let (left, right) = self.split(&mut tree, dataset, gradients, hessians, &leaf, &split)?;
            pending.push(left);
            pending.push(right);
        }

        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn small_config() -> SerialTreeLearnerConfig {
        SerialTreeLearnerConfig {
            num_leaves: 4,
            max_depth: -1,
            min_data_in_leaf: 1,
            min_sum_hessian_in_leaf: 0.1,
            lambda_l1: 0.0,
            lambda_l2: 0.1,
            learning_rate: 1.0,
            ..Default::default()
        }
    }

    fn step_dataset() -> (Dataset, Array1<Score>, Array1<Score>) {
        // feature 0 separates the gradients, feature 1 is noise
        let features = Array2::from_shape_vec(
            (6, 2),
            vec![1.0, 1.0, 2.0, 2.0, 3.0, 1.0, 4.0, 2.0, 5.0, 1.0, 6.0, 2.0],
        )
        .unwrap();
        let dataset = Dataset::new(features, Array1::zeros(6), 16).unwrap();
        let gradients = Array1::from(vec![-2.0, -2.0, -2.0, 2.0, 2.0, 2.0]);
        let hessians = Array1::from(vec![1.0; 6]);
        (dataset, gradients, hessians)
    }

    #[test]
    fn test_serial_tree_learner_creation() {
        assert!(SerialTreeLearner::new(SerialTreeLearnerConfig::default()).is_ok());
        let bad = SerialTreeLearnerConfig {
            num_leaves: 1,
            ..Default::default()
        };
        assert!(SerialTreeLearner::new(bad).is_err());
    }

    #[test]
    fn test_simple_tree_training() {
        let (dataset, gradients, hessians) = step_dataset();
        let learner = SerialTreeLearner::new(small_config()).unwrap();

        let tree = learner
            .train(&dataset, &gradients.view(), &hessians.view(), None)
            .unwrap();

        assert!(tree.validate().is_ok());
        assert_eq!(tree.root().split_feature(), Some(0));
        assert_eq!(tree.root().split().unwrap().threshold, 3.0);

        let low = Array1::from(vec![2.0f32, 1.0]);
        let high = Array1::from(vec![5.0f32, 1.0]);
        assert!(tree.predict(&low.view()).unwrap() > 0.0);
        assert!(tree.predict(&high.view()).unwrap() < 0.0);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let (dataset, gradients, hessians) = step_dataset();
        let config = SerialTreeLearnerConfig {
            max_depth: 1,
            ..small_config()
        };
        let learner = SerialTreeLearner::new(config).unwrap();
        let tree = learner
            .train(&dataset, &gradients.view(), &hessians.view(), None)
            .unwrap();
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.num_leaves(), 2);
    }

    #[test]
    fn test_find_best_thresholds_is_per_feature() {
        let (dataset, gradients, hessians) = step_dataset();
        let learner = SerialTreeLearner::new(small_config()).unwrap();
        let mut tree = Tree::new(4);
        let mut root = learner
            .init_root(&mut tree, &dataset, &gradients.view(), &hessians.view(), None)
            .unwrap();

        let candidates = learner
            .find_best_thresholds(&dataset, &gradients.view(), &hessians.view(), &mut root)
            .unwrap();
        assert_eq!(candidates.len(), 2);
        let best = best_candidate(&candidates).unwrap();
        assert_eq!(best.feature, 0);
        assert_eq!(best.left_count, 3);
    }

    #[test]
    fn test_split_partitions_rows_and_paths() {
        let (dataset, gradients, hessians) = step_dataset();
        let learner = SerialTreeLearner::new(small_config()).unwrap();
        let mut tree = Tree::new(4);
        let mut root = learner
            .init_root(&mut tree, &dataset, &gradients.view(), &hessians.view(), None)
            .unwrap();
        let candidates = learner
            .find_best_thresholds(&dataset, &gradients.view(), &hessians.view(), &mut root)
            .unwrap();
        let split = candidates[0].clone().unwrap();

        let (mut left, right) = learner
            .split(&mut tree, &dataset, &gradients.view(), &hessians.view(), &root, &split)
            .unwrap();

        assert_eq!(left.data_indices, vec![0, 1, 2]);
        assert_eq!(right.data_indices, vec![3, 4, 5]);
        assert!(left.path_features.contains(&0));
        assert_eq!(left.depth, 1);

        // the subtracted histograms agree with a direct build
        let reused = learner
            .find_best_thresholds(&dataset, &gradients.view(), &hessians.view(), &mut left)
            .unwrap();
        let mut fresh = left.clone();
        fresh.histograms = None;
        let rebuilt = learner
            .find_best_thresholds(&dataset, &gradients.view(), &hessians.view(), &mut fresh)
            .unwrap();
        assert_eq!(reused, rebuilt);
    }

    #[test]
    fn test_bagging_restricts_root() {
        let (dataset, gradients, hessians) = step_dataset();
        let learner = SerialTreeLearner::new(small_config()).unwrap();
        let mut tree = Tree::new(4);
        let root = learner
            .init_root(&mut tree, &dataset, &gradients.view(), &hessians.view(), Some(&[0, 3][..]))
            .unwrap();
        assert_eq!(root.num_data(), 2);
        assert_eq!(root.sum_gradients, 0.0);
        assert_eq!(tree.root().data_count(), 2);

        let out_of_range =
            learner.init_root(&mut tree, &dataset, &gradients.view(), &hessians.view(), Some(&[9][..]));
        assert!(out_of_range.is_err());
    }

    #[test]
    fn test_gradient_size_mismatch() {
        let (dataset, _, _) = step_dataset();
        let learner = SerialTreeLearner::new(small_config()).unwrap();
        let short = Array1::from(vec![1.0f32; 2]);
        let result = learner.train(&dataset, &short.view(), &short.view(), None);
        assert!(result.is_err());
    }
}
