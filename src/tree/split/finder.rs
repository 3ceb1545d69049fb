//! Split finding implementation.
//!
//! Scans a feature histogram from the lowest bin upwards and evaluates every
//! threshold `bin <= b` with L1/L2-regularized gain.

use crate::core::constants::K_EPSILON;
use crate::core::types::{BinIndex, DataSize, FeatureIndex};
use crate::tree::histogram::FeatureHistogram;

/// Information about a potential split point.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitInfo {
    /// Feature index for the split
    pub feature: FeatureIndex,
    /// Highest bin sent to the left child
    pub threshold_bin: BinIndex,
    /// Actual threshold value; `value <= threshold_value` goes left
    pub threshold_value: f64,
    /// Split gain (improvement in loss function)
    pub gain: f64,
    /// Left child statistics
    pub left_sum_gradient: f64,
    pub left_sum_hessian: f64,
    pub left_count: DataSize,
    /// Right child statistics
    pub right_sum_gradient: f64,
    pub right_sum_hessian: f64,
    pub right_count: DataSize,
    /// Output values for children
    pub left_output: f64,
    pub right_output: f64,
    /// Default direction for missing values (true = left, false = right)
    pub default_left: bool,
}

impl SplitInfo {
    /// Creates a new empty split info.
    pub fn new() -> Self {
        SplitInfo {
            feature: 0,
            threshold_bin: 0,
            threshold_value: 0.0,
            gain: 0.0,
            left_sum_gradient: 0.0,
            left_sum_hessian: 0.0,
            left_count: 0,
            right_sum_gradient: 0.0,
            right_sum_hessian: 0.0,
            right_count: 0,
            left_output: 0.0,
            right_output: 0.0,
            default_left: true,
        }
    }

    /// Returns true if this split is valid and beneficial.
    pub fn is_valid(&self) -> bool {
        self.gain > 0.0 && self.left_count > 0 && self.right_count > 0
    }

    /// Calculates the leaf output values using regularization parameters.
    pub fn calculate_outputs(&mut self, lambda_l1: f64, lambda_l2: f64) {
        self.left_output = leaf_output(self.left_sum_gradient, self.left_sum_hessian, lambda_l1, lambda_l2);
        self.right_output =
            leaf_output(self.right_sum_gradient, self.right_sum_hessian, lambda_l1, lambda_l2);
    }
}

impl Default for SplitInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// L1 soft-thresholding of a gradient sum.
fn threshold_l1(sum_gradient: f64, lambda_l1: f64) -> f64 {
    let reduced = (sum_gradient.abs() - lambda_l1).max(0.0);
    reduced.copysign(sum_gradient)
}

/// Optimal leaf output `-T(G) / (H + λ2)` for given statistics.
pub fn leaf_output(sum_gradient: f64, sum_hessian: f64, lambda_l1: f64, lambda_l2: f64) -> f64 {
    let denominator = sum_hessian + lambda_l2;
    if denominator <= K_EPSILON {
        return 0.0;
    }
    -threshold_l1(sum_gradient, lambda_l1) / denominator
}

/// Loss reduction `T(G)² / (2 (H + λ2))` of a leaf at its optimal output.
pub fn leaf_gain(sum_gradient: f64, sum_hessian: f64, lambda_l1: f64, lambda_l2: f64) -> f64 {
    let denominator = sum_hessian + lambda_l2;
    if denominator <= K_EPSILON {
        return 0.0;
    }
    let numerator = threshold_l1(sum_gradient, lambda_l1);
    (numerator * numerator) / (2.0 * denominator)
}

/// Configuration for split finding operations.
#[derive(Debug, Clone)]
pub struct SplitFinderConfig {
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
}

impl Default for SplitFinderConfig {
    fn default() -> Self {
        SplitFinderConfig {
            min_data_in_leaf: 20,
            min_sum_hessian_in_leaf: 1e-3,
            lambda_l1: 0.0,
            lambda_l2: 0.0,
            min_gain_to_split: 0.0,
        }
    }
}

/// Split finder for identifying optimal split points using histogram data.
#[derive(Debug, Clone, Default)]
pub struct SplitFinder {
    config: SplitFinderConfig,
}

impl SplitFinder {
    /// Creates a new split finder with the given configuration.
    pub fn new(config: SplitFinderConfig) -> Self {
        SplitFinder { config }
    }

    /// Finds the best threshold for one feature.
    ///
    /// `bin_upper_bounds` come from the feature's bin mapper; the threshold
    /// of bin `b` is its upper bound. Missing values live in bin 0 and
    /// therefore always go left. Among equal gains the lowest bin wins.
    pub fn find_best_split_for_feature(
        &self,
        histogram: &FeatureHistogram,
        total_sum_gradient: f64,
        total_sum_hessian: f64,
        total_count: DataSize,
        bin_upper_bounds: &[f64],
    ) -> Option<SplitInfo> {
        let num_bins = histogram.num_bins();
        if num_bins < 2 {
            return None;
        }

        let parent_gain = self.leaf_gain(total_sum_gradient, total_sum_hessian);
        let mut best_split: Option<SplitInfo> = None;

        let mut left_sum_gradient = 0.0;
        let mut left_sum_hessian = 0.0;
        let mut left_count = 0;

        for bin in 0..num_bins - 1 {
            left_sum_gradient += histogram.gradient(bin);
            left_sum_hessian += histogram.hessian(bin);
            left_count += histogram.count(bin);

            let right_sum_gradient = total_sum_gradient - left_sum_gradient;
            let right_sum_hessian = total_sum_hessian - left_sum_hessian;
            let right_count = total_count - left_count;

            if left_count < self.config.min_data_in_leaf
                || right_count < self.config.min_data_in_leaf
                || left_sum_hessian < self.config.min_sum_hessian_in_leaf
                || right_sum_hessian < self.config.min_sum_hessian_in_leaf
            {
                continue;
            }

            let gain = self.leaf_gain(left_sum_gradient, left_sum_hessian)
                + self.leaf_gain(right_sum_gradient, right_sum_hessian)
                - parent_gain;

            if gain <= self.config.min_gain_to_split {
                continue;
            }

            if best_split.as_ref().map_or(true, |best| gain > best.gain) {
                best_split = Some(SplitInfo {
                    feature: histogram.feature_index(),
                    threshold_bin: bin as BinIndex,
                    threshold_value: bin_upper_bounds.get(bin).copied().unwrap_or(bin as f64),
                    gain,
                    left_sum_gradient,
                    left_sum_hessian,
                    left_count,
                    right_sum_gradient,
                    right_sum_hessian,
                    right_count,
                    left_output: 0.0,
                    right_output: 0.0,
                    default_left: true,
                });
            }
        }

        best_split.filter(SplitInfo::is_valid).map(|mut split| {
            split.calculate_outputs(self.config.lambda_l1, self.config.lambda_l2);
            split
        })
    }

    /// Leaf output under this finder's regularization.
    pub fn leaf_output(&self, sum_gradient: f64, sum_hessian: f64) -> f64 {
        leaf_output(sum_gradient, sum_hessian, self.config.lambda_l1, self.config.lambda_l2)
    }

    fn leaf_gain(&self, sum_gradient: f64, sum_hessian: f64) -> f64 {
        leaf_gain(sum_gradient, sum_hessian, self.config.lambda_l1, self.config.lambda_l2)
    }

    /// Returns a reference to the current configuration.
    pub fn config(&self) -> &SplitFinderConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn histogram(bins: &[(f64, f64, usize)]) -> FeatureHistogram {
        let mut histogram = FeatureHistogram::new(0, bins.len());
        for (bin, &(g, h, n)) in bins.iter().enumerate() {
            for _ in 0..n {
                histogram.accumulate(bin, g / n as f64, h / n as f64);
            }
        }
        histogram
    }

    fn permissive() -> SplitFinder {
        SplitFinder::new(SplitFinderConfig {
            min_data_in_leaf: 1,
            min_sum_hessian_in_leaf: 0.1,
            lambda_l1: 0.0,
            lambda_l2: 0.1,
            min_gain_to_split: 0.0,
        })
    }

    #[test]
    fn test_split_info_creation() {
        let split = SplitInfo::new();
        assert_eq!(split.gain, 0.0);
        assert!(split.default_left);
        assert!(!split.is_valid());
    }

    #[test]
    fn test_calculate_outputs() {
        let mut split = SplitInfo::new();
        split.left_sum_gradient = -10.0;
        split.left_sum_hessian = 5.0;
        split.right_sum_gradient = 5.0;
        split.right_sum_hessian = 3.0;

        split.calculate_outputs(0.0, 0.1);

        assert!((split.left_output - 1.9608).abs() < 1e-3);
        assert!((split.right_output - (-1.6129)).abs() < 1e-3);
    }

    #[test]
    fn test_leaf_gain_and_output() {
        assert_eq!(leaf_gain(10.0, 5.0, 0.0, 0.0), 10.0);
        assert_eq!(leaf_gain(1.0, 5.0, 2.0, 0.0), 0.0);
        assert_eq!(leaf_output(-4.0, 1.0, 1.0, 1.0), 1.5);
        assert_eq!(leaf_output(3.0, 0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_find_best_split_simple() {
        let finder = permissive();
        let histogram = histogram(&[(-10.0, 5.0, 5), (-5.0, 3.0, 3), (5.0, 2.0, 2), (10.0, 4.0, 4)]);
        let bounds = vec![1.0, 2.0, 3.0, 4.0];

        let split = finder
            .find_best_split_for_feature(&histogram, 0.0, 14.0, 14, &bounds)
            .unwrap();

        assert!(split.is_valid());
        assert_eq!(split.threshold_bin, 1);
        assert_eq!(split.threshold_value, 2.0);
        assert_eq!(split.left_count, 8);
        assert_eq!(split.right_count, 6);
        assert!(split.left_output > 0.0);
        assert!(split.right_output < 0.0);
    }

    #[test]
    fn test_min_data_in_leaf_blocks_split() {
        let finder = SplitFinder::new(SplitFinderConfig {
            min_data_in_leaf: 10,
            ..SplitFinderConfig::default()
        });
        let histogram = histogram(&[(-10.0, 5.0, 5), (10.0, 5.0, 5)]);
        assert!(finder
            .find_best_split_for_feature(&histogram, 0.0, 10.0, 10, &[0.0, 1.0])
            .is_none());
    }

    #[test]
    fn test_constant_gradient_has_no_split() {
        let finder = permissive();
        let histogram = histogram(&[(1.0, 1.0, 1), (1.0, 1.0, 1), (1.0, 1.0, 1)]);
        let split = finder.find_best_split_for_feature(&histogram, 3.0, 3.0, 3, &[0.0, 1.0, 2.0]);
        assert!(split.map_or(true, |s| s.gain < 1e-9));
    }

    #[test]
    fn test_single_bin_has_no_split() {
        let finder = permissive();
        let histogram = histogram(&[(1.0, 1.0, 4)]);
        assert!(finder
            .find_best_split_for_feature(&histogram, 1.0, 1.0, 4, &[0.0])
            .is_none());
    }
}
