//! Quantile bin mapping for numerical features.
//!
//! A feature's observed values are cut into at most `max_bin` bins, each
//! described by its inclusive upper bound. A value `v` falls into the first
//! bin whose upper bound is `>= v`, so `v <= upper_bounds[b]` holds exactly
//! when `bin(v) <= b`. Split thresholds are taken from these bounds, which
//! keeps binned training and raw-value prediction in agreement.

use crate::core::types::BinIndex;
use serde::{Deserialize, Serialize};

/// Bin mapper for one numerical feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinMapper {
    /// Strictly increasing inclusive upper bounds, one per bin
    bin_upper_bounds: Vec<f64>,
}

impl BinMapper {
    /// Creates a bin mapper from the observed values of a feature.
    ///
    /// NaN values are ignored when placing bounds; they are routed to bin 0 by
    /// [`BinMapper::value_to_bin`].
    pub fn new_numerical(values: &[f32], max_bins: usize) -> Self {
        let mut sorted: Vec<f64> = values
            .iter()
            .filter(|v| !v.is_nan())
            .map(|&v| v as f64)
            .collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = sorted.len();
        if n == 0 {
            return BinMapper {
                bin_upper_bounds: vec![0.0],
            };
        }

        let mut distinct = sorted.clone();
        distinct.dedup();

        let max_bins = max_bins.max(1);
        let bin_upper_bounds = if distinct.len() <= max_bins {
            distinct
        } else {
            let mut bounds: Vec<f64> = (0..max_bins)
                .map(|i| {
                    let quantile = (i + 1) as f64 / max_bins as f64;
                    let index = ((quantile * n as f64) as usize).min(n - 1);
                    sorted[index]
                })
                .collect();
            bounds.dedup();
            bounds
        };

        BinMapper { bin_upper_bounds }
    }

    /// Maps a feature value to its bin. NaN goes to bin 0.
    pub fn value_to_bin(&self, value: f32) -> BinIndex {
        if value.is_nan() {
            return 0;
        }
        let value = value as f64;
        let bin = self.bin_upper_bounds.partition_point(|&bound| bound < value);
        bin.min(self.bin_upper_bounds.len() - 1) as BinIndex
    }

    /// Returns the number of bins.
    pub fn num_bins(&self) -> usize {
        self.bin_upper_bounds.len()
    }

    /// Returns the bin upper bounds.
    pub fn bin_upper_bounds(&self) -> &[f64] {
        &self.bin_upper_bounds
    }

    /// Threshold value separating bins `..=bin` from the rest.
    pub fn bin_to_threshold(&self, bin: BinIndex) -> f64 {
        let last = self.bin_upper_bounds.len() - 1;
        self.bin_upper_bounds[(bin as usize).min(last)]
    }
}
