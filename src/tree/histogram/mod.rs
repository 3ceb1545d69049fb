//! Histogram construction module.
//!
//! A [`FeatureHistogram`] accumulates gradient sum, hessian sum and row count
//! per bin of one feature. The split finder scans it left to right.

pub mod builder;

pub use builder::{HistogramBuilder, HistogramBuilderConfig};

use crate::core::types::{DataSize, FeatureIndex, Hist};
use ndarray::Array1;

/// Per-bin gradient/hessian sums and counts for one feature.
///
/// Gradients and hessians are interleaved: `[g0, h0, g1, h1, ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureHistogram {
    feature: FeatureIndex,
    data: Array1<Hist>,
    counts: Vec<DataSize>,
}

impl FeatureHistogram {
    /// Creates an empty histogram with `num_bins` bins.
    pub fn new(feature: FeatureIndex, num_bins: usize) -> Self {
        FeatureHistogram {
            feature,
            data: Array1::zeros(num_bins * 2),
            counts: vec![0; num_bins],
        }
    }

    /// Feature this histogram belongs to.
    pub fn feature_index(&self) -> FeatureIndex {
        self.feature
    }

    /// Number of bins.
    pub fn num_bins(&self) -> usize {
        self.counts.len()
    }

    /// Adds one row to `bin`.
    pub fn accumulate(&mut self, bin: usize, gradient: Hist, hessian: Hist) {
        self.data[bin * 2] += gradient;
        self.data[bin * 2 + 1] += hessian;
        self.counts[bin] += 1;
    }

    /// Gradient sum of `bin`.
    pub fn gradient(&self, bin: usize) -> Hist {
        self.data[bin * 2]
    }

    /// Hessian sum of `bin`.
    pub fn hessian(&self, bin: usize) -> Hist {
        self.data[bin * 2 + 1]
    }

    /// Row count of `bin`.
    pub fn count(&self, bin: usize) -> DataSize {
        self.counts[bin]
    }

    /// Gradient sum, hessian sum and count over all bins.
    pub fn totals(&self) -> (Hist, Hist, DataSize) {
        (0..self.num_bins()).fold((0.0, 0.0, 0), |(g, h, c), bin| {
            (g + self.gradient(bin), h + self.hessian(bin), c + self.count(bin))
        })
    }

    /// Returns `self - other`, bin by bin.
    pub fn subtract(&self, other: &FeatureHistogram) -> anyhow::Result<FeatureHistogram> {
        if self.feature != other.feature || self.num_bins() != other.num_bins() {
            return Err(anyhow::anyhow!(
                "Cannot subtract histogram of feature {} ({} bins) from feature {} ({} bins)",
                other.feature,
                other.num_bins(),
                self.feature,
                self.num_bins()
            ));
        }

        Ok(FeatureHistogram {
            feature: self.feature,
            data: &self.data - &other.data,
            counts: self
                .counts
                .iter()
                .zip(&other.counts)
                .map(|(a, b)| a - b)
                .collect(),
        })
    }
}
