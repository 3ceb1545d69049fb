//! Histogram construction for efficient split finding.
//!
//! Histograms are built per feature over the binned columns of a
//! [`Dataset`]; features are processed in parallel with rayon.

use crate::core::types::{DataSize, FeatureIndex, Score};
use crate::dataset::Dataset;
use crate::tree::histogram::FeatureHistogram;
use ndarray::ArrayView1;
use rayon::prelude::*;

/// Configuration for histogram construction.
#[derive(Debug, Clone)]
pub struct HistogramBuilderConfig {
    /// Number of threads to use for parallel construction
    pub num_threads: usize,
    /// Leaves with fewer rows than this are built on the calling thread
    pub min_data_for_parallel: usize,
}

impl Default for HistogramBuilderConfig {
    fn default() -> Self {
        HistogramBuilderConfig {
            num_threads: num_cpus::get(),
            min_data_for_parallel: 1024,
        }
    }
}

/// Histogram builder for gradient boosting.
#[derive(Debug, Clone, Default)]
pub struct HistogramBuilder {
    config: HistogramBuilderConfig,
}

impl HistogramBuilder {
    /// Creates a new histogram builder.
    pub fn new(config: HistogramBuilderConfig) -> Self {
        HistogramBuilder { config }
    }

    /// Constructs histograms for `features` over the rows in `data_indices`.
    ///
    /// The result is ordered like `features`.
    pub fn construct_histograms(
        &self,
        dataset: &Dataset,
        gradients: &ArrayView1<'_, Score>,
        hessians: &ArrayView1<'_, Score>,
        data_indices: &[DataSize],
        features: &[FeatureIndex],
    ) -> anyhow::Result<Vec<FeatureHistogram>> {
        if gradients.len() != dataset.num_data() || hessians.len() != dataset.num_data() {
            return Err(anyhow::anyhow!(
                "Gradient and hessian arrays must match dataset size {}",
                dataset.num_data()
            ));
        }

        let parallel = self.config.num_threads > 1
            && features.len() > 1
            && data_indices.len() >= self.config.min_data_for_parallel;

        if parallel {
            features
                .par_iter()
                .map(|&feature| {
                    self.construct_feature_histogram(dataset, gradients, hessians, data_indices, feature)
                })
                .collect()
        } else {
            features
                .iter()
                .map(|&feature| {
                    self.construct_feature_histogram(dataset, gradients, hessians, data_indices, feature)
                })
                .collect()
        }
    }

    /// Constructs a histogram for a single feature.
    pub fn construct_feature_histogram(
        &self,
        dataset: &Dataset,
        gradients: &ArrayView1<'_, Score>,
        hessians: &ArrayView1<'_, Score>,
        data_indices: &[DataSize],
        feature: FeatureIndex,
    ) -> anyhow::Result<FeatureHistogram> {
        let bin_mapper = dataset
            .bin_mapper(feature)
            .ok_or_else(|| anyhow::anyhow!("Feature {} has no bin mapper", feature))?;
        let bins = dataset.feature_bins(feature);
        let mut histogram = FeatureHistogram::new(feature, bin_mapper.num_bins());

        for &data_idx in data_indices {
            let idx = data_idx as usize;
            let bin = *bins
                .get(idx)
                .ok_or_else(|| anyhow::anyhow!("Data index {} out of bounds", idx))?;
            histogram.accumulate(bin as usize, gradients[idx] as f64, hessians[idx] as f64);
        }

        Ok(histogram)
    }

    /// Constructs a histogram by subtraction (parent - sibling = current).
    pub fn construct_histogram_by_subtraction(
        &self,
        parent: &FeatureHistogram,
        sibling: &FeatureHistogram,
    ) -> anyhow::Result<FeatureHistogram> {
        parent.subtract(sibling)
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &HistogramBuilderConfig {
        &self.config
    }
}
