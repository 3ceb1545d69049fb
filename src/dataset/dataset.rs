//! Binned training data.
//!
//! A [`Dataset`] keeps the raw feature matrix next to its binned form. Tree
//! learners read bins; prediction and tests read raw values.

use crate::config::Config;
use crate::core::error::{DatasetError, Result};
use crate::core::types::*;
use crate::dataset::bin_mapper::BinMapper;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

/// Training data with per-feature bin mappers.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Feature matrix (num_data × num_features)
    features: Array2<f32>,
    /// Target labels (num_data,)
    labels: Array1<Label>,
    /// Binned features, column-major (num_features × num_data)
    bins: Array2<BinIndex>,
    /// One bin mapper per feature
    bin_mappers: Vec<BinMapper>,
}

impl Dataset {
    /// Bins `features` using `config.max_bin`.
    pub fn from_config(features: Array2<f32>, labels: Array1<Label>, config: &Config) -> Result<Self> {
        Self::new(features, labels, config.max_bin)
    }

    /// Bins `features` with at most `max_bin` bins per feature.
    pub fn new(features: Array2<f32>, labels: Array1<Label>, max_bin: usize) -> Result<Self> {
        let (num_data, num_features) = features.dim();

        if num_data == 0 || num_features == 0 {
            return Err(DatasetError::Empty.into());
        }

        if labels.len() != num_data {
            return Err(DatasetError::LabelMismatch {
                rows: num_data,
                labels: labels.len(),
            }
            .into());
        }

        let bin_mappers: Vec<BinMapper> = features
            .axis_iter(Axis(1))
            .into_par_iter()
            .map(|column| {
                let values: Vec<f32> = column.to_vec();
                BinMapper::new_numerical(&values, max_bin)
            })
            .collect();

        let mut bins = Array2::<BinIndex>::zeros((num_features, num_data));
        for (feature, mut row) in bins.axis_iter_mut(Axis(0)).enumerate() {
            let mapper = &bin_mappers[feature];
            for (slot, &value) in row.iter_mut().zip(features.column(feature).iter()) {
                *slot = mapper.value_to_bin(value);
            }
        }

        log::debug!(
            "Binned dataset: {} rows, {} features, max_bin={}",
            num_data,
            num_features,
            max_bin
        );

        Ok(Dataset {
            features,
            labels,
            bins,
            bin_mappers,
        })
    }

    /// Returns the number of data points.
    pub fn num_data(&self) -> usize {
        self.features.nrows()
    }

    /// Returns the number of features.
    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }

    /// Returns a view of the raw feature matrix.
    pub fn features(&self) -> ArrayView2<'_, f32> {
        self.features.view()
    }

    /// Returns one raw row.
    pub fn row(&self, index: usize) -> ArrayView1<'_, f32> {
        self.features.row(index)
    }

    /// Returns the labels.
    pub fn labels(&self) -> ArrayView1<'_, Label> {
        self.labels.view()
    }

    /// Returns the binned values of one feature, indexed by row.
    pub fn feature_bins(&self, feature: FeatureIndex) -> ArrayView1<'_, BinIndex> {
        self.bins.row(feature)
    }

    /// Returns the bin mapper for a specific feature.
    pub fn bin_mapper(&self, feature: FeatureIndex) -> Option<&BinMapper> {
        self.bin_mappers.get(feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::LightGBMError;

    #[test]
    fn test_dataset_creation() {
        let features = Array2::from_shape_vec(
            (5, 3),
            vec![
                1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0,
            ],
        )
        .unwrap();
        let labels = Array1::from(vec![0.0, 1.0, 0.0, 1.0, 0.0]);

        let dataset = Dataset::new(features, labels, 10).unwrap();
        assert_eq!(dataset.num_data(), 5);
        assert_eq!(dataset.num_features(), 3);
        assert_eq!(dataset.bin_mapper(0).unwrap().num_bins(), 5);
        assert_eq!(dataset.feature_bins(1).to_vec(), vec![0, 1, 2, 3, 4]);
        assert!(dataset.bin_mapper(3).is_none());
    }

    #[test]
    fn test_dataset_from_config_uses_max_bin() {
        let config = crate::config::ConfigBuilder::new().max_bin(3).build().unwrap();
        let features = Array2::from_shape_fn((20, 1), |(i, _)| i as f32);
        let dataset = Dataset::from_config(features, Array1::zeros(20), &config).unwrap();
        assert!(dataset.bin_mapper(0).unwrap().num_bins() <= 3);
    }

    #[test]
    fn test_dataset_rejects_bad_shapes() {
        let empty = Dataset::new(Array2::zeros((0, 2)), Array1::zeros(0), 8);
        assert!(matches!(empty, Err(LightGBMError::Dataset { .. })));

        let mismatch = Dataset::new(Array2::zeros((3, 2)), Array1::zeros(2), 8);
        let err = mismatch.unwrap_err();
        assert!(err.to_string().contains("3 rows, 2 labels"));
    }
}
