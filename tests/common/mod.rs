//! Common test utilities for the integration tests.

#![allow(dead_code)]

use lightgbm_cegb::*;
use ndarray::{Array1, Array2};
use rand::prelude::*;

/// Random regression features in `[-5, 5)`.
pub fn create_test_features(num_samples: usize, num_features: usize, seed: u64) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((num_samples, num_features), |_| rng.gen_range(-5.0..5.0))
}

/// Labels driven mostly by the first two features.
pub fn create_test_labels(features: &Array2<f32>) -> Array1<f32> {
    features
        .rows()
        .into_iter()
        .map(|row| {
            let mut label = 2.0 * row[0] - row[1].max(0.0);
            for (j, &value) in row.iter().enumerate().skip(2) {
                label += value * 0.05 / (j as f32);
            }
            label
        })
        .collect()
}

pub fn create_test_dataset(num_samples: usize, num_features: usize, seed: u64) -> Dataset {
    let features = create_test_features(num_samples, num_features, seed);
    let labels = create_test_labels(&features);
    let config = ConfigBuilder::new().max_bin(32).build().unwrap();
    Dataset::from_config(features, labels, &config).unwrap()
}

/// Tree parameters small enough for a few hundred rows.
pub fn small_tree_config() -> ConfigBuilder {
    ConfigBuilder::new()
        .num_leaves(8)
        .min_data_in_leaf(5)
        .learning_rate(0.3)
        .lambda_l2(1.0)
}

/// Squared-error gradients and hessians of `scores` against the labels.
pub fn l2_gradients(dataset: &Dataset, scores: &Array1<f64>) -> (Array1<Score>, Array1<Score>) {
    let gradients = scores
        .iter()
        .zip(dataset.labels().iter())
        .map(|(&score, &label)| (score - label as f64) as Score)
        .collect();
    (gradients, Array1::from_elem(dataset.num_data(), 1.0))
}

/// Runs up to `rounds` boosting iterations with squared-error gradients.
///
/// Returns the number of trees added.
pub fn boost(booster: &mut dyn Boosting, dataset: &Dataset, rounds: usize) -> usize {
    let mut scores = Array1::from_shape_fn(dataset.num_data(), |i| {
        booster.predict_raw(&dataset.row(i)).unwrap()
    });
    let before = booster.num_trees();

    for _ in 0..rounds {
        let (g, h) = l2_gradients(dataset, &scores);
        if booster
            .train_one_iter(dataset, &g.view(), &h.view(), None)
            .unwrap()
        {
            break;
        }
        let tree = booster.ensemble().trees().last().unwrap();
        for i in 0..dataset.num_data() {
            scores[i] += tree.predict(&dataset.row(i)).unwrap();
        }
    }

    booster.num_trees() - before
}

/// Mean squared error of the booster on its training data.
pub fn training_mse(booster: &dyn Boosting, dataset: &Dataset) -> f64 {
    let total: f64 = (0..dataset.num_data())
        .map(|i| {
            let diff = booster.predict(&dataset.row(i)).unwrap() - dataset.labels()[i] as f64;
            diff * diff
        })
        .sum();
    total / dataset.num_data() as f64
}
