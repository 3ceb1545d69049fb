//! # LightGBM CEGB
//!
//! Cost-efficient gradient boosting (CEGB) for a pure Rust LightGBM core:
//! decision trees whose splits are chosen by statistical gain net of the cost
//! of acquiring the features they read, plus the factory that decides which
//! boosting family creates or loads a model.
//!
//! ## Cost model
//!
//! Every feature can carry two penalties:
//!
//! - a **lazy** penalty, paid by each tree (or, in independent-branch mode,
//!   each branch) that reads the feature;
//! - a **coupled** penalty, paid once for the whole ensemble the first time a
//!   split uses the feature.
//!
//! A candidate split is worth `gain - tradeoff * penalty`; it is only made
//! when that is positive. Which penalties are already paid is tracked by a
//! [`FeatureUsageLedger`] owned by the [`Cegb`] booster.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lightgbm_cegb::{Boosting, ConfigBuilder, Dataset, create_boosting_from_config};
//! use ndarray::{Array1, Array2};
//!
//! # fn main() -> lightgbm_cegb::Result<()> {
//! lightgbm_cegb::init();
//!
//! let features = Array2::from_shape_vec((4, 2), vec![0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0])
//!     .map_err(|e| lightgbm_cegb::LightGBMError::dataset(e.to_string()))?;
//! let dataset = Dataset::new(features, Array1::zeros(4), 255)?;
//!
//! let config = ConfigBuilder::new()
//!     .boosting_type(lightgbm_cegb::BoostingType::CEGB)
//!     .min_data_in_leaf(1)
//!     .cegb_tradeoff(1.0)
//!     .cegb_penalty_feature_coupled(1, 5.0)
//!     .build()?;
//! let mut booster = create_boosting_from_config(&config)?;
//!
//! let gradients = Array1::from_vec(vec![-1.0f32, -1.0, 1.0, 1.0]);
//! let hessians = Array1::from_elem(4, 1.0f32);
//! booster.train_one_iter(&dataset, &gradients.view(), &hessians.view(), None)?;
//!
//! let text = booster.save_model_to_string(None)?;
//! assert!(text.starts_with("cegb_tree"));
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    non_snake_case,
    non_upper_case_globals
)]

// Core types, constants and errors
pub mod core;

// Configuration management
pub mod config;

// Binned training data
pub mod dataset;

// Trees, histograms, split finding and cost accounting
pub mod tree;

// Boosting families, model text and the factory
pub mod boosting;

pub use crate::core::{
    constants::*,
    error::{LightGBMError, ModelTextError, Result},
    types::*,
};

pub use crate::config::{CegbConfig, Config, ConfigBuilder};

pub use crate::dataset::{BinMapper, Dataset};

pub use crate::tree::{
    CegbTreeLearner, CostModel, FeatureUsageLedger, LedgerSnapshot, SerialTreeLearner, Tree,
};

pub use crate::boosting::{
    create_boosting, create_boosting_from_config, create_boosting_from_file,
    create_boosting_from_string, Boosting, Cegb, Gbdt, ModelText, MultiPrediction,
    TreeEnsemble,
};

pub use crate::core::constants::LIGHTGBM_CEGB_VERSION as VERSION;

/// Installs `env_logger` as the `log` backend.
///
/// The level comes from `RUST_LOG`, `info` when unset. Calling this more than
/// once, or after another logger was installed, does nothing.
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// Like [`init`], with the level taken from `config.verbosity`.
pub fn init_with_config(config: &Config) {
    let _ = env_logger::Builder::new()
        .filter_level(config.verbosity.level_filter())
        .parse_default_env()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        init_with_config(&Config::default());
        log::info!("logger installed");
    }

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
