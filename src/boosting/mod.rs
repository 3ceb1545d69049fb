//! Boosting algorithm families.
//!
//! Every family implements [`Boosting`]: [`Gbdt`] covers the plain `gbdt`,
//! `dart` and `goss` kinds, [`Cegb`] grows cost-aware trees and carries the
//! feature usage ledger between iterations. The [`factory`] picks the
//! concrete family from a requested type name and/or a saved model's tag.

pub mod cegb;
pub mod ensemble;
pub mod factory;
pub mod gbdt;
pub mod model_text;

pub use cegb::Cegb;
pub use ensemble::TreeEnsemble;
pub use factory::{
    create_boosting, create_boosting_from_config, create_boosting_from_file,
    create_boosting_from_string,
};
pub use gbdt::Gbdt;
pub use model_text::{read_model_tag, CegbSection, ModelText};

use crate::config::Config;
use crate::core::error::{LightGBMError, Result};
use crate::core::types::{BoostingType, DataSize, ImportanceType, ModelTag, NodeIndex, Score};
use crate::dataset::Dataset;
use ndarray::ArrayView1;
use std::fmt;
use std::path::Path;

/// Every prediction output for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiPrediction {
    /// Sum of shrunk leaf outputs
    pub raw: f64,
    /// Raw score after the objective transform
    pub output: f64,
    /// Leaf reached in each tree
    pub leaf: Vec<NodeIndex>,
    /// Feature acquisition cost of predicting this row
    pub cost: f64,
}

/// Interface shared by all boosting families.
pub trait Boosting: Send + fmt::Debug {
    /// Family this instance was created as.
    fn boosting_type(&self) -> BoostingType;

    /// Tag written on the first line of saved models.
    fn model_tag(&self) -> ModelTag {
        self.boosting_type().model_tag()
    }

    fn config(&self) -> &Config;

    fn ensemble(&self) -> &TreeEnsemble;

    fn num_trees(&self) -> usize {
        self.ensemble().num_trees()
    }

    fn num_features(&self) -> usize {
        self.ensemble().num_features()
    }

    /// Replaces the training configuration. Trees already grown are kept.
    fn reset_config(&mut self, config: &Config) -> Result<()>;

    /// Grows one tree from the given gradients and hessians.
    ///
    /// Returns true when no split could be made, in which case no tree is
    /// added and boosting should stop.
    fn train_one_iter(
        &mut self,
        dataset: &Dataset,
        gradients: &ArrayView1<'_, Score>,
        hessians: &ArrayView1<'_, Score>,
        bagging: Option<&[DataSize]>,
    ) -> Result<bool>;

    /// Replaces this instance's trees with the model in `model`.
    fn load_model_from_string(&mut self, model: &str) -> Result<()>;

    /// Writes the first `num_iterations` trees (all when `None`).
    fn save_model_to_string(&self, num_iterations: Option<usize>) -> Result<String>;

    fn save_model_to_file(&self, num_iterations: Option<usize>, path: &Path) -> Result<()> {
        let text = self.save_model_to_string(num_iterations)?;
        std::fs::write(path, text)?;
        log::info!(
            "Saved {} model with {} trees to {}",
            self.model_tag(),
            num_iterations.map_or(self.num_trees(), |k| k.min(self.num_trees())),
            path.display()
        );
        Ok(())
    }

    /// Limits prediction to the first `num_iterations` trees.
    fn init_predict(&mut self, num_iterations: Option<usize>);

    /// Like [`Boosting::init_predict`], also adopting prediction-time settings
    /// from `config`.
    fn init_predict_with_config(
        &mut self,
        num_iterations: Option<usize>,
        _config: &Config,
    ) -> Result<()> {
        self.init_predict(num_iterations);
        Ok(())
    }

    fn predict_raw(&self, features: &ArrayView1<'_, f32>) -> Result<f64> {
        self.ensemble().predict_raw(features)
    }

    fn predict(&self, features: &ArrayView1<'_, f32>) -> Result<f64> {
        self.ensemble().predict(features)
    }

    fn predict_leaf_index(&self, features: &ArrayView1<'_, f32>) -> Result<Vec<NodeIndex>> {
        self.ensemble().predict_leaf_index(features)
    }

    /// Raw score, transformed score, leaves and cost in one call.
    fn predict_multi(&self, _features: &ArrayView1<'_, f32>) -> Result<MultiPrediction> {
        Err(LightGBMError::not_implemented(format!(
            "predict_multi for boosting type '{}'",
            self.boosting_type()
        )))
    }

    fn feature_importance(&self, importance_type: ImportanceType) -> Vec<f64> {
        self.ensemble().feature_importance(importance_type)
    }
}

/// Builds the model text for the first `num_iterations` trees.
pub(crate) fn ensemble_model_text(
    boosting: &dyn Boosting,
    num_iterations: Option<usize>,
    cegb: Option<CegbSection>,
) -> ModelText {
    let ensemble = boosting.ensemble();
    let count = num_iterations.map_or(ensemble.num_trees(), |k| k.min(ensemble.num_trees()));
    let mut parameters = boosting.config().as_parameter_map();
    parameters.insert("boosting_type".to_string(), boosting.boosting_type().to_string());

    ModelText {
        tag: boosting.model_tag(),
        boosting_type: boosting.boosting_type(),
        objective: ensemble.objective(),
        num_features: ensemble.num_features(),
        num_iteration_for_pred: ensemble.num_iteration_for_pred().filter(|&k| k < count),
        cegb,
        trees: ensemble.trees()[..count].to_vec(),
        parameters,
    }
}

/// Applies the saved `parameters` section on top of `config`.
pub(crate) fn apply_saved_parameters(config: &mut Config, model: &ModelText) -> Result<()> {
    for (key, value) in &model.parameters {
        // The instance keeps its own family.
        if key == "boosting_type" {
            continue;
        }
        config.apply_parameter(key, value)?;
    }
    config.objective = model.objective;
    Ok(())
}
