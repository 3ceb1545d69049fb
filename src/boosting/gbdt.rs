//! Plain gradient boosted decision trees.
//!
//! One [`Gbdt`] type serves the `gbdt`, `dart` and `goss` kinds: they share
//! tree growth and storage (`tree` tag) and differ only in row sampling,
//! which is supplied by the caller through the bagging index set.

use crate::boosting::{
    apply_saved_parameters, ensemble_model_text, read_model_tag, Boosting, ModelText, TreeEnsemble,
};
use crate::config::Config;
use crate::core::error::{LightGBMError, Result};
use crate::core::types::{BoostingType, DataSize, Score};
use crate::dataset::Dataset;
use crate::tree::{SerialTreeLearner, SerialTreeLearnerConfig};
use ndarray::ArrayView1;

/// Gradient boosting with raw-gain split selection.
#[derive(Debug)]
pub struct Gbdt {
    kind: BoostingType,
    config: Config,
    ensemble: TreeEnsemble,
    learner: SerialTreeLearner,
}

impl Gbdt {
    /// Creates an empty booster of the given kind with default settings.
    pub fn new(kind: BoostingType) -> Result<Self> {
        Self::with_config(kind, Config::default())
    }

    /// Creates an empty booster of the given kind.
    ///
    /// `kind` must be one of `gbdt`, `dart` or `goss`.
    pub fn with_config(kind: BoostingType, mut config: Config) -> Result<Self> {
        if kind == BoostingType::CEGB {
            return Err(LightGBMError::invalid_parameter(
                "boosting_type",
                kind.to_string(),
                "cost-aware boosting is provided by Cegb",
            ));
        }
        config.boosting_type = kind;
        config.validate()?;

        let learner = SerialTreeLearner::new(SerialTreeLearnerConfig::from_config(&config))?;
        Ok(Gbdt {
            kind,
            ensemble: TreeEnsemble::new(config.objective),
            config,
            learner,
        })
    }
}

impl Boosting for Gbdt {
    fn boosting_type(&self) -> BoostingType {
        self.kind
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn ensemble(&self) -> &TreeEnsemble {
        &self.ensemble
    }

    fn reset_config(&mut self, config: &Config) -> Result<()> {
        let mut config = config.clone();
        config.boosting_type = self.kind;
        config.validate()?;

        self.learner = SerialTreeLearner::new(SerialTreeLearnerConfig::from_config(&config))?;
        self.ensemble.set_objective(config.objective);
        self.config = config;
        Ok(())
    }

    fn train_one_iter(
        &mut self,
        dataset: &Dataset,
        gradients: &ArrayView1<'_, Score>,
        hessians: &ArrayView1<'_, Score>,
        bagging: Option<&[DataSize]>,
    ) -> Result<bool> {
        let tree = self.learner.train(dataset, gradients, hessians, bagging)?;
        if tree.num_leaves() <= 1 {
            log::info!(
                "Stopped training after {} trees: no split with positive gain",
                self.ensemble.num_trees()
            );
            return Ok(true);
        }

        log::debug!(
            "Iteration {}: tree with {} leaves",
            self.ensemble.num_trees() + 1,
            tree.num_leaves()
        );
        self.ensemble.push(tree, dataset.num_features());
        Ok(false)
    }

    fn load_model_from_string(&mut self, model: &str) -> Result<()> {
        let tag = read_model_tag(model)?;
        if !tag.accepts(self.kind) {
            return Err(LightGBMError::type_mismatch(self.kind.to_string(), tag.as_str()));
        }
        let model = ModelText::parse(model)?;

        let mut config = self.config.clone();
        apply_saved_parameters(&mut config, &model)?;
        self.reset_config(&config)?;

        log::info!(
            "Loaded {} model with {} trees into {} booster",
            model.tag,
            model.trees.len(),
            self.kind
        );
        self.ensemble = TreeEnsemble::from_trees(
            model.trees,
            model.num_features,
            model.objective,
            model.num_iteration_for_pred,
        );
        Ok(())
    }

    fn save_model_to_string(&self, num_iterations: Option<usize>) -> Result<String> {
        Ok(ensemble_model_text(self, num_iterations, None).to_text())
    }

    fn init_predict(&mut self, num_iterations: Option<usize>) {
        self.ensemble.init_predict(num_iterations);
    }
}
