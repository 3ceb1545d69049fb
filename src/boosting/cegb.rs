//! Cost-efficient gradient boosting.
//!
//! [`Cegb`] owns the ensemble-wide [`FeatureUsageLedger`] and lends it to a
//! fresh [`CegbTreeLearner`] on every iteration. The snapshot left by each
//! finished tree is handed to the next learner as its predecessor.

use crate::boosting::{
    apply_saved_parameters, ensemble_model_text, read_model_tag, Boosting, CegbSection,
    ModelText, MultiPrediction, TreeEnsemble,
};
use crate::config::Config;
use crate::core::error::{LightGBMError, Result};
use crate::core::types::{BoostingType, DataSize, FeatureIndex, Score};
use crate::dataset::Dataset;
use crate::tree::{
    CegbTreeLearner, CostModel, FeatureUsageLedger, LedgerSnapshot, SerialTreeLearnerConfig,
};
use ndarray::ArrayView1;
use std::collections::BTreeSet;

/// Gradient boosting whose splits pay for the features they use.
#[derive(Debug)]
pub struct Cegb {
    config: Config,
    learner_config: SerialTreeLearnerConfig,
    ensemble: TreeEnsemble,
    cost_model: CostModel,
    ledger: FeatureUsageLedger,
    last_snapshot: Option<LedgerSnapshot>,
}

impl Cegb {
    /// Creates an empty booster with default settings and no penalties.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(mut config: Config) -> Result<Self> {
        config.boosting_type = BoostingType::CEGB;
        config.validate()?;
        let cost_model = CostModel::from_config(&config.cegb)?;

        log::debug!(
            "CEGB booster: tradeoff={}, independent branches={}, lazy features needed={}",
            cost_model.tradeoff(),
            cost_model.effective_independent_branches(),
            cost_model.need_lazy_features()
        );

        Ok(Cegb {
            learner_config: SerialTreeLearnerConfig::from_config(&config),
            ensemble: TreeEnsemble::new(config.objective),
            config,
            cost_model,
            ledger: FeatureUsageLedger::default(),
            last_snapshot: None,
        })
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    /// Usage state accumulated over every tree grown or loaded so far.
    pub fn ledger(&self) -> &FeatureUsageLedger {
        &self.ledger
    }

    /// Snapshot left by the most recent tree, if any.
    pub fn last_snapshot(&self) -> Option<&LedgerSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Acquisition cost of predicting `features`.
    ///
    /// Each distinct feature read on the row's paths pays its lazy penalty
    /// once; every feature used by the predicting trees pays its coupled
    /// penalty.
    pub fn predict_cost(&self, features: &ArrayView1<'_, f32>) -> Result<f64> {
        let read = self.ensemble.path_features(features)?;
        let lazy: f64 = self
            .cost_model
            .lazy_penalties()
            .iter()
            .filter(|&(feature, _)| read.contains(feature))
            .map(|(_, penalty)| penalty)
            .sum();

        let used: BTreeSet<FeatureIndex> = self
            .ensemble
            .active_trees()
            .iter()
            .flat_map(|tree| tree.used_features())
            .collect();
        let coupled: f64 = self
            .cost_model
            .coupled_penalties()
            .iter()
            .filter(|&(feature, _)| used.contains(feature))
            .map(|(_, penalty)| penalty)
            .sum();

        Ok(lazy + coupled)
    }

    fn saved_coupled_features(&self, num_iterations: Option<usize>) -> Vec<FeatureIndex> {
        match num_iterations {
            Some(k) if k < self.ensemble.num_trees() => self.ensemble.trees()[..k]
                .iter()
                .flat_map(|tree| tree.used_features())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            _ => self.ledger.coupled_features(),
        }
    }
}

impl Boosting for Cegb {
    fn boosting_type(&self) -> BoostingType {
        BoostingType::CEGB
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn ensemble(&self) -> &TreeEnsemble {
        &self.ensemble
    }

    /// The ledger is kept: features already paid for stay paid.
    fn reset_config(&mut self, config: &Config) -> Result<()> {
        let mut config = config.clone();
        config.boosting_type = BoostingType::CEGB;
        config.validate()?;

        self.cost_model = CostModel::from_config(&config.cegb)?;
        self.learner_config = SerialTreeLearnerConfig::from_config(&config);
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
        let mut learner = CegbTreeLearner::new(
            self.learner_config.clone(),
            &self.cost_model,
            &mut self.ledger,
            bagging,
        )?;
        learner.connect_to(self.last_snapshot.as_ref())?;
        let (tree, snapshot) = learner.train(dataset, gradients, hessians)?;
        self.last_snapshot = Some(snapshot);

        if tree.num_leaves() <= 1 {
            log::info!(
                "Stopped training after {} trees: no split with positive net gain",
                self.ensemble.num_trees()
            );
            return Ok(true);
        }

        log::debug!(
            "Iteration {}: cost-aware tree with {} leaves, {} features paid for",
            self.ensemble.num_trees() + 1,
            tree.num_leaves(),
            self.ledger.coupled_features().len()
        );
        self.ensemble.push(tree, dataset.num_features());
        Ok(false)
    }

    /// Loads either storage family.
    ///
    /// A `cegb_tree` model restores its cost settings and paid features; for
    /// a plain `tree` model every feature its trees split on counts as paid.
    fn load_model_from_string(&mut self, model: &str) -> Result<()> {
        let tag = read_model_tag(model)?;
        if !tag.accepts(BoostingType::CEGB) {
            return Err(LightGBMError::type_mismatch(
                BoostingType::CEGB.to_string(),
                tag.as_str(),
            ));
        }
        let model = ModelText::parse(model)?;

        let mut config = self.config.clone();
        apply_saved_parameters(&mut config, &model)?;
        if let Some(section) = &model.cegb {
            config.cegb = section.config.clone();
        }
        self.reset_config(&config)?;

        self.ensemble = TreeEnsemble::from_trees(
            model.trees,
            model.num_features,
            model.objective,
            model.num_iteration_for_pred,
        );
        let paid: Vec<FeatureIndex> = match model.cegb {
            Some(section) => section.coupled_feature_used,
            None => self.ensemble.used_features().into_iter().collect(),
        };
        self.ledger = FeatureUsageLedger::with_coupled_used(model.num_features, paid);
        self.last_snapshot = (self.ensemble.num_trees() > 0).then(|| self.ledger.snapshot());

        log::info!(
            "Loaded {} model with {} trees into cegb booster, {} features already paid for",
            tag,
            self.ensemble.num_trees(),
            self.ledger.coupled_features().len()
        );
        Ok(())
    }

    fn save_model_to_string(&self, num_iterations: Option<usize>) -> Result<String> {
        let section = CegbSection {
            config: self.cost_model.to_config(),
            coupled_feature_used: self.saved_coupled_features(num_iterations),
        };
        Ok(ensemble_model_text(self, num_iterations, Some(section)).to_text())
    }

    fn init_predict(&mut self, num_iterations: Option<usize>) {
        self.ensemble.init_predict(num_iterations);
    }

    /// Adopts the penalties of `config` for cost prediction when it sets any.
    fn init_predict_with_config(
        &mut self,
        num_iterations: Option<usize>,
        config: &Config,
    ) -> Result<()> {
        if config.cegb.has_penalties() {
            self.cost_model = CostModel::from_config(&config.cegb)?;
            self.config.cegb = config.cegb.clone();
        }
        self.init_predict(num_iterations);
        Ok(())
    }

    fn predict_multi(&self, features: &ArrayView1<'_, f32>) -> Result<MultiPrediction> {
        let raw = self.predict_raw(features)?;
        Ok(MultiPrediction {
            raw,
            output: self.ensemble.objective().transform(raw),
            leaf: self.predict_leaf_index(features)?,
            cost: self.predict_cost(features)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ModelTag;
    use ndarray::{arr1, Array1, Array2};

    // f0 separates the halves, f1 separates rows inside each half.
    fn dataset() -> Dataset {
        let features = Array2::from_shape_vec(
            (8, 2),
            vec![
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, //
                1.0, 0.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0,
            ],
        )
        .unwrap();
        Dataset::new(features, Array1::zeros(8), 16).unwrap()
    }

    fn gradients() -> (Array1<Score>, Array1<Score>) {
        (
            Array1::from_vec(vec![-13.0, -7.0, -13.0, -7.0, 7.0, 13.0, 7.0, 13.0]),
            Array1::from_elem(8, 1.0),
        )
    }

    fn config(lazy: &[(usize, f64)], coupled: &[(usize, f64)]) -> Config {
        let mut config = Config {
            num_leaves: 4,
            min_data_in_leaf: 1,
            min_sum_hessian_in_leaf: 0.0,
            lambda_l2: 0.0,
            learning_rate: 0.1,
            ..Config::default()
        };
        config.cegb.tradeoff = 1.0;
        config.cegb.penalty_feature_lazy = lazy.iter().copied().collect();
        config.cegb.penalty_feature_coupled = coupled.iter().copied().collect();
        config
    }

    #[test]
    fn test_new_booster_has_empty_ledger() {
        let booster = Cegb::new().unwrap();
        assert_eq!(booster.boosting_type(), BoostingType::CEGB);
        assert_eq!(booster.model_tag(), ModelTag::CegbTree);
        assert!(booster.ledger().coupled_features().is_empty());
        assert!(booster.last_snapshot().is_none());
    }

    #[test]
    fn test_training_pays_coupled_cost_once() {
        let data = dataset();
        let (g, h) = gradients();
        let mut booster = Cegb::with_config(config(&[], &[(0, 1.0), (1, 1.0)])).unwrap();

        assert!(!booster.train_one_iter(&data, &g.view(), &h.view(), None).unwrap());
        assert_eq!(booster.ledger().coupled_features(), vec![0, 1]);
        let first = booster.last_snapshot().cloned().unwrap();

        assert!(!booster.train_one_iter(&data, &g.view(), &h.view(), None).unwrap());
        assert_eq!(booster.num_trees(), 2);
        assert!(booster.ledger().extends(&first));
    }

    #[test]
    fn test_prohibitive_cost_stops_training() {
        let data = dataset();
        let (g, h) = gradients();
        let mut booster = Cegb::with_config(config(&[], &[(0, 1000.0), (1, 1000.0)])).unwrap();
        assert!(booster.train_one_iter(&data, &g.view(), &h.view(), None).unwrap());
        assert_eq!(booster.num_trees(), 0);
        assert!(booster.ledger().coupled_features().is_empty());
    }

    #[test]
    fn test_predict_cost_and_multi() {
        let data = dataset();
        let (g, h) = gradients();
        let mut booster = Cegb::with_config(config(&[(0, 0.5), (1, 2.0)], &[(0, 1.0)])).unwrap();
        booster.train_one_iter(&data, &g.view(), &h.view(), None).unwrap();

        let used = booster.ensemble().used_features();
        let x = arr1(&[0.0f32, 1.0]);
        let path = booster.ensemble().path_features(&x.view()).unwrap();
        let expected: f64 = path.iter().map(|&f| [0.5, 2.0][f]).sum::<f64>()
            + if used.contains(&0) { 1.0 } else { 0.0 };
        assert!((booster.predict_cost(&x.view()).unwrap() - expected).abs() < 1e-12);

        let multi = booster.predict_multi(&x.view()).unwrap();
        assert_eq!(multi.raw, booster.predict_raw(&x.view()).unwrap());
        assert_eq!(multi.leaf.len(), 1);
        assert_eq!(multi.cost, booster.predict_cost(&x.view()).unwrap());
    }

    #[test]
    fn test_save_and_reload_restores_ledger() {
        let data = dataset();
        let (g, h) = gradients();
        let mut booster = Cegb::with_config(config(&[(1, 2.0)], &[(0, 1.0), (1, 10.0)])).unwrap();
        booster.train_one_iter(&data, &g.view(), &h.view(), None).unwrap();

        let text = booster.save_model_to_string(None).unwrap();
        assert!(text.starts_with("cegb_tree\n"));

        let mut reloaded = Cegb::new().unwrap();
        reloaded.load_model_from_string(&text).unwrap();
        assert_eq!(reloaded.cost_model(), booster.cost_model());
        assert_eq!(
            reloaded.ledger().coupled_features(),
            booster.ledger().coupled_features()
        );
        assert!(reloaded.last_snapshot().is_some());
        assert_eq!(reloaded.save_model_to_string(None).unwrap(), text);
    }

    #[test]
    fn test_loading_plain_tree_model_derives_paid_features() {
        let text = "tree
version=v1
boosting_type=gbdt
objective=regression
num_features=3
num_iteration_for_pred=-1

Tree=0
num_nodes=3
num_leaves=2
shrinkage=1
split_feature=2 -1 -1
threshold=0.5 0 0
split_gain=1 0 0
left_child=1 -1 -1
right_child=2 -1 -1
default_left=1 0 0
leaf_value=0 -1 1

end of trees

parameters:
end of parameters
";
        let mut booster = Cegb::new().unwrap();
        booster.load_model_from_string(text).unwrap();
        assert_eq!(booster.ledger().coupled_features(), vec![2]);
        assert_eq!(booster.ledger().num_features(), 3);
        assert_eq!(booster.boosting_type(), BoostingType::CEGB);
    }

    #[test]
    fn test_init_predict_with_config_adopts_penalties() {
        let mut booster = Cegb::new().unwrap();
        booster
            .init_predict_with_config(None, &config(&[(1, 3.0)], &[]))
            .unwrap();
        assert_eq!(booster.cost_model().lazy_penalty(1), 3.0);

        booster.init_predict_with_config(None, &Config::default()).unwrap();
        assert_eq!(booster.cost_model().lazy_penalty(1), 3.0);
    }
}
