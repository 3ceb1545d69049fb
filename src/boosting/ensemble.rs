//! Ensemble management shared by every boosting family.
//!
//! A [`TreeEnsemble`] holds the trees grown so far (one per iteration), the
//! objective used to transform raw scores and the prediction window set by
//! `init_predict`.

use crate::core::error::{LightGBMError, Result};
use crate::core::types::{FeatureIndex, ImportanceType, NodeIndex, ObjectiveType};
use crate::tree::Tree;
use ndarray::ArrayView1;
use std::collections::BTreeSet;

/// Ordered collection of trees plus prediction settings.
#[derive(Debug, Clone, Default)]
pub struct TreeEnsemble {
    trees: Vec<Tree>,
    num_features: usize,
    objective: ObjectiveType,
    num_iteration_for_pred: Option<usize>,
}

impl TreeEnsemble {
    /// Creates an empty ensemble.
    pub fn new(objective: ObjectiveType) -> Self {
        TreeEnsemble {
            objective,
            ..Default::default()
        }
    }

    /// Rebuilds an ensemble from loaded trees.
    pub fn from_trees(
        trees: Vec<Tree>,
        num_features: usize,
        objective: ObjectiveType,
        num_iteration_for_pred: Option<usize>,
    ) -> Self {
        TreeEnsemble {
            trees,
            num_features,
            objective,
            num_iteration_for_pred,
        }
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn objective(&self) -> ObjectiveType {
        self.objective
    }

    pub fn set_objective(&mut self, objective: ObjectiveType) {
        self.objective = objective;
    }

    pub fn num_iteration_for_pred(&self) -> Option<usize> {
        self.num_iteration_for_pred
    }

    /// Appends a tree grown on a dataset with `num_features` columns.
    pub fn push(&mut self, tree: Tree, num_features: usize) {
        self.num_features = self.num_features.max(num_features);
        self.trees.push(tree);
    }

    /// Drops every tree.
    pub fn clear(&mut self) {
        self.trees.clear();
        self.num_iteration_for_pred = None;
    }

    /// Limits prediction to the first `num_iterations` trees.
    ///
    /// `None` or a value larger than the ensemble uses every tree.
    pub fn init_predict(&mut self, num_iterations: Option<usize>) {
        self.num_iteration_for_pred = num_iterations.filter(|&k| k < self.trees.len());
        log::debug!(
            "Prediction uses {} of {} trees",
            self.active_trees().len(),
            self.trees.len()
        );
    }

    /// Trees consulted by prediction.
    pub fn active_trees(&self) -> &[Tree] {
        let count = self
            .num_iteration_for_pred
            .map_or(self.trees.len(), |k| k.min(self.trees.len()));
        &self.trees[..count]
    }

    fn check_features(&self, features: &ArrayView1<'_, f32>) -> Result<()> {
        if features.len() < self.num_features {
            return Err(LightGBMError::dimension_mismatch(
                format!("{} features", self.num_features),
                format!("{} features", features.len()),
            ));
        }
        Ok(())
    }

    /// Sum of shrunk leaf outputs over the active trees.
    pub fn predict_raw(&self, features: &ArrayView1<'_, f32>) -> Result<f64> {
        self.check_features(features)?;
        self.active_trees().iter().try_fold(0.0, |sum, tree| {
            tree.predict(features)
                .map(|value| sum + value)
                .map_err(|e| LightGBMError::prediction(format!("{:#}", e)))
        })
    }

    /// Raw score mapped through the objective's transform.
    pub fn predict(&self, features: &ArrayView1<'_, f32>) -> Result<f64> {
        Ok(self.objective.transform(self.predict_raw(features)?))
    }

    /// Leaf reached in each active tree.
    pub fn predict_leaf_index(&self, features: &ArrayView1<'_, f32>) -> Result<Vec<NodeIndex>> {
        self.check_features(features)?;
        self.active_trees()
            .iter()
            .map(|tree| {
                tree.predict_leaf_index(features)
                    .map_err(|e| LightGBMError::prediction(format!("{:#}", e)))
            })
            .collect()
    }

    /// Distinct features evaluated on the paths of `features` through the
    /// active trees.
    pub fn path_features(&self, features: &ArrayView1<'_, f32>) -> Result<BTreeSet<FeatureIndex>> {
        self.check_features(features)?;
        let mut evaluated = BTreeSet::new();
        for tree in self.active_trees() {
            let path = tree
                .path_features(features)
                .map_err(|e| LightGBMError::prediction(format!("{:#}", e)))?;
            evaluated.extend(path);
        }
        Ok(evaluated)
    }

    /// Features split on by any tree of the ensemble.
    pub fn used_features(&self) -> BTreeSet<FeatureIndex> {
        self.trees
            .iter()
            .flat_map(|tree| tree.used_features())
            .collect()
    }

    pub fn feature_importance(&self, importance_type: ImportanceType) -> Vec<f64> {
        let mut importance = vec![0.0; self.num_features];
        for tree in self.active_trees() {
            tree.add_feature_importance(&mut importance, importance_type);
        }
        importance
    }
}
