//! Feature acquisition cost model.

use crate::config::CegbConfig;
use crate::core::error::Result;
use crate::core::types::FeatureIndex;
use std::collections::BTreeMap;

/// Static cost inputs of one training run plus the modes derived from them.
///
/// `lazy` penalties are charged once per tree (or per branch) that reads a
/// feature; `coupled` penalties once per ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct CostModel {
    tradeoff: f64,
    lazy_penalty: BTreeMap<FeatureIndex, f64>,
    coupled_penalty: BTreeMap<FeatureIndex, f64>,
    independent_branches: bool,
    need_lazy_features: bool,
    effective_independent_branches: bool,
}

impl CostModel {
    /// Validates `config` and derives the accounting modes.
    pub fn from_config(config: &CegbConfig) -> Result<Self> {
        config.validate()?;

        let need_lazy_features = config.penalty_feature_lazy.values().any(|&p| p > 0.0);
        let effective_independent_branches = config.independent_branches
            || config.penalty_feature_coupled.is_empty()
            || config.tradeoff == 0.0;

        Ok(CostModel {
            tradeoff: config.tradeoff,
            lazy_penalty: config.penalty_feature_lazy.clone(),
            coupled_penalty: config.penalty_feature_coupled.clone(),
            independent_branches: config.independent_branches,
            need_lazy_features,
            effective_independent_branches,
        })
    }

    /// Weight of cost against gain.
    pub fn tradeoff(&self) -> f64 {
        self.tradeoff
    }

    /// Lazy penalty of `feature`, 0 when unlisted.
    pub fn lazy_penalty(&self, feature: FeatureIndex) -> f64 {
        self.lazy_penalty.get(&feature).copied().unwrap_or(0.0)
    }

    /// Coupled penalty of `feature`, 0 when unlisted.
    pub fn coupled_penalty(&self, feature: FeatureIndex) -> f64 {
        self.coupled_penalty.get(&feature).copied().unwrap_or(0.0)
    }

    /// Listed lazy penalties by feature.
    pub fn lazy_penalties(&self) -> &BTreeMap<FeatureIndex, f64> {
        &self.lazy_penalty
    }

    pub fn coupled_penalties(&self) -> &BTreeMap<FeatureIndex, f64> {
        &self.coupled_penalty
    }

    /// The explicit override as configured.
    pub fn independent_branches(&self) -> bool {
        self.independent_branches
    }

    /// True when some lazy penalty is positive.
    pub fn need_lazy_features(&self) -> bool {
        self.need_lazy_features
    }

    /// True when every branch is costed on its own: requested explicitly,
    /// no coupled table was given, or cost carries no weight.
    pub fn effective_independent_branches(&self) -> bool {
        self.effective_independent_branches
    }

    /// Back to the configuration form, e.g. for saving a model.
    pub fn to_config(&self) -> CegbConfig {
        CegbConfig {
            tradeoff: self.tradeoff,
            independent_branches: self.independent_branches,
            penalty_feature_lazy: self.lazy_penalty.clone(),
            penalty_feature_coupled: self.coupled_penalty.clone(),
        }
    }
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel {
            tradeoff: CegbConfig::default().tradeoff,
            lazy_penalty: BTreeMap::new(),
            coupled_penalty: BTreeMap::new(),
            independent_branches: false,
            need_lazy_features: false,
            effective_independent_branches: true,
        }
    }
}
