//! Cost-efficient boosting parameters.
//!
//! Penalty tables are sparse: a feature absent from a table has penalty 0.
//! Tables are written as `feature:penalty` pairs separated by commas, both in
//! the `parameters` section of a model file and in the cost section of a
//! `cegb_tree` model.

use crate::core::constants::DEFAULT_CEGB_TRADEOFF;
use crate::core::error::{LightGBMError, Result};
use crate::core::types::FeatureIndex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Cost model inputs for the CEGB tree learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CegbConfig {
    /// Weight of acquisition cost against split gain
    pub tradeoff: f64,
    /// Cost every branch as if it were the only consumer of its features
    pub independent_branches: bool,
    /// Per-instance cost paid the first time a tree reads a feature
    #[serde(with = "penalty_table_serde")]
    pub penalty_feature_lazy: BTreeMap<FeatureIndex, f64>,
    /// One-time cost paid the first time the ensemble uses a feature
    #[serde(with = "penalty_table_serde")]
    pub penalty_feature_coupled: BTreeMap<FeatureIndex, f64>,
}

impl Default for CegbConfig {
    fn default() -> Self {
        CegbConfig {
            tradeoff: DEFAULT_CEGB_TRADEOFF,
            independent_branches: false,
            penalty_feature_lazy: BTreeMap::new(),
            penalty_feature_coupled: BTreeMap::new(),
        }
    }
}

impl CegbConfig {
    /// Checks that the tradeoff and every penalty are finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        if !self.tradeoff.is_finite() || self.tradeoff < 0.0 {
            return Err(LightGBMError::invalid_parameter(
                "cegb_tradeoff",
                self.tradeoff.to_string(),
                "must be a finite non-negative number",
            ));
        }

        for (name, table) in [
            ("cegb_penalty_feature_lazy", &self.penalty_feature_lazy),
            ("cegb_penalty_feature_coupled", &self.penalty_feature_coupled),
        ] {
            for (&feature, &penalty) in table {
                if !penalty.is_finite() || penalty < 0.0 {
                    return Err(LightGBMError::invalid_parameter(
                        format!("{}[{}]", name, feature),
                        penalty.to_string(),
                        "must be a finite non-negative number",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Returns true if any cost is configured at all.
    pub fn has_penalties(&self) -> bool {
        self.penalty_feature_lazy.values().any(|&p| p > 0.0)
            || self.penalty_feature_coupled.values().any(|&p| p > 0.0)
    }
}

/// Table keys go through strings so the same layout works for JSON and TOML.
mod penalty_table_serde {
    use super::*;

    pub fn serialize<S: Serializer>(
        table: &BTreeMap<FeatureIndex, f64>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let keyed: BTreeMap<String, f64> = table
            .iter()
            .map(|(feature, penalty)| (feature.to_string(), *penalty))
            .collect();
        keyed.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<BTreeMap<FeatureIndex, f64>, D::Error> {
        BTreeMap::<String, f64>::deserialize(deserializer)?
            .into_iter()
            .map(|(feature, penalty)| {
                feature
                    .parse::<FeatureIndex>()
                    .map(|feature| (feature, penalty))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

/// Formats a penalty table as `f:v,f:v`.
pub fn format_penalty_table(table: &BTreeMap<FeatureIndex, f64>) -> String {
    table
        .iter()
        .map(|(feature, penalty)| format!("{}:{}", feature, penalty))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses a penalty table written by [`format_penalty_table`].
///
/// An empty string is an empty table. Repeated features keep the last value.
pub fn parse_penalty_table(parameter: &str, text: &str) -> Result<BTreeMap<FeatureIndex, f64>> {
    let mut table = BTreeMap::new();
    let text = text.trim();
    if text.is_empty() {
        return Ok(table);
    }

    for entry in text.split(',') {
        let entry = entry.trim();
        let (feature, penalty) = entry.split_once(':').ok_or_else(|| {
            LightGBMError::invalid_parameter(parameter, entry, "expected feature:penalty")
        })?;
        let feature: FeatureIndex = feature.trim().parse().map_err(|_| {
            LightGBMError::invalid_parameter(parameter, entry, "feature must be an unsigned integer")
        })?;
        let penalty: f64 = penalty.trim().parse().map_err(|_| {
            LightGBMError::invalid_parameter(parameter, entry, "penalty must be a number")
        })?;
        table.insert(feature, penalty);
    }

    Ok(table)
}
