//! Core data types for the cost-efficient gradient boosting implementation.
//!
//! This module defines fundamental data types that maintain compatibility
//! with the original LightGBM C++ implementation while leveraging Rust's
//! type system for enhanced safety.

use crate::core::error::LightGBMError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Data indexing type, equivalent to `data_size_t` in LightGBM C++.
/// 32-bit integer supporting up to 2 billion data points.
pub type DataSize = i32;

/// Prediction and gradient value type, equivalent to `score_t` in LightGBM C++.
pub type Score = f32;

/// Target value and sample weight type, equivalent to `label_t` in LightGBM C++.
pub type Label = f32;

/// Histogram accumulation type, equivalent to `hist_t` in LightGBM C++.
/// 64-bit float providing numerical stability for histogram operations.
pub type Hist = f64;

/// Feature index type for identifying features in the dataset.
pub type FeatureIndex = usize;

/// Bin index type for discretized feature values.
pub type BinIndex = u32;

/// Tree node identifier type.
pub type NodeIndex = usize;

/// Iteration number type for boosting iterations.
pub type IterationIndex = usize;

/// Objective function types whose output transform the boosters know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveType {
    /// Regression task (continuous target)
    Regression,
    /// Binary classification task
    Binary,
    /// Poisson regression
    Poisson,
}

impl ObjectiveType {
    /// Maps a raw ensemble score to the objective's output space.
    pub fn transform(&self, raw: f64) -> f64 {
        match self {
            ObjectiveType::Regression => raw,
            ObjectiveType::Binary => 1.0 / (1.0 + (-raw).exp()),
            ObjectiveType::Poisson => raw.exp(),
        }
    }
}

impl Default for ObjectiveType {
    fn default() -> Self {
        ObjectiveType::Regression
    }
}

impl fmt::Display for ObjectiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectiveType::Regression => write!(f, "regression"),
            ObjectiveType::Binary => write!(f, "binary"),
            ObjectiveType::Poisson => write!(f, "poisson"),
        }
    }
}

impl FromStr for ObjectiveType {
    type Err = LightGBMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "regression" | "regression_l2" | "l2" => Ok(ObjectiveType::Regression),
            "binary" => Ok(ObjectiveType::Binary),
            "poisson" => Ok(ObjectiveType::Poisson),
            other => Err(LightGBMError::invalid_parameter(
                "objective",
                other,
                "expected one of regression, binary, poisson",
            )),
        }
    }
}

/// Boosting algorithm families a caller can ask the factory for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoostingType {
    /// Gradient Boosting Decision Tree
    GBDT,
    /// Dropouts meet Multiple Additive Regression Trees
    DART,
    /// Gradient One-Side Sampling
    GOSS,
    /// Cost-Efficient Gradient Boosting
    CEGB,
}

impl BoostingType {
    /// All families, in the order the factory documents them.
    pub const ALL: [BoostingType; 4] = [
        BoostingType::GBDT,
        BoostingType::DART,
        BoostingType::CEGB,
        BoostingType::GOSS,
    ];

    /// Storage tag this family writes on the first line of a model file.
    pub fn model_tag(&self) -> ModelTag {
        match self {
            BoostingType::CEGB => ModelTag::CegbTree,
            _ => ModelTag::Tree,
        }
    }
}

impl Default for BoostingType {
    fn default() -> Self {
        BoostingType::GBDT
    }
}

impl fmt::Display for BoostingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoostingType::GBDT => write!(f, "gbdt"),
            BoostingType::DART => write!(f, "dart"),
            BoostingType::GOSS => write!(f, "goss"),
            BoostingType::CEGB => write!(f, "cegb"),
        }
    }
}

impl FromStr for BoostingType {
    type Err = LightGBMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gbdt" => Ok(BoostingType::GBDT),
            "dart" => Ok(BoostingType::DART),
            "goss" => Ok(BoostingType::GOSS),
            "cegb" => Ok(BoostingType::CEGB),
            other => Err(LightGBMError::unknown_boosting_type(other)),
        }
    }
}

/// Type tag found on the first line of a serialized model.
///
/// The tag names a storage family, not an algorithm: every family can read a
/// plain `tree` model, only the cost-aware family can read `cegb_tree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelTag {
    /// Plain tree ensemble
    Tree,
    /// Tree ensemble carrying cost-model and ledger state
    CegbTree,
}

impl ModelTag {
    /// Returns true if a booster of the given family can load this tag.
    pub fn accepts(&self, boosting_type: BoostingType) -> bool {
        match self {
            ModelTag::Tree => true,
            ModelTag::CegbTree => boosting_type == BoostingType::CEGB,
        }
    }

    /// Family instantiated when only the tag is known.
    pub fn default_boosting_type(&self) -> BoostingType {
        match self {
            ModelTag::Tree => BoostingType::GBDT,
            ModelTag::CegbTree => BoostingType::CEGB,
        }
    }

    /// Tag text as written in the model file.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTag::Tree => "tree",
            ModelTag::CegbTree => "cegb_tree",
        }
    }
}

impl fmt::Display for ModelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelTag {
    type Err = LightGBMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_end_matches('\r') {
            "tree" => Ok(ModelTag::Tree),
            "cegb_tree" => Ok(ModelTag::CegbTree),
            other => Err(LightGBMError::unknown_model_tag(other)),
        }
    }
}

/// Feature importance calculation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportanceType {
    /// Split-based importance (frequency of splits)
    Split,
    /// Gain-based importance (sum of gains from splits)
    Gain,
}

impl Default for ImportanceType {
    fn default() -> Self {
        ImportanceType::Split
    }
}

/// Verbosity levels for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Fatal errors only
    Fatal = -1,
    /// Warnings and errors
    Warning = 0,
    /// Information, warnings, and errors
    Info = 1,
    /// Debug information
    Debug = 2,
}

impl VerbosityLevel {
    /// Level filter handed to the logger.
    pub fn level_filter(&self) -> log::LevelFilter {
        match self {
            VerbosityLevel::Fatal => log::LevelFilter::Error,
            VerbosityLevel::Warning => log::LevelFilter::Warn,
            VerbosityLevel::Info => log::LevelFilter::Info,
            VerbosityLevel::Debug => log::LevelFilter::Debug,
        }
    }
}

impl Default for VerbosityLevel {
    fn default() -> Self {
        VerbosityLevel::Info
    }
}
