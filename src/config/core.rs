//! Core configuration structures and implementation.
//!
//! This module provides the main configuration structure and builder pattern
//! for tree growth, boosting and cost-efficient split selection parameters.

use crate::config::cegb::{format_penalty_table, parse_penalty_table, CegbConfig};
use crate::core::constants::*;
use crate::core::error::{LightGBMError, Result};
use crate::core::types::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Main configuration structure for training and prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Core training parameters
    /// Objective function type, selects the prediction transform
    pub objective: ObjectiveType,
    /// Boosting algorithm type
    pub boosting_type: BoostingType,
    /// Number of boosting iterations
    pub num_iterations: usize,
    /// Learning rate (shrinkage) applied to every tree
    pub learning_rate: f64,
    /// Maximum number of leaves in one tree
    pub num_leaves: usize,
    /// Maximum depth of tree (-1 for unlimited)
    pub max_depth: i32,

    // Regularization parameters
    /// L1 regularization term
    pub lambda_l1: f64,
    /// L2 regularization term
    pub lambda_l2: f64,
    /// Minimum number of data points in a leaf
    pub min_data_in_leaf: DataSize,
    /// Minimum sum of hessian values in a leaf
    pub min_sum_hessian_in_leaf: f64,
    /// Minimum gain required to make a split
    pub min_gain_to_split: f64,

    // Feature parameters
    /// Maximum number of bins for feature discretization
    pub max_bin: usize,

    // Runtime
    /// Number of threads for histogram construction (0 = all cores)
    pub num_threads: usize,
    /// Verbosity level for logging
    pub verbosity: VerbosityLevel,

    /// Cost-efficient split selection
    pub cegb: CegbConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            objective: ObjectiveType::Regression,
            boosting_type: BoostingType::GBDT,
            num_iterations: DEFAULT_NUM_ITERATIONS,
            learning_rate: DEFAULT_LEARNING_RATE,
            num_leaves: DEFAULT_NUM_LEAVES,
            max_depth: DEFAULT_MAX_DEPTH,

            lambda_l1: DEFAULT_LAMBDA_L1,
            lambda_l2: DEFAULT_LAMBDA_L2,
            min_data_in_leaf: DEFAULT_MIN_DATA_IN_LEAF,
            min_sum_hessian_in_leaf: DEFAULT_MIN_SUM_HESSIAN_IN_LEAF,
            min_gain_to_split: 0.0,

            max_bin: DEFAULT_MAX_BIN,

            num_threads: 0,
            verbosity: DEFAULT_VERBOSITY,

            cegb: CegbConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.learning_rate <= 0.0 || self.learning_rate > 1.0 {
            return Err(LightGBMError::invalid_parameter(
                "learning_rate",
                self.learning_rate.to_string(),
                "must be in range (0.0, 1.0]",
            ));
        }

        if self.num_leaves < 2 {
            return Err(LightGBMError::invalid_parameter(
                "num_leaves",
                self.num_leaves.to_string(),
                "must be at least 2",
            ));
        }

        if self.max_depth == 0 || self.max_depth < -1 {
            return Err(LightGBMError::invalid_parameter(
                "max_depth",
                self.max_depth.to_string(),
                "must be -1 (unlimited) or positive",
            ));
        }

        if self.lambda_l1 < 0.0 {
            return Err(LightGBMError::invalid_parameter(
                "lambda_l1",
                self.lambda_l1.to_string(),
                "must be non-negative",
            ));
        }

        if self.lambda_l2 < 0.0 {
            return Err(LightGBMError::invalid_parameter(
                "lambda_l2",
                self.lambda_l2.to_string(),
                "must be non-negative",
            ));
        }

        if self.min_data_in_leaf < 1 {
            return Err(LightGBMError::invalid_parameter(
                "min_data_in_leaf",
                self.min_data_in_leaf.to_string(),
                "must be at least 1",
            ));
        }

        if self.min_sum_hessian_in_leaf < 0.0 {
            return Err(LightGBMError::invalid_parameter(
                "min_sum_hessian_in_leaf",
                self.min_sum_hessian_in_leaf.to_string(),
                "must be non-negative",
            ));
        }

        if self.min_gain_to_split < 0.0 {
            return Err(LightGBMError::invalid_parameter(
                "min_gain_to_split",
                self.min_gain_to_split.to_string(),
                "must be non-negative",
            ));
        }

        if self.max_bin < 2 || self.max_bin > 65535 {
            return Err(LightGBMError::invalid_parameter(
                "max_bin",
                self.max_bin.to_string(),
                "must be in range [2, 65535]",
            ));
        }

        if self.num_threads > num_cpus::get() * 2 {
            log::warn!(
                "num_threads ({}) is much larger than available cores ({})",
                self.num_threads,
                num_cpus::get()
            );
        }

        self.cegb.validate()?;

        if self.boosting_type != BoostingType::CEGB && self.cegb.has_penalties() {
            log::warn!(
                "cegb penalties are set but boosting_type is {}; they only affect cegb",
                self.boosting_type
            );
        }

        Ok(())
    }

    /// Load configuration from a `.json` or `.toml` file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LightGBMError::config(format!("Failed to read config file: {}", e)))?;

        let config: Config = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| LightGBMError::config(format!("Failed to parse JSON config: {}", e)))?,
            Some("toml") => toml::from_str(&content)
                .map_err(|e| LightGBMError::config(format!("Failed to parse TOML config: {}", e)))?,
            _ => {
                return Err(LightGBMError::config(
                    "Unsupported config file format. Use .json or .toml",
                ))
            }
        };

        config.validate()?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a `.json` or `.toml` file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)
                .map_err(|e| LightGBMError::config(format!("Failed to serialize to JSON: {}", e)))?,
            Some("toml") => toml::to_string_pretty(self)
                .map_err(|e| LightGBMError::config(format!("Failed to serialize to TOML: {}", e)))?,
            _ => {
                return Err(LightGBMError::config(
                    "Unsupported config file format. Use .json or .toml",
                ))
            }
        };

        std::fs::write(path, content)
            .map_err(|e| LightGBMError::config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get the effective number of threads (0 means use all available cores)
    pub fn effective_num_threads(&self) -> usize {
        if self.num_threads == 0 {
            num_cpus::get()
        } else {
            self.num_threads
        }
    }

    /// Get configuration as a parameter map, as written to the model file
    pub fn as_parameter_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();

        map.insert("objective".to_string(), self.objective.to_string());
        map.insert("boosting_type".to_string(), self.boosting_type.to_string());
        map.insert("num_iterations".to_string(), self.num_iterations.to_string());
        map.insert("learning_rate".to_string(), self.learning_rate.to_string());
        map.insert("num_leaves".to_string(), self.num_leaves.to_string());
        map.insert("max_depth".to_string(), self.max_depth.to_string());

        map.insert("lambda_l1".to_string(), self.lambda_l1.to_string());
        map.insert("lambda_l2".to_string(), self.lambda_l2.to_string());
        map.insert("min_data_in_leaf".to_string(), self.min_data_in_leaf.to_string());
        map.insert(
            "min_sum_hessian_in_leaf".to_string(),
            self.min_sum_hessian_in_leaf.to_string(),
        );
        map.insert("min_gain_to_split".to_string(), self.min_gain_to_split.to_string());
        map.insert("max_bin".to_string(), self.max_bin.to_string());
        map.insert("num_threads".to_string(), self.num_threads.to_string());

        map.insert("cegb_tradeoff".to_string(), self.cegb.tradeoff.to_string());
        map.insert(
            "cegb_independent_branches".to_string(),
            self.cegb.independent_branches.to_string(),
        );
        map.insert(
            "cegb_penalty_feature_lazy".to_string(),
            format_penalty_table(&self.cegb.penalty_feature_lazy),
        );
        map.insert(
            "cegb_penalty_feature_coupled".to_string(),
            format_penalty_table(&self.cegb.penalty_feature_coupled),
        );

        map
    }

    /// Set one parameter from its textual form, as read from a model file.
    ///
    /// Unknown keys are logged and skipped so newer files stay loadable.
    pub fn apply_parameter(&mut self, key: &str, value: &str) -> Result<()> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
            value.trim().parse::<T>().map_err(|_| {
                LightGBMError::invalid_parameter(key, value, "cannot parse value")
            })
        }

        match key {
            "objective" => self.objective = value.parse()?,
            "boosting_type" => self.boosting_type = value.parse()?,
            "num_iterations" => self.num_iterations = parse(key, value)?,
            "learning_rate" => self.learning_rate = parse(key, value)?,
            "num_leaves" => self.num_leaves = parse(key, value)?,
            "max_depth" => self.max_depth = parse(key, value)?,
            "lambda_l1" => self.lambda_l1 = parse(key, value)?,
            "lambda_l2" => self.lambda_l2 = parse(key, value)?,
            "min_data_in_leaf" => self.min_data_in_leaf = parse(key, value)?,
            "min_sum_hessian_in_leaf" => self.min_sum_hessian_in_leaf = parse(key, value)?,
            "min_gain_to_split" => self.min_gain_to_split = parse(key, value)?,
            "max_bin" => self.max_bin = parse(key, value)?,
            "num_threads" => self.num_threads = parse(key, value)?,
            "cegb_tradeoff" => self.cegb.tradeoff = parse(key, value)?,
            "cegb_independent_branches" => self.cegb.independent_branches = parse(key, value)?,
            "cegb_penalty_feature_lazy" => {
                self.cegb.penalty_feature_lazy = parse_penalty_table(key, value)?
            }
            "cegb_penalty_feature_coupled" => {
                self.cegb.penalty_feature_coupled = parse_penalty_table(key, value)?
            }
            _ => log::warn!("Ignoring unknown parameter '{}'", key),
        }

        Ok(())
    }
}

/// Configuration builder for fluent configuration creation
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
    validation_errors: Vec<String>,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
            validation_errors: Vec::new(),
        }
    }

    /// Set the objective function
    pub fn objective(mut self, objective: ObjectiveType) -> Self {
        self.config.objective = objective;
        self
    }

    /// Set the boosting algorithm
    pub fn boosting_type(mut self, boosting_type: BoostingType) -> Self {
        self.config.boosting_type = boosting_type;
        self
    }

    /// Set the number of boosting iterations
    pub fn num_iterations(mut self, iterations: usize) -> Self {
        self.config.num_iterations = iterations;
        self
    }

    /// Set the learning rate
    pub fn learning_rate(mut self, rate: f64) -> Self {
        if rate <= 0.0 || rate > 1.0 {
            self.validation_errors
                .push("learning_rate must be in range (0.0, 1.0]".to_string());
        }
        self.config.learning_rate = rate;
        self
    }

    /// Set the number of leaves
    pub fn num_leaves(mut self, leaves: usize) -> Self {
        if leaves < 2 {
            self.validation_errors
                .push("num_leaves must be at least 2".to_string());
        }
        self.config.num_leaves = leaves;
        self
    }

    /// Set the maximum tree depth
    pub fn max_depth(mut self, depth: i32) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Set L1 regularization parameter
    pub fn lambda_l1(mut self, lambda: f64) -> Self {
        if lambda < 0.0 {
            self.validation_errors
                .push("lambda_l1 must be non-negative".to_string());
        }
        self.config.lambda_l1 = lambda;
        self
    }

    /// Set L2 regularization parameter
    pub fn lambda_l2(mut self, lambda: f64) -> Self {
        if lambda < 0.0 {
            self.validation_errors
                .push("lambda_l2 must be non-negative".to_string());
        }
        self.config.lambda_l2 = lambda;
        self
    }

    /// Set minimum data points per leaf
    pub fn min_data_in_leaf(mut self, min_data: DataSize) -> Self {
        if min_data < 1 {
            self.validation_errors
                .push("min_data_in_leaf must be at least 1".to_string());
        }
        self.config.min_data_in_leaf = min_data;
        self
    }

    /// Set minimum hessian sum per leaf
    pub fn min_sum_hessian_in_leaf(mut self, min_hessian: f64) -> Self {
        self.config.min_sum_hessian_in_leaf = min_hessian;
        self
    }

    /// Set minimum gain to split
    pub fn min_gain_to_split(mut self, min_gain: f64) -> Self {
        self.config.min_gain_to_split = min_gain;
        self
    }

    /// Set maximum number of bins
    pub fn max_bin(mut self, max_bin: usize) -> Self {
        if max_bin < 2 {
            self.validation_errors
                .push("max_bin must be at least 2".to_string());
        }
        self.config.max_bin = max_bin;
        self
    }

    /// Set number of threads
    pub fn num_threads(mut self, threads: usize) -> Self {
        self.config.num_threads = threads;
        self
    }

    /// Set verbosity level
    pub fn verbosity(mut self, verbosity: VerbosityLevel) -> Self {
        self.config.verbosity = verbosity;
        self
    }

    /// Set the cost/gain tradeoff
    pub fn cegb_tradeoff(mut self, tradeoff: f64) -> Self {
        if tradeoff < 0.0 {
            self.validation_errors
                .push("cegb_tradeoff must be non-negative".to_string());
        }
        self.config.cegb.tradeoff = tradeoff;
        self
    }

    /// Set the lazy (per-instance) feature penalty for one feature
    pub fn cegb_penalty_feature_lazy(mut self, feature: FeatureIndex, penalty: f64) -> Self {
        self.config.cegb.penalty_feature_lazy.insert(feature, penalty);
        self
    }

    /// Set the coupled (one-time) feature penalty for one feature
    pub fn cegb_penalty_feature_coupled(mut self, feature: FeatureIndex, penalty: f64) -> Self {
        self.config.cegb.penalty_feature_coupled.insert(feature, penalty);
        self
    }

    /// Force independent-branch cost accounting
    pub fn cegb_independent_branches(mut self, independent: bool) -> Self {
        self.config.cegb.independent_branches = independent;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<Config> {
        if !self.validation_errors.is_empty() {
            return Err(LightGBMError::config(format!(
                "Configuration validation failed: {}",
                self.validation_errors.join(", ")
            )));
        }

        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.objective, ObjectiveType::Regression);
        assert_eq!(config.boosting_type, BoostingType::GBDT);
        assert_eq!(config.num_iterations, DEFAULT_NUM_ITERATIONS);
        assert_eq!(config.learning_rate, DEFAULT_LEARNING_RATE);
        assert_eq!(config.num_leaves, DEFAULT_NUM_LEAVES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.learning_rate = -0.1;
        assert!(config.validate().is_err());

        config.learning_rate = 0.1;
        config.num_leaves = 1;
        assert!(config.validate().is_err());

        config.num_leaves = 31;
        config.max_depth = 0;
        assert!(config.validate().is_err());

        config.max_depth = -1;
        config.cegb.penalty_feature_lazy.insert(0, -2.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .objective(ObjectiveType::Binary)
            .boosting_type(BoostingType::CEGB)
            .num_iterations(50)
            .learning_rate(0.05)
            .num_leaves(15)
            .cegb_tradeoff(0.5)
            .cegb_penalty_feature_lazy(1, 2.0)
            .cegb_penalty_feature_coupled(1, 10.0)
            .build()
            .unwrap();

        assert_eq!(config.objective, ObjectiveType::Binary);
        assert_eq!(config.boosting_type, BoostingType::CEGB);
        assert_eq!(config.num_iterations, 50);
        assert_eq!(config.cegb.tradeoff, 0.5);
        assert_eq!(config.cegb.penalty_feature_lazy.get(&1), Some(&2.0));
        assert_eq!(config.cegb.penalty_feature_coupled.get(&1), Some(&10.0));
    }

    #[test]
    fn test_config_builder_validation() {
        let result = ConfigBuilder::new()
            .learning_rate(-0.1)
            .num_leaves(1)
            .build();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("learning_rate"));
        assert!(err.to_string().contains("num_leaves"));
    }

    #[test]
    fn test_parameter_map_round_trip() {
        let original = ConfigBuilder::new()
            .boosting_type(BoostingType::CEGB)
            .objective(ObjectiveType::Poisson)
            .learning_rate(0.25)
            .max_depth(4)
            .cegb_tradeoff(2.5)
            .cegb_independent_branches(true)
            .cegb_penalty_feature_lazy(3, 0.5)
            .cegb_penalty_feature_coupled(0, 7.0)
            .build()
            .unwrap();

        let mut restored = Config::default();
        for (key, value) in original.as_parameter_map() {
            restored.apply_parameter(&key, &value).unwrap();
        }

        assert_eq!(restored, original);
    }

    #[test]
    fn test_apply_parameter_errors() {
        let mut config = Config::default();
        assert!(config.apply_parameter("num_leaves", "many").is_err());
        assert!(config.apply_parameter("boosting_type", "rf").is_err());
        assert!(config.apply_parameter("no_such_key", "1").is_ok());
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempdir().unwrap();
        let config = ConfigBuilder::new()
            .boosting_type(BoostingType::CEGB)
            .cegb_penalty_feature_coupled(2, 3.0)
            .build()
            .unwrap();

        let json_path = dir.path().join("config.json");
        config.save_to_file(&json_path).unwrap();
        assert_eq!(Config::load_from_file(&json_path).unwrap(), config);

        let toml_path = dir.path().join("config.toml");
        config.save_to_file(&toml_path).unwrap();
        assert_eq!(Config::load_from_file(&toml_path).unwrap(), config);

        assert!(config.save_to_file(dir.path().join("config.yaml")).is_err());
    }
}
