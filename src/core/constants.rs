//! System constants and configuration defaults.

use crate::core::types::*;

/// Default maximum number of bins for feature discretization.
/// This balances memory usage with split finding quality.
pub const DEFAULT_MAX_BIN: usize = 255;

/// Default minimum number of data points required in a leaf.
pub const DEFAULT_MIN_DATA_IN_LEAF: DataSize = 20;

/// Default minimum sum of hessian values required in a leaf.
pub const DEFAULT_MIN_SUM_HESSIAN_IN_LEAF: f64 = 1e-3;

/// Default maximum tree depth.
/// Negative value means no limit.
pub const DEFAULT_MAX_DEPTH: i32 = -1;

/// Default number of leaves for each tree.
pub const DEFAULT_NUM_LEAVES: usize = 31;

/// Default learning rate (shrinkage) for gradient boosting.
pub const DEFAULT_LEARNING_RATE: f64 = 0.1;

/// Default L1 regularization parameter.
pub const DEFAULT_LAMBDA_L1: f64 = 0.0;

/// Default L2 regularization parameter.
pub const DEFAULT_LAMBDA_L2: f64 = 0.0;

/// Default number of boosting iterations.
pub const DEFAULT_NUM_ITERATIONS: usize = 100;

/// Default tradeoff between split gain and feature acquisition cost.
pub const DEFAULT_CEGB_TRADEOFF: f64 = 1.0;

/// Default verbosity level for logging.
pub const DEFAULT_VERBOSITY: VerbosityLevel = VerbosityLevel::Info;

/// Gains at or below this value are treated as no improvement.
pub const K_EPSILON: f64 = 1e-15;

/// Version string written into model files.
pub const MODEL_VERSION: &str = "v1";

/// Library version
pub const LIGHTGBM_CEGB_VERSION: &str = env!("CARGO_PKG_VERSION");
