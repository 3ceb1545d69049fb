//! Tree learning module.
//!
//! Decision tree structures, histogram construction, split finding, the
//! serial and cost-aware learners, and the cost accounting they share.

pub mod cost;
pub mod histogram;
pub mod learner;
pub mod node;
pub mod split;
#[allow(clippy::module_inception)]
pub mod tree;

pub use cost::{CostModel, FeatureUsageLedger, LedgerSnapshot};
pub use histogram::{FeatureHistogram, HistogramBuilder, HistogramBuilderConfig};
pub use learner::{
    CandidateSplit, CegbTreeLearner, LeafState, LearnerState, SerialTreeLearner,
    SerialTreeLearnerConfig,
};
pub use node::{NodeSplit, TreeNode};
pub use split::{SplitFinder, SplitFinderConfig, SplitInfo};
pub use tree::Tree;
