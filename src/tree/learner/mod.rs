//! Tree learning algorithms.
//!
//! [`SerialTreeLearner`] grows trees by raw gain; [`CegbTreeLearner`] drives
//! the same primitives but prices every split by feature acquisition cost.

pub mod cegb;
pub mod serial;

pub use cegb::{CandidateSplit, CegbTreeLearner, LearnerState};
pub use serial::{best_candidate, LeafState, SerialTreeLearner, SerialTreeLearnerConfig};
