//! Split finding module.
//!
//! [`SplitFinder`] turns a feature histogram into the best threshold for that
//! feature; the learners decide which feature and which leaf win.

pub mod finder;

pub use finder::{leaf_gain, leaf_output, SplitFinder, SplitFinderConfig, SplitInfo};
