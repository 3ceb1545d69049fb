//! Cost accounting for cost-efficient tree learning.
//!
//! [`CostModel`] holds the configured penalties; [`FeatureUsageLedger`]
//! records which of them have already been paid.

pub mod ledger;
pub mod model;

pub use ledger::{FeatureUsageLedger, LedgerSnapshot};
pub use model::CostModel;
