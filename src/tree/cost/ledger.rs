//! Feature usage ledger.
//!
//! Tracks which features have already been paid for. `coupled_used` only
//! ever grows; `lazy_used` and `newly_used` are per tree and are reset by
//! [`FeatureUsageLedger::begin_tree`]. Features introduced by the tree under
//! construction sit in `newly_used` until the tree is finalized.

use crate::core::types::FeatureIndex;

/// Mutable usage state shared by every tree of one ensemble.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureUsageLedger {
    lazy_used: Vec<bool>,
    coupled_used: Vec<bool>,
    newly_used: Vec<bool>,
}

impl FeatureUsageLedger {
    /// Creates an all-false ledger for `num_features` features.
    pub fn new(num_features: usize) -> Self {
        FeatureUsageLedger {
            lazy_used: vec![false; num_features],
            coupled_used: vec![false; num_features],
            newly_used: vec![false; num_features],
        }
    }

    /// Creates a ledger whose coupled cost is already paid for `features`.
    pub fn with_coupled_used<I>(num_features: usize, features: I) -> Self
    where
        I: IntoIterator<Item = FeatureIndex>,
    {
        let mut ledger = Self::new(num_features);
        for feature in features {
            ledger.ensure_features(feature + 1);
            ledger.coupled_used[feature] = true;
        }
        ledger
    }

    /// Number of features tracked.
    pub fn num_features(&self) -> usize {
        self.coupled_used.len()
    }

    /// Grows the ledger to cover at least `num_features` features.
    pub fn ensure_features(&mut self, num_features: usize) {
        if num_features > self.coupled_used.len() {
            self.lazy_used.resize(num_features, false);
            self.coupled_used.resize(num_features, false);
            self.newly_used.resize(num_features, false);
        }
    }

    pub fn is_lazy_used(&self, feature: FeatureIndex) -> bool {
        self.lazy_used.get(feature).copied().unwrap_or(false)
    }

    pub fn is_coupled_used(&self, feature: FeatureIndex) -> bool {
        self.coupled_used.get(feature).copied().unwrap_or(false)
    }

    pub fn is_newly_used(&self, feature: FeatureIndex) -> bool {
        self.newly_used.get(feature).copied().unwrap_or(false)
    }

    /// Starts a new tree: lazy and newly-used marks are cleared.
    pub fn begin_tree(&mut self) {
        self.lazy_used.iter_mut().for_each(|v| *v = false);
        self.newly_used.iter_mut().for_each(|v| *v = false);
    }

    /// Records that the current tree has fetched `feature`.
    pub fn mark_lazy_used(&mut self, feature: FeatureIndex) {
        self.ensure_features(feature + 1);
        self.lazy_used[feature] = true;
    }

    /// Records a committed split on `feature`.
    ///
    /// Returns true if this is the first use of the feature in the ensemble.
    pub fn mark_newly_used(&mut self, feature: FeatureIndex) -> bool {
        self.ensure_features(feature + 1);
        if self.coupled_used[feature] || self.newly_used[feature] {
            return false;
        }
        self.newly_used[feature] = true;
        true
    }

    /// Merges the current tree's new features into `coupled_used`.
    ///
    /// Returns the features introduced by this tree, in ascending order.
    pub fn finalize_tree(&mut self) -> Vec<FeatureIndex> {
        let mut introduced = Vec::new();
        for (feature, newly) in self.newly_used.iter_mut().enumerate() {
            if std::mem::take(newly) && !self.coupled_used[feature] {
                self.coupled_used[feature] = true;
                introduced.push(feature);
            }
        }
        introduced
    }

    /// Features whose coupled cost has been paid.
    pub fn coupled_features(&self) -> Vec<FeatureIndex> {
        collect_set(&self.coupled_used)
    }

    /// Read-only view of the ensemble-wide state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            coupled_used: self.coupled_used.clone(),
        }
    }

    /// True if every feature paid for in `snapshot` is paid for here.
    pub fn extends(&self, snapshot: &LedgerSnapshot) -> bool {
        snapshot
            .coupled_features()
            .into_iter()
            .all(|feature| self.is_coupled_used(feature))
    }
}

/// State left behind by a finalized tree, handed to the next learner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    coupled_used: Vec<bool>,
}

impl LedgerSnapshot {
    pub fn is_coupled_used(&self, feature: FeatureIndex) -> bool {
        self.coupled_used.get(feature).copied().unwrap_or(false)
    }

    pub fn coupled_features(&self) -> Vec<FeatureIndex> {
        collect_set(&self.coupled_used)
    }

    pub fn num_features(&self) -> usize {
        self.coupled_used.len()
    }
}

fn collect_set(flags: &[bool]) -> Vec<FeatureIndex> {
    flags
        .iter()
        .enumerate()
        .filter_map(|(f, &used)| used.then_some(f))
        .collect()
}
