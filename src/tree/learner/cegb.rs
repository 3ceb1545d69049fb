//! Cost-efficient gradient boosting (CEGB) tree learner.
//!
//! Grows a tree leaf-wise like [`SerialTreeLearner`], but ranks splits by
//! their gain net of feature acquisition cost:
//!
//! ```text
//! net = raw_gain - tradeoff * (lazy + coupled)
//! ```
//!
//! where each penalty is charged only if it has not been paid yet. What
//! "paid" means depends on the accounting mode of the [`CostModel`]:
//!
//! - shared mode: the lazy penalty of a feature is paid once per tree and
//!   the coupled penalty once per ensemble. A feature introduced by a split
//!   of the current tree is free for every other leaf from that point on,
//!   so the leaf that commits first pays.
//! - independent branches: a feature is free for a leaf only if it is
//!   already tested on that leaf's path from the root (or, for the coupled
//!   penalty, paid for by an earlier tree).
//!
//! The [`FeatureUsageLedger`] is borrowed mutably for the lifetime of the
//! learner and updated as splits are committed.

use crate::core::types::{DataSize, FeatureIndex, NodeIndex, Score};
use crate::dataset::Dataset;
use crate::tree::cost::{CostModel, FeatureUsageLedger, LedgerSnapshot};
use crate::tree::learner::serial::{LeafState, SerialTreeLearner, SerialTreeLearnerConfig};
use crate::tree::split::SplitInfo;
use crate::tree::tree::Tree;
use ndarray::ArrayView1;
use std::collections::BTreeSet;

/// Lifecycle of one tree-building episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnerState {
    Initialized,
    SearchingLeaves,
    Splitting,
    Finalized,
}

/// Best threshold of one feature for one leaf, with the cost charged to it.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSplit {
    pub split: SplitInfo,
    /// Unweighted marginal cost of using the feature at this leaf
    pub penalty: f64,
}

impl CandidateSplit {
    /// Gain net of weighted cost.
    pub fn net_gain(&self, tradeoff: f64) -> f64 {
        self.split.gain - tradeoff * self.penalty
    }
}

#[derive(Debug)]
struct OpenLeaf {
    state: LeafState,
    /// Indexed by feature; empty until searched
    candidates: Vec<Option<CandidateSplit>>,
    searched: bool,
    best: Option<FeatureIndex>,
}

/// Cost of using `feature` at a leaf whose root path tests `path_features`.
fn ondemand_cost(
    cost_model: &CostModel,
    ledger: &FeatureUsageLedger,
    feature: FeatureIndex,
    path_features: &BTreeSet<FeatureIndex>,
) -> f64 {
    let mut cost = 0.0;

    if cost_model.effective_independent_branches() {
        let on_path = path_features.contains(&feature);
        if cost_model.need_lazy_features() && !on_path {
            cost += cost_model.lazy_penalty(feature);
        }
        if !ledger.is_coupled_used(feature) && !on_path {
            cost += cost_model.coupled_penalty(feature);
        }
    } else {
        if cost_model.need_lazy_features() && !ledger.is_lazy_used(feature) {
            cost += cost_model.lazy_penalty(feature);
        }
        if !ledger.is_coupled_used(feature) && !ledger.is_newly_used(feature) {
            cost += cost_model.coupled_penalty(feature);
        }
    }

    cost
}

/// Highest net gain wins; ties go to the lowest feature index.
fn select_best(candidates: &[Option<CandidateSplit>], tradeoff: f64) -> Option<FeatureIndex> {
    let mut best: Option<(FeatureIndex, f64)> = None;
    for (feature, candidate) in candidates.iter().enumerate() {
        let Some(candidate) = candidate else { continue };
        let net = candidate.net_gain(tradeoff);
        if best.map_or(true, |(_, b)| net > b) {
            best = Some((feature, net));
        }
    }
    best.map(|(feature, _)| feature)
}

/// Tree learner that prices splits by feature acquisition cost.
#[derive(Debug)]
pub struct CegbTreeLearner<'a> {
    base: SerialTreeLearner,
    cost_model: &'a CostModel,
    ledger: &'a mut FeatureUsageLedger,
    predecessor: Option<LedgerSnapshot>,
    bagging: Option<&'a [DataSize]>,
    state: LearnerState,
    leaves: Vec<OpenLeaf>,
}

impl<'a> CegbTreeLearner<'a> {
    /// Creates a learner for one tree.
    ///
    /// The ledger stays borrowed until the learner is dropped; `bagging`
    /// restricts the rows the tree is grown on.
    pub fn new(
        config: SerialTreeLearnerConfig,
        cost_model: &'a CostModel,
        ledger: &'a mut FeatureUsageLedger,
        bagging: Option<&'a [DataSize]>,
    ) -> anyhow::Result<Self> {
        Ok(CegbTreeLearner {
            base: SerialTreeLearner::new(config)?,
            cost_model,
            ledger,
            predecessor: None,
            bagging,
            state: LearnerState::Initialized,
            leaves: Vec::new(),
        })
    }

    /// Attaches the state left by the previous tree.
    ///
    /// Fails if the ledger has forgotten a feature the predecessor had paid
    /// for.
    pub fn connect_to(&mut self, predecessor: Option<&LedgerSnapshot>) -> anyhow::Result<()> {
        if let Some(snapshot) = predecessor {
            if !self.ledger.extends(snapshot) {
                return Err(anyhow::anyhow!(
                    "Ledger does not extend its predecessor: predecessor paid for {:?}, ledger for {:?}",
                    snapshot.coupled_features(),
                    self.ledger.coupled_features()
                ));
            }
            log::debug!(
                "CEGB learner connected to predecessor with {} paid features",
                snapshot.coupled_features().len()
            );
        }
        self.predecessor = predecessor.cloned();
        Ok(())
    }

    pub fn predecessor(&self) -> Option<&LedgerSnapshot> {
        self.predecessor.as_ref()
    }

    pub fn state(&self) -> LearnerState {
        self.state
    }

    pub fn cost_model(&self) -> &CostModel {
        self.cost_model
    }

    pub fn ledger(&self) -> &FeatureUsageLedger {
        &*self.ledger
    }

    /// Starts a tree: clears per-tree ledger marks and opens the root leaf.
    pub fn begin_tree(
        &mut self,
        dataset: &Dataset,
        gradients: &ArrayView1<'_, Score>,
        hessians: &ArrayView1<'_, Score>,
    ) -> anyhow::Result<Tree> {
        self.ledger.ensure_features(dataset.num_features());
        self.ledger.begin_tree();
        self.leaves.clear();

        let config = self.base.config();
        let mut tree = Tree::with_capacity(config.num_leaves, config.learning_rate);
        let root = self
            .base
            .init_root(&mut tree, dataset, gradients, hessians, self.bagging)?;
        self.leaves.push(OpenLeaf {
            state: root,
            candidates: Vec::new(),
            searched: false,
            best: None,
        });
        self.state = LearnerState::Initialized;

        Ok(tree)
    }

    /// Marginal cost of splitting open leaf `leaf` on `feature` given the
    /// current ledger.
    pub fn calculate_ondemand_costs(&self, feature: FeatureIndex, leaf: NodeIndex) -> Option<f64> {
        let open = self.leaves.iter().find(|l| l.state.node_index == leaf)?;
        Some(ondemand_cost(
            self.cost_model,
            &*self.ledger,
            feature,
            &open.state.path_features,
        ))
    }

    /// Searches every open leaf that has not been searched yet.
    pub fn find_best_splits_for_leaves(
        &mut self,
        dataset: &Dataset,
        gradients: &ArrayView1<'_, Score>,
        hessians: &ArrayView1<'_, Score>,
    ) -> anyhow::Result<()> {
        self.state = LearnerState::SearchingLeaves;
        let tradeoff = self.cost_model.tradeoff();

        for leaf in self.leaves.iter_mut().filter(|l| !l.searched) {
            let raw = self
                .base
                .find_best_thresholds(dataset, gradients, hessians, &mut leaf.state)?;

            leaf.candidates = raw
                .into_iter()
                .enumerate()
                .map(|(feature, split)| {
                    split.map(|split| CandidateSplit {
                        split,
                        penalty: ondemand_cost(
                            self.cost_model,
                            &*self.ledger,
                            feature,
                            &leaf.state.path_features,
                        ),
                    })
                })
                .collect();
            leaf.best = select_best(&leaf.candidates, tradeoff);
            leaf.searched = true;
        }

        Ok(())
    }

    /// Candidates of an open leaf, indexed by feature.
    pub fn candidates(&self, leaf: NodeIndex) -> Option<&[Option<CandidateSplit>]> {
        self.leaves
            .iter()
            .find(|l| l.state.node_index == leaf)
            .map(|l| l.candidates.as_slice())
    }

    /// Winning candidate of an open leaf.
    pub fn best_split(&self, leaf: NodeIndex) -> Option<&CandidateSplit> {
        let open = self.leaves.iter().find(|l| l.state.node_index == leaf)?;
        open.best.and_then(|f| open.candidates.get(f)).and_then(Option::as_ref)
    }

    /// Open leaf whose best split has the highest strictly positive net
    /// gain; ties go to the earliest created leaf.
    pub fn best_leaf(&self) -> Option<NodeIndex> {
        let tradeoff = self.cost_model.tradeoff();
        let mut best: Option<(NodeIndex, f64)> = None;

        for leaf in &self.leaves {
            let Some(candidate) = leaf.best.and_then(|f| leaf.candidates.get(f)).and_then(Option::as_ref)
            else {
                continue;
            };
            let net = candidate.net_gain(tradeoff);
            if net <= 0.0 {
                continue;
            }
            let node = leaf.state.node_index;
            let better = match best {
                None => true,
                Some((best_node, best_net)) => net > best_net || (net == best_net && node < best_node),
            };
            if better {
                best = Some((node, net));
            }
        }

        best.map(|(node, _)| node)
    }

    /// Commits the winning split of open leaf `leaf`.
    ///
    /// The feature becomes newly used (and lazily fetched for this tree);
    /// in shared mode the remaining open leaves are re-priced.
    pub fn split(
        &mut self,
        tree: &mut Tree,
        dataset: &Dataset,
        gradients: &ArrayView1<'_, Score>,
        hessians: &ArrayView1<'_, Score>,
        leaf: NodeIndex,
    ) -> anyhow::Result<(NodeIndex, NodeIndex)> {
        self.state = LearnerState::Splitting;

        let position = self
            .leaves
            .iter()
            .position(|l| l.state.node_index == leaf)
            .ok_or_else(|| anyhow::anyhow!("Leaf {} is not open", leaf))?;
        let open = &self.leaves[position];
        let candidate = open
            .best
            .and_then(|f| open.candidates.get(f))
            .and_then(Option::as_ref)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Leaf {} has no split candidate", leaf))?;
        let (left, right) = self.base.split(
            tree,
            dataset,
            gradients,
            hessians,
            &self.leaves[position].state,
            &candidate.split,
        )?;
        self.leaves.remove(position);

        let feature = candidate.split.feature;
        let first_use = self.ledger.mark_newly_used(feature);
        if self.cost_model.need_lazy_features() {
            self.ledger.mark_lazy_used(feature);
        }

        log::debug!(
            "CEGB split: leaf {} on feature {} (raw gain={:.6}, penalty={:.6}, first use={})",
            leaf,
            feature,
            candidate.split.gain,
            candidate.penalty,
            first_use
        );

        let children = (left.node_index, right.node_index);
        for state in [left, right] {
            self.leaves.push(OpenLeaf {
                state,
                candidates: Vec::new(),
                searched: false,
                best: None,
            });
        }

        if !self.cost_model.effective_independent_branches() {
            self.reprice_open_leaves();
        }

        Ok(children)
    }

    /// Recomputes stored penalties of searched leaves against the ledger.
    fn reprice_open_leaves(&mut self) {
        let tradeoff = self.cost_model.tradeoff();
        for leaf in self.leaves.iter_mut().filter(|l| l.searched) {
            for (feature, candidate) in leaf.candidates.iter_mut().enumerate() {
                if let Some(candidate) = candidate {
                    candidate.penalty =
                        ondemand_cost(self.cost_model, &*self.ledger, feature, &leaf.state.path_features);
                }
            }
            leaf.best = select_best(&leaf.candidates, tradeoff);
        }
    }

    /// Ends the tree: newly used features become paid for the ensemble.
    pub fn finalize(&mut self) -> LedgerSnapshot {
        let introduced = self.ledger.finalize_tree();
        log::debug!(
            "CEGB tree finalized, newly introduced features: {:?}",
            introduced
        );
        self.leaves.clear();
        self.state = LearnerState::Finalized;
        self.ledger.snapshot()
    }

    /// Grows one tree and returns it with the snapshot for the next learner.
    pub fn train(
        &mut self,
        dataset: &Dataset,
        gradients: &ArrayView1<'_, Score>,
        hessians: &ArrayView1<'_, Score>,
    ) -> anyhow::Result<(Tree, LedgerSnapshot)> {
        let mut tree = self.begin_tree(dataset, gradients, hessians)?;
        let num_leaves = self.base.config().num_leaves;

        while tree.num_leaves() < num_leaves {
            self.find_best_splits_for_leaves(dataset, gradients, hessians)?;
            let Some(leaf) = self.best_leaf() else { break };
            self.split(&mut tree, dataset, gradients, hessians, leaf)?;
        }

        Ok((tree, self.finalize()))
    }
}
