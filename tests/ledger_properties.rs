//! Ledger and cost model properties across boosting iterations.

use lightgbm_cegb::*;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

mod common;
use common::*;

fn cegb(builder: ConfigBuilder) -> Cegb {
    Cegb::with_config(builder.boosting_type(BoostingType::CEGB).build().unwrap()).unwrap()
}

#[test]
fn test_independent_branches_triggers() {
    let coupled = |entries: &[(usize, f64)]| -> BTreeMap<usize, f64> { entries.iter().copied().collect() };
    let cases = [
        // (override, coupled table, tradeoff, expected)
        (false, coupled(&[(0, 1.0)]), 1.0, false),
        (true, coupled(&[(0, 1.0)]), 1.0, true),
        (false, coupled(&[]), 1.0, true),
        (false, coupled(&[(0, 1.0)]), 0.0, true),
        (true, coupled(&[]), 1.0, true),
        (true, coupled(&[(0, 1.0)]), 0.0, true),
        (false, coupled(&[]), 0.0, true),
        (true, coupled(&[]), 0.0, true),
        // an explicit zero entry still makes the table non-empty
        (false, coupled(&[(3, 0.0)]), 1.0, false),
    ];

    for (independent, penalty_feature_coupled, tradeoff, expected) in cases {
        let model = CostModel::from_config(&CegbConfig {
            tradeoff,
            independent_branches: independent,
            penalty_feature_lazy: Default::default(),
            penalty_feature_coupled,
        })
        .unwrap();
        assert_eq!(model.effective_independent_branches(), expected);
        assert_eq!(model.independent_branches(), independent);
        assert!(!model.need_lazy_features());
    }
}

#[test]
fn test_negative_penalties_are_rejected() {
    let err = ConfigBuilder::new().cegb_penalty_feature_lazy(1, -1.0).build();
    assert!(err.is_err());
    let err = CostModel::from_config(&CegbConfig {
        tradeoff: -0.1,
        ..CegbConfig::default()
    })
    .unwrap_err();
    assert!(matches!(err, LightGBMError::InvalidParameter { .. }));
}

#[test]
fn test_fresh_ensembles_do_not_share_ledgers() {
    let dataset = create_test_dataset(250, 5, 21);
    let builder = || small_tree_config().cegb_penalty_feature_coupled(0, 2.0);

    let mut first = cegb(builder());
    boost(&mut first, &dataset, 3);
    assert!(!first.ledger().coupled_features().is_empty());

    let second = cegb(builder());
    assert!(second.ledger().coupled_features().is_empty());
    assert!(second.last_snapshot().is_none());
    assert!((0..5).all(|f| !second.ledger().is_coupled_used(f)));
}

#[test]
fn test_expensive_features_are_avoided() {
    let dataset = create_test_dataset(300, 5, 8);
    let mut booster = cegb(
        small_tree_config()
            .cegb_penalty_feature_coupled(2, 1e6)
            .cegb_penalty_feature_coupled(3, 1e6)
            .cegb_penalty_feature_coupled(4, 1e6),
    );
    assert!(boost(&mut booster, &dataset, 4) > 0);

    let used = booster.ensemble().used_features();
    assert!(used.iter().all(|&f| f < 2), "used {:?}", used);
    assert_eq!(booster.ledger().coupled_features(), used.into_iter().collect::<Vec<_>>());
}

#[test]
fn test_cost_lowers_feature_count_not_just_gain() {
    let dataset = create_test_dataset(300, 5, 8);
    let mut free = cegb(small_tree_config());
    let mut costly = cegb(
        small_tree_config()
            .cegb_tradeoff(1.0)
            .cegb_penalty_feature_coupled(2, 500.0)
            .cegb_penalty_feature_coupled(3, 500.0)
            .cegb_penalty_feature_coupled(4, 500.0),
    );
    boost(&mut free, &dataset, 5);
    boost(&mut costly, &dataset, 5);

    let expensive = |booster: &Cegb| {
        booster
            .ensemble()
            .used_features()
            .into_iter()
            .filter(|&f| f >= 2)
            .count()
    };
    assert!(expensive(&costly) <= expensive(&free));

    let row = dataset.row(0);
    assert_eq!(free.predict_cost(&row).unwrap(), 0.0);
    let paid: f64 = costly
        .ensemble()
        .used_features()
        .into_iter()
        .map(|f| costly.cost_model().coupled_penalty(f))
        .sum();
    assert_eq!(costly.predict_cost(&row).unwrap(), paid);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn prop_coupled_usage_only_grows(
        penalties in proptest::collection::vec(0.0f64..30.0, 4),
        tradeoff in 0.0f64..2.0,
        independent in any::<bool>(),
        seed in 0u64..1000,
    ) {
        let dataset = create_test_dataset(120, 4, seed);
        let mut builder = small_tree_config()
            .cegb_tradeoff(tradeoff)
            .cegb_independent_branches(independent);
        for (feature, &penalty) in penalties.iter().enumerate() {
            builder = builder.cegb_penalty_feature_coupled(feature, penalty);
        }
        let mut booster = cegb(builder);

        let mut previous: BTreeSet<usize> = BTreeSet::new();
        for _ in 0..4 {
            if boost(&mut booster, &dataset, 1) == 0 {
                break;
            }
            let paid: BTreeSet<usize> = booster.ledger().coupled_features().into_iter().collect();
            prop_assert!(paid.is_superset(&previous));

            let snapshot = booster.last_snapshot().unwrap();
            prop_assert!(booster.ledger().extends(snapshot));

            let last_tree = booster.ensemble().trees().last().unwrap();
            prop_assert!(last_tree.used_features().is_subset(&paid));
            previous = paid;
        }
    }
}
