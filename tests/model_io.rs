//! Saving, truncating and resuming models.

use lightgbm_cegb::*;
use std::collections::BTreeSet;

mod common;
use common::*;

fn trained(dataset: &Dataset, rounds: usize) -> Cegb {
    let config = small_tree_config()
        .boosting_type(BoostingType::CEGB)
        .cegb_tradeoff(0.2)
        .cegb_penalty_feature_coupled(0, 4.0)
        .cegb_penalty_feature_coupled(3, 25.0)
        .build()
        .unwrap();
    let mut booster = Cegb::with_config(config).unwrap();
    assert!(boost(&mut booster, dataset, rounds) >= 3);
    booster
}

#[test]
fn test_truncated_save_matches_init_predict() {
    let dataset = create_test_dataset(300, 4, 17);
    let mut original = trained(&dataset, 6);
    let text = original.save_model_to_string(Some(2)).unwrap();

    let mut loaded = Cegb::new().unwrap();
    loaded.load_model_from_string(&text).unwrap();
    assert_eq!(loaded.num_trees(), 2);

    let kept: BTreeSet<usize> = original.ensemble().trees()[..2]
        .iter()
        .flat_map(|tree| tree.used_features())
        .collect();
    assert_eq!(loaded.ledger().coupled_features(), kept.into_iter().collect::<Vec<_>>());

    original.init_predict(Some(2));
    for i in (0..dataset.num_data()).step_by(7) {
        let row = dataset.row(i);
        assert_eq!(loaded.predict_raw(&row).unwrap(), original.predict_raw(&row).unwrap());
        assert_eq!(loaded.predict_leaf_index(&row).unwrap().len(), 2);
    }
    assert_eq!(
        loaded.feature_importance(ImportanceType::Gain),
        original.feature_importance(ImportanceType::Gain)
    );
}

#[test]
fn test_saving_twice_gives_identical_text() {
    let dataset = create_test_dataset(200, 4, 2);
    let original = trained(&dataset, 4);
    let text = original.save_model_to_string(None).unwrap();

    let reloaded = create_boosting_from_string(&text).unwrap();
    assert_eq!(reloaded.save_model_to_string(None).unwrap(), text);
}

#[test]
fn test_resumed_training_keeps_paid_features() {
    let dataset = create_test_dataset(300, 4, 23);
    let original = trained(&dataset, 3);
    let paid_before = original.ledger().coupled_features();

    let mut resumed = Cegb::new().unwrap();
    resumed
        .load_model_from_string(&original.save_model_to_string(None).unwrap())
        .unwrap();
    let snapshot = resumed.last_snapshot().unwrap().clone();
    boost(&mut resumed, &dataset, 3);

    assert!(resumed.num_trees() >= original.num_trees());
    assert!(resumed.ledger().extends(&snapshot));
    for feature in paid_before {
        assert!(resumed.ledger().is_coupled_used(feature));
    }
    assert!(training_mse(&resumed, &dataset) <= training_mse(&original, &dataset) + 1e-9);
}

#[test]
fn test_split_importance_counts_splits() {
    let dataset = create_test_dataset(300, 4, 9);
    let booster = trained(&dataset, 4);

    let splits = booster.feature_importance(ImportanceType::Split);
    let total: f64 = splits.iter().sum();
    let internal: usize = booster
        .ensemble()
        .trees()
        .iter()
        .map(|tree| tree.num_leaves() - 1)
        .sum();
    assert_eq!(total as usize, internal);
    assert_eq!(splits.len(), booster.num_features());
}
