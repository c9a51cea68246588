//! Integration tests for epiml.
//!
//! These tests verify end-to-end workflows combining multiple components.

use epiml::model_selection::{nested_cross_validate, ParamDistribution, RandomizedSearchCV};
use epiml::prelude::*;
use epiml::scoring::{extract_scores_from_nested, SCORE_INDEX};
use std::fmt::Write as _;

/// Two separated blobs: positives around (5, 5), negatives around (0, 0),
/// unlabeled members mostly negative with a few hidden positives.
fn pu_blobs() -> (Matrix<f32>, Vec<i32>) {
    let mut data = Vec::new();
    let mut y = Vec::new();
    for i in 0..20 {
        let jitter = (i % 5) as f32 * 0.1;
        data.extend_from_slice(&[5.0 + jitter, 5.0 - jitter]);
        y.push(1);
    }
    for i in 0..20 {
        let jitter = (i % 4) as f32 * 0.1;
        data.extend_from_slice(&[jitter, 0.3 - jitter]);
        y.push(0);
    }
    for i in 0..36 {
        let jitter = (i % 6) as f32 * 0.05;
        data.extend_from_slice(&[0.1 + jitter, 0.2 + jitter]);
        y.push(-1);
    }
    for i in 0..4 {
        let jitter = i as f32 * 0.1;
        data.extend_from_slice(&[6.0 + jitter, 6.0]);
        y.push(-1);
    }
    (Matrix::from_vec(80, 2, data).unwrap(), y)
}

fn membership_model(seed: u64) -> PNUWrapper<RepeatedRandomSubSampler<RandomForestClassifier>> {
    let forest = RandomForestClassifier::new(8).with_max_depth(4);
    PNUWrapper::new(
        RepeatedRandomSubSampler::new(forest)
            .with_max_samples(Some(4))
            .with_random_state(seed),
    )
    .with_random_state(seed)
}

#[test]
fn test_pu_ensemble_workflow() {
    let (x, y) = pu_blobs();

    let mut model = membership_model(42);
    model.fit_pu(&x, &y).expect("Failed to fit PU model");

    let predictions = model.predict_pu(&x).unwrap();
    assert_eq!(predictions.len(), 80);
    assert!(predictions[..20].iter().all(|&p| p == 1));
    assert!(predictions[20..40].iter().all(|&p| p == 0));

    let probabilities = model.predict_positive_proba(&x).unwrap();
    assert!(probabilities.iter().all(|p| (0.0..=1.0).contains(p)));
    assert!(probabilities[0] > probabilities[20]);

    let (scores, f1) = FrankenScorer::default().score(&model, &x, &y).unwrap();
    assert!((f1 - 1.0).abs() < 1e-9, "labeled f1 should be perfect: {f1}");
    assert_eq!(scores[SCORE_INDEX].as_scalar(), Some(f1));
    assert_eq!(
        scores["confusion_matrix_lab"].as_confusion(),
        Some((20, 0, 0, 20))
    );
}

#[test]
fn test_seeded_training_is_reproducible() {
    let (x, y) = pu_blobs();
    let mut a = membership_model(7);
    let mut b = membership_model(7);
    a.fit_pu(&x, &y).unwrap();
    b.fit_pu(&x, &y).unwrap();
    assert_eq!(a.predict_positive_proba(&x).unwrap(), b.predict_positive_proba(&x).unwrap());
    assert_eq!(a.to_string(), b.to_string());
}

#[test]
fn test_randomized_search_workflow() {
    let (x, y) = pu_blobs();
    let mut search = RandomizedSearchCV::new(membership_model(3))
        .with_param("num_unlabeled", ParamDistribution::Uniform(0.2, 1.0))
        .with_param(
            "base_estimator__voting",
            ParamDistribution::Choice(vec![
                ParamValue::Str("soft".into()),
                ParamValue::Str("thresh".into()),
            ]),
        )
        .with_param(
            "base_estimator__base_estimator__n_estimators",
            ParamDistribution::IntRange(3, 6),
        )
        .with_n_iter(3)
        .with_random_state(5);
    search.fit(&x, &y).expect("search should fit");

    let params = search.best_params().unwrap();
    assert!(params.contains_key("base_estimator__voting"));
    let best = search.best_estimator().unwrap();
    assert!(best.is_fitted());
    assert_eq!(search.predict_pu(&x).unwrap(), best.predict_pu(&x).unwrap());

    let results = search.results().unwrap();
    assert_eq!(results.candidates().len(), 3);
    assert!(results.candidates().iter().any(|c| c.rank == 1));
}

#[test]
fn test_nested_cross_validation_workflow() {
    let (x, y) = pu_blobs();
    let search = RandomizedSearchCV::new(membership_model(1))
        .with_param("num_unlabeled", ParamDistribution::Uniform(0.2, 1.0))
        .with_n_iter(2)
        .with_cv(2)
        .with_random_state(9);
    let folds = nested_cross_validate(&search, &x, &y, 3, Some(4)).unwrap();
    assert_eq!(folds.len(), 3);
    assert!(folds.iter().all(|scores| scores.contains_key(SCORE_INDEX)));

    let grid = extract_scores_from_nested(&folds);
    assert_eq!(grid.n_rows(), 3);
}

#[test]
fn test_membership_file_model_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("members.tsv");
    let mut text = String::from("member_id\tlabel\tage\tvisits\n");
    for i in 0..15 {
        writeln!(text, "pos{i}\t1\t{}\t{}", 60 + i, 12 + i % 3).unwrap();
    }
    for i in 0..15 {
        writeln!(text, "neg{i}\t0\t{}\t{}", 20 + i, i % 3).unwrap();
    }
    for i in 0..20 {
        writeln!(text, "unk{i}\t-1\t{}\tNA", 25 + i % 10).unwrap();
    }
    std::fs::write(&data_path, text).unwrap();

    let config = EpimlConfig::from_toml_str(
        "random_state = 21\n[forest]\nn_estimators = 6\n[subsampler]\nmax_samples = 3\n",
    )
    .unwrap();
    let mut model = EpimlModel::new(config);
    model.generate_trained_model(&data_path).unwrap();
    let predictions = model.predict(&data_path).unwrap();
    assert_eq!(predictions.len(), 50);
    assert_eq!(predictions.labels[0], 1);
    assert_eq!(predictions.labels[15], 0);

    let model_path = dir.path().join("members.epml");
    let metadata = model.save_model(&model_path).unwrap();
    assert_eq!(metadata.feature_names, vec!["age", "visits"]);
    assert_eq!(epiml::persist::read_metadata(&model_path).unwrap(), metadata);

    let restored = EpimlModel::load_model(&model_path).unwrap();
    assert_eq!(restored.predict(&data_path).unwrap(), predictions);
    let (_, original_score) = model.score(&data_path, &FrankenScorer::default()).unwrap();
    let (_, restored_score) = restored.score(&data_path, &FrankenScorer::default()).unwrap();
    assert_eq!(original_score.to_bits(), restored_score.to_bits());
}
