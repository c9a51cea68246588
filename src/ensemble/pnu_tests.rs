use super::*;
use crate::ensemble::RepeatedRandomSubSampler;
use crate::tree::{DecisionTreeClassifier, RandomForestClassifier};

/// 10 positives near 5, 5 labeled negatives near 0 and 30 unlabeled rows
/// mostly near 0 with three hidden positives near 5.
fn pu_data() -> (Matrix<f32>, Vec<i32>) {
    let mut data = Vec::new();
    let mut y = Vec::new();
    for i in 0..10 {
        data.push(5.0 + i as f32 * 0.05);
        y.push(1);
    }
    for i in 0..5 {
        data.push(i as f32 * 0.05);
        y.push(0);
    }
    for i in 0..27 {
        data.push(0.3 + i as f32 * 0.03);
        y.push(-1);
    }
    for i in 0..3 {
        data.push(5.0 + (i + 2) as f32 * 0.05);
        y.push(-1);
    }
    (Matrix::from_vec(45, 1, data).unwrap(), y)
}

#[test]
fn test_fit_and_predict_labels_are_binary() {
    let (x, y) = pu_data();
    let mut pnu = PNUWrapper::new(DecisionTreeClassifier::new())
        .with_num_unlabeled(0.5)
        .with_random_state(1);
    pnu.fit_pu(&x, &y).unwrap();
    let pred = pnu.predict_pu(&x).unwrap();
    assert!(pred.iter().all(|&p| p == 0 || p == 1));
    // Rows 2..5 share their value with hidden positives that may be sampled as negatives.
    assert!(pred[..2].iter().chain(&pred[5..10]).all(|&p| p == 1));
    assert!(pred[10..15].iter().all(|&p| p == 0));
}

#[test]
fn test_sample_count_and_fraction() {
    let pnu = PNUWrapper::new(DecisionTreeClassifier::new()).with_num_unlabeled(12.0);
    assert_eq!(pnu.n_unlabeled_to_sample(30), 12);
    assert_eq!(pnu.n_unlabeled_to_sample(5), 5);
    let frac = PNUWrapper::new(DecisionTreeClassifier::new()).with_num_unlabeled(0.25);
    assert_eq!(frac.n_unlabeled_to_sample(40), 10);
    let none = PNUWrapper::new(DecisionTreeClassifier::new());
    assert_eq!(none.n_unlabeled_to_sample(40), 0);
}

#[test]
fn test_no_positives_is_error() {
    let x = Matrix::from_vec(3, 1, vec![0.0, 1.0, 2.0]).unwrap();
    let mut pnu = PNUWrapper::new(DecisionTreeClassifier::new()).with_num_unlabeled(1.0);
    let err = pnu.fit_pu(&x, &[0, -1, -1]).unwrap_err();
    assert!(err.to_string().contains("no positive"));
}

#[test]
fn test_bad_label_is_error() {
    let x = Matrix::from_vec(3, 1, vec![0.0, 1.0, 2.0]).unwrap();
    let mut pnu = PNUWrapper::new(DecisionTreeClassifier::new());
    assert!(matches!(
        pnu.fit_pu(&x, &[0, 1, 2]).unwrap_err(),
        EpimlError::InvalidLabels { .. }
    ));
}

#[test]
fn test_single_class_without_unlabeled_sampling() {
    let x = Matrix::from_vec(3, 1, vec![0.0, 1.0, 2.0]).unwrap();
    let mut pnu = PNUWrapper::new(DecisionTreeClassifier::new());
    assert!(pnu.fit_pu(&x, &[1, -1, -1]).is_err());
}

#[test]
fn test_unlabeled_only_negatives_work() {
    let x = Matrix::from_vec(4, 1, vec![0.0, 0.1, 5.0, 5.1]).unwrap();
    let mut pnu = PNUWrapper::new(DecisionTreeClassifier::new())
        .with_num_unlabeled(2.0)
        .with_random_state(0);
    pnu.fit_pu(&x, &[-1, -1, 1, 1]).unwrap();
    assert_eq!(pnu.predict_pu(&x).unwrap(), vec![0, 0, 1, 1]);
}

#[test]
fn test_pu_iter_requires_threshold() {
    let (x, y) = pu_data();
    let mut pnu = PNUWrapper::new(DecisionTreeClassifier::new())
        .with_num_unlabeled(10.0)
        .with_pu_iter(2);
    assert!(pnu.fit_pu(&x, &y).is_err());
}

#[test]
fn test_pu_iter_relabels_hidden_positives() {
    let (x, y) = pu_data();
    let mut pnu = PNUWrapper::new(RandomForestClassifier::new(10))
        .with_num_unlabeled(30.0)
        .with_pu_iter(2)
        .with_threshold_set_pct(Some(0.1))
        .with_random_state(5);
    pnu.fit_pu(&x, &y).unwrap();
    let pred = pnu.predict_pu(&x).unwrap();
    // The three hidden positives sit with the labeled positives.
    assert_eq!(&pred[42..], &[1, 1, 1]);
    assert!(pred[..10].iter().all(|&p| p == 1));
}

#[test]
fn test_positive_proba_in_unit_interval() {
    let (x, y) = pu_data();
    let mut pnu = PNUWrapper::new(RepeatedRandomSubSampler::new(RandomForestClassifier::new(4)))
        .with_num_unlabeled(20.0)
        .with_random_state(9);
    pnu.fit_pu(&x, &y).unwrap();
    let proba = pnu.predict_positive_proba(&x).unwrap();
    assert_eq!(proba.len(), 45);
    assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn test_predict_before_fit() {
    let (x, _) = pu_data();
    let pnu = PNUWrapper::new(DecisionTreeClassifier::new());
    assert!(matches!(
        pnu.predict_pu(&x).unwrap_err(),
        EpimlError::NotFitted { .. }
    ));
    assert!(!pnu.is_fitted());
}

#[test]
fn test_double_nested_params_and_repr() {
    let mut pnu = PNUWrapper::new(RepeatedRandomSubSampler::new(RandomForestClassifier::new(10)));
    pnu.set_param(
        "base_estimator__base_estimator__max_depth",
        &ParamValue::Int(6),
    )
    .unwrap();
    pnu.set_param("num_unlabeled", &ParamValue::Int(100)).unwrap();
    pnu.set_param("threshold_set_pct", &ParamValue::Float(0.25))
        .unwrap();
    let repr = pnu.to_string();
    assert!(repr.starts_with(
        "PNUWrapper(base_estimator=RepeatedRandomSubSampler(base_estimator=RandomForestClassifier("
    ));
    assert!(repr.contains("max_depth=6"));
    assert!(repr.ends_with("num_unlabeled=100.0, pu_iter=0, random_state=None, threshold_set_pct=0.25)"));
}
