use super::*;
use proptest::prelude::*;

/// Two well separated blobs, 30 negatives and 10 positives.
fn imbalanced_blobs() -> (Matrix<f32>, Vec<usize>) {
    let mut data = Vec::new();
    let mut y = Vec::new();
    for i in 0..30 {
        data.push(i as f32 * 0.1);
        data.push((i % 5) as f32);
        y.push(0);
    }
    for i in 0..10 {
        data.push(10.0 + i as f32 * 0.1);
        data.push((i % 5) as f32);
        y.push(1);
    }
    (Matrix::from_vec(40, 2, data).unwrap(), y)
}

#[test]
fn test_forest_fits_and_predicts() {
    let (x, y) = imbalanced_blobs();
    let mut rf = RandomForestClassifier::new(8).with_random_state(42);
    rf.fit(&x, &y).unwrap();
    assert_eq!(rf.n_trees(), 8);
    assert_eq!(rf.n_classes(), 2);
    assert!(rf.score(&x, &y).unwrap() > 0.95);
}

#[test]
fn test_same_seed_same_forest() {
    let (x, y) = imbalanced_blobs();
    let mut a = RandomForestClassifier::new(5).with_random_state(9);
    let mut b = RandomForestClassifier::new(5).with_random_state(9);
    a.fit(&x, &y).unwrap();
    b.fit(&x, &y).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_n_jobs_does_not_change_result() {
    let (x, y) = imbalanced_blobs();
    let mut seq = RandomForestClassifier::new(6).with_random_state(3);
    let mut par = RandomForestClassifier::new(6)
        .with_random_state(3)
        .with_n_jobs(4);
    seq.fit(&x, &y).unwrap();
    par.fit(&x, &y).unwrap();
    assert_eq!(
        seq.predict_proba(&x).unwrap().as_slice(),
        par.predict_proba(&x).unwrap().as_slice()
    );
}

#[test]
fn test_balanced_subsample_forest() {
    let (x, y) = imbalanced_blobs();
    let mut rf = RandomForestClassifier::new(10)
        .with_sampling(Sampling::BalancedSubsample {
            target_imbalance_ratio: 1.0,
        })
        .with_random_state(0);
    rf.fit(&x, &y).unwrap();
    assert!(rf.score(&x, &y).unwrap() > 0.9);
}

#[test]
fn test_balanced_subsample_requires_bootstrap() {
    let (x, y) = imbalanced_blobs();
    let mut rf = RandomForestClassifier::new(3)
        .with_bootstrap(false)
        .with_sampling(Sampling::BalancedSubsample {
            target_imbalance_ratio: 0.5,
        });
    let err = rf.fit(&x, &y).unwrap_err();
    assert!(err.to_string().contains("bootstrap"));
}

#[test]
fn test_imbalance_ratio_bounds() {
    let (x, y) = imbalanced_blobs();
    for ratio in [0.1_f32, 0.05, 1.5] {
        let mut rf = RandomForestClassifier::new(2).with_sampling(Sampling::BalancedSubsample {
            target_imbalance_ratio: ratio,
        });
        assert!(rf.fit(&x, &y).is_err(), "ratio {ratio} should be rejected");
    }
}

#[test]
fn test_balanced_subsample_indices_sizes() {
    let y: Vec<usize> = std::iter::repeat(0)
        .take(100)
        .chain(std::iter::repeat(1).take(10))
        .collect();
    let mut rng = StdRng::seed_from_u64(1);
    // 10 minority + floor(10 / 0.5) = 20 majority
    let drawn = balanced_subsample_indices(&y, 0.5, &mut rng).unwrap();
    assert_eq!(drawn.len(), 30);
    assert!(drawn.iter().all(|&i| i < 110));
}

#[test]
fn test_balanced_subsample_caps_majority() {
    let y = vec![0, 0, 0, 1, 1];
    let mut rng = StdRng::seed_from_u64(1);
    // floor(2 / 0.2) = 10 majority requested, only 3 exist.
    let drawn = balanced_subsample_indices(&y, 0.2, &mut rng).unwrap();
    assert_eq!(drawn.len(), 5);
}

#[test]
fn test_balanced_subsample_single_class_error() {
    let mut rng = StdRng::seed_from_u64(1);
    assert!(balanced_subsample_indices(&[1, 1, 1], 1.0, &mut rng).is_err());
}

#[test]
fn test_balanced_class_weights() {
    let w = balanced_class_weights(&[0, 0, 0, 1], 2);
    assert!((w[0] - 4.0 / 6.0).abs() < 1e-6);
    assert!((w[1] - 2.0).abs() < 1e-6);
    assert_eq!(balanced_class_weights(&[0, 0], 2)[1], 0.0);
}

#[test]
fn test_class_weight_variants_fit() {
    let (x, y) = imbalanced_blobs();
    for cw in [ClassWeight::Balanced, ClassWeight::BalancedSubsample] {
        let mut rf = RandomForestClassifier::new(4)
            .with_class_weight(Some(cw))
            .with_random_state(11);
        rf.fit(&x, &y).unwrap();
        assert!(rf.score(&x, &y).unwrap() > 0.9);
    }
}

#[test]
fn test_warm_start_adds_trees() {
    let (x, y) = imbalanced_blobs();
    let mut rf = RandomForestClassifier::new(3)
        .with_warm_start(true)
        .with_random_state(5);
    rf.fit(&x, &y).unwrap();
    let first = rf.trees()[0].clone();
    rf.set_n_estimators(6);
    rf.fit(&x, &y).unwrap();
    assert_eq!(rf.n_trees(), 6);
    assert_eq!(rf.trees()[0], first);

    let mut once = RandomForestClassifier::new(6).with_random_state(5);
    once.fit(&x, &y).unwrap();
    assert_eq!(once.trees(), rf.trees());
}

#[test]
fn test_warm_start_same_size_is_noop() {
    let (x, y) = imbalanced_blobs();
    let mut rf = RandomForestClassifier::new(3)
        .with_warm_start(true)
        .with_random_state(5);
    rf.fit(&x, &y).unwrap();
    let before = rf.clone();
    rf.fit(&x, &y).unwrap();
    assert_eq!(rf, before);
}

#[test]
fn test_warm_start_shrink_is_error() {
    let (x, y) = imbalanced_blobs();
    let mut rf = RandomForestClassifier::new(4).with_warm_start(true);
    rf.fit(&x, &y).unwrap();
    rf.set_n_estimators(2);
    let err = rf.fit(&x, &y).unwrap_err();
    assert!(err.to_string().contains("n_estimators"));
}

#[test]
fn test_sample_weight_length_is_checked() {
    let (x, y) = imbalanced_blobs();
    let short = vec![1.0_f32; 3];
    for class_weight in [None, Some(ClassWeight::Balanced)] {
        let mut rf = RandomForestClassifier::new(2)
            .with_class_weight(class_weight)
            .with_random_state(1);
        assert!(matches!(
            rf.fit_weighted(&x, &y, Some(&short)),
            Err(EpimlError::DimensionMismatch { .. })
        ));
    }
}

#[test]
fn test_warm_start_rejects_new_class() {
    let (x, y) = imbalanced_blobs();
    let mut rf = RandomForestClassifier::new(2)
        .with_warm_start(true)
        .with_class_weight(Some(ClassWeight::Balanced))
        .with_random_state(4);
    rf.fit(&x, &y).unwrap();

    let mut y3 = y.clone();
    y3[0] = 2;
    rf.set_n_estimators(4);
    assert!(matches!(
        rf.fit(&x, &y3),
        Err(EpimlError::InvalidLabels { .. })
    ));
    assert_eq!(rf.n_trees(), 2);
    assert_eq!(rf.n_classes(), 2);
}

#[test]
fn test_oob_score_recorded() {
    let (x, y) = imbalanced_blobs();
    let mut rf = RandomForestClassifier::new(20)
        .with_oob_score(true)
        .with_random_state(2);
    rf.fit(&x, &y).unwrap();
    let oob = rf.oob_score().unwrap();
    assert!((0.0..=1.0).contains(&oob));
    assert!(oob > 0.8);
}

#[test]
fn test_oob_requires_bootstrap() {
    let (x, y) = imbalanced_blobs();
    let mut rf = RandomForestClassifier::new(2)
        .with_oob_score(true)
        .with_bootstrap(false);
    assert!(rf.fit(&x, &y).is_err());
}

#[test]
fn test_feature_importances_favor_signal() {
    let (x, y) = imbalanced_blobs();
    let mut rf = RandomForestClassifier::new(10)
        .with_max_features(MaxFeatures::All)
        .with_random_state(4);
    rf.fit(&x, &y).unwrap();
    let imp = rf.feature_importances().unwrap();
    assert!(imp[0] > imp[1]);
}

#[test]
fn test_predict_before_fit() {
    let (x, _) = imbalanced_blobs();
    let rf = RandomForestClassifier::new(2);
    assert!(rf.predict_proba(&x).is_err());
}

#[test]
fn test_repr_lists_params_alphabetically() {
    let rf = RandomForestClassifier::new(50)
        .with_sampling(Sampling::BalancedSubsample {
            target_imbalance_ratio: 1.0,
        })
        .with_random_state(7);
    assert_eq!(
        rf.to_string(),
        "RandomForestClassifier(bootstrap=True, class_weight=None, criterion='gini', \
         max_depth=None, max_features='sqrt', min_samples_leaf=1, min_samples_split=2, \
         n_estimators=50, n_jobs=1, oob_score=False, random_state=7, \
         target_imbalance_ratio=1.0, warm_start=False)"
    );
}

#[test]
fn test_set_param() {
    let mut rf = RandomForestClassifier::default();
    rf.set_param("n_estimators", &ParamValue::Int(25)).unwrap();
    rf.set_param("class_weight", &ParamValue::Str("balanced".into()))
        .unwrap();
    rf.set_param("target_imbalance_ratio", &ParamValue::Float(0.5))
        .unwrap();
    assert_eq!(
        rf.sampling(),
        Sampling::BalancedSubsample {
            target_imbalance_ratio: 0.5
        }
    );
    assert!(rf.to_string().contains("n_estimators=25"));
    assert!(rf.to_string().contains("class_weight='balanced'"));
    assert!(rf.set_param("learning_rate", &ParamValue::Float(0.1)).is_err());
}

proptest! {
    #[test]
    fn prop_balanced_draw_within_bounds(n_min in 1usize..20, n_maj in 1usize..60, ratio in 0.11f32..1.0, seed in 0u64..1000) {
        let y: Vec<usize> = (0..n_maj).map(|_| 0).chain((0..n_min).map(|_| 1)).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        let drawn = balanced_subsample_indices(&y, ratio, &mut rng).unwrap();
        prop_assert!(drawn.iter().all(|&i| i < y.len()));
        prop_assert!(drawn.len() <= 2 * n_min.min(n_maj) + n_maj.max(n_min));
    }
}
