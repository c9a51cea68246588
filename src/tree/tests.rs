//! Tests for decision trees.

use super::*;
use crate::primitives::Matrix;
use crate::traits::{Classifier, ParamValue, Tunable};

fn and_data() -> (Matrix<f32>, Vec<usize>) {
    let x = Matrix::from_vec(
        8,
        2,
        vec![
            0.0, 0.0, 0.1, 0.1, 0.0, 1.0, 0.1, 0.9, 1.0, 0.0, 0.9, 0.1, 1.0, 1.0, 0.9, 0.9,
        ],
    )
    .unwrap();
    let y = vec![0, 0, 0, 0, 0, 0, 1, 1];
    (x, y)
}

#[test]
fn test_leaf_class_label_ties_pick_lowest() {
    let leaf = Leaf {
        distribution: vec![0.5, 0.5],
        n_samples: 2,
    };
    assert_eq!(leaf.class_label(), 0);
}

#[test]
fn test_tree_depth_and_leaves() {
    let leaf = |c: usize| {
        let mut distribution = vec![0.0, 0.0];
        distribution[c] = 1.0;
        TreeNode::Leaf(Leaf {
            distribution,
            n_samples: 1,
        })
    };
    let tree = TreeNode::Node(Node {
        feature_idx: 0,
        threshold: 0.5,
        left: Box::new(leaf(0)),
        right: Box::new(TreeNode::Node(Node {
            feature_idx: 1,
            threshold: 0.5,
            left: Box::new(leaf(1)),
            right: Box::new(leaf(0)),
        })),
    });
    assert_eq!(tree.depth(), 2);
    assert_eq!(tree.n_leaves(), 3);
    assert_eq!(leaf(1).depth(), 0);
}

#[test]
fn test_fit_conjunction_perfectly() {
    let (x, y) = and_data();
    let mut tree = DecisionTreeClassifier::new().with_random_state(0);
    tree.fit(&x, &y).unwrap();
    assert_eq!(tree.predict(&x).unwrap(), y);
    assert!((tree.score(&x, &y).unwrap() - 1.0).abs() < 1e-6);
}

#[test]
fn test_predict_proba_rows_sum_to_one() {
    let (x, y) = and_data();
    let mut tree = DecisionTreeClassifier::new().with_max_depth(1).with_random_state(3);
    tree.fit(&x, &y).unwrap();
    let proba = tree.predict_proba(&x).unwrap();
    assert_eq!(proba.shape(), (8, 2));
    for row in 0..8 {
        let s: f32 = proba.row_slice(row).iter().sum();
        assert!((s - 1.0).abs() < 1e-5);
    }
}

#[test]
fn test_zero_weight_samples_ignored() {
    let x = Matrix::from_vec(4, 1, vec![0.0, 1.0, 2.0, 3.0]).unwrap();
    let y = vec![0, 0, 1, 1];
    let mut tree = DecisionTreeClassifier::new();
    tree.fit_weighted(&x, &y, Some(&[1.0, 1.0, 0.0, 0.0])).unwrap();
    // Only class 0 was seen with weight, so everything predicts 0.
    assert_eq!(tree.predict(&x).unwrap(), vec![0, 0, 0, 0]);
    assert_eq!(tree.n_classes(), 2);
}

#[test]
fn test_all_zero_weights_rejected() {
    let x = Matrix::from_vec(2, 1, vec![0.0, 1.0]).unwrap();
    let mut tree = DecisionTreeClassifier::new();
    assert!(tree.fit_weighted(&x, &[0, 1], Some(&[0.0, 0.0])).is_err());
}

#[test]
fn test_fit_dimension_mismatch() {
    let x = Matrix::from_vec(3, 1, vec![0.0, 1.0, 2.0]).unwrap();
    let mut tree = DecisionTreeClassifier::new();
    let err = tree.fit(&x, &[0, 1]).unwrap_err();
    assert!(matches!(err, EpimlError::DimensionMismatch { .. }));
}

#[test]
fn test_predict_before_fit() {
    let x = Matrix::from_vec(1, 1, vec![0.0]).unwrap();
    let tree = DecisionTreeClassifier::new();
    assert!(matches!(
        tree.predict(&x).unwrap_err(),
        EpimlError::NotFitted { .. }
    ));
}

#[test]
fn test_predict_wrong_width() {
    let (x, y) = and_data();
    let mut tree = DecisionTreeClassifier::new();
    tree.fit(&x, &y).unwrap();
    let narrow = Matrix::from_vec(1, 1, vec![0.0]).unwrap();
    assert!(tree.predict_proba(&narrow).is_err());
}

#[test]
fn test_invalid_min_samples_split() {
    let (x, y) = and_data();
    let mut tree = DecisionTreeClassifier::new().with_min_samples_split(1);
    assert!(tree.fit(&x, &y).is_err());
}

#[test]
fn test_feature_importances_normalized() {
    let x = Matrix::from_vec(6, 2, vec![0.0, 5.0, 1.0, 3.0, 2.0, 4.0, 10.0, 3.0, 11.0, 5.0, 12.0, 4.0])
        .unwrap();
    let y = vec![0, 0, 0, 1, 1, 1];
    let mut tree = DecisionTreeClassifier::new().with_random_state(1);
    tree.fit(&x, &y).unwrap();
    let imp = tree.feature_importances().unwrap();
    assert!((imp.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    assert!(imp[0] > imp[1]);
}

#[test]
fn test_entropy_criterion_fits() {
    let (x, y) = and_data();
    let mut tree = DecisionTreeClassifier::new()
        .with_criterion(Criterion::Entropy)
        .with_random_state(0);
    tree.fit(&x, &y).unwrap();
    assert_eq!(tree.predict(&x).unwrap(), y);
}

#[test]
fn test_max_features_resolve() {
    assert_eq!(MaxFeatures::All.resolve(9), 9);
    assert_eq!(MaxFeatures::Sqrt.resolve(9), 3);
    assert_eq!(MaxFeatures::Log2.resolve(8), 3);
    assert_eq!(MaxFeatures::Fraction(0.5).resolve(9), 4);
    assert_eq!(MaxFeatures::Count(20).resolve(9), 9);
    assert_eq!(MaxFeatures::Sqrt.resolve(1), 1);
}

#[test]
fn test_max_features_from_param() {
    assert_eq!(
        MaxFeatures::from_param(&ParamValue::Str("auto".into())).unwrap(),
        MaxFeatures::Sqrt
    );
    assert_eq!(
        MaxFeatures::from_param(&ParamValue::None).unwrap(),
        MaxFeatures::All
    );
    assert!(MaxFeatures::from_param(&ParamValue::Str("half".into())).is_err());
}

#[test]
fn test_set_params_and_repr() {
    let mut tree = DecisionTreeClassifier::new();
    tree.set_param("max_depth", &ParamValue::Int(4)).unwrap();
    tree.set_param("criterion", &ParamValue::Str("entropy".into()))
        .unwrap();
    assert_eq!(
        tree.to_string(),
        "DecisionTreeClassifier(criterion='entropy', max_depth=4, max_features=None, \
         min_samples_leaf=1, min_samples_split=2, random_state=None)"
    );
    assert!(tree.set_param("n_estimators", &ParamValue::Int(3)).is_err());
}

#[test]
fn test_serde_roundtrip_predicts_same() {
    let (x, y) = and_data();
    let mut tree = DecisionTreeClassifier::new().with_random_state(5);
    tree.fit(&x, &y).unwrap();
    let bytes = bincode::serialize(&tree).unwrap();
    let restored: DecisionTreeClassifier = bincode::deserialize(&bytes).unwrap();
    assert_eq!(restored, tree);
    assert_eq!(restored.predict(&x).unwrap(), tree.predict(&x).unwrap());
}
