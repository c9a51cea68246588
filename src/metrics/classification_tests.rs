use super::*;

#[test]
fn test_accuracy_perfect_and_mismatch() {
    assert!((accuracy(&[0, 1, 1], &[0, 1, 1]).unwrap() - 1.0).abs() < 1e-6);
    assert!(accuracy(&[0, 1], &[0]).is_err());
    assert!(accuracy(&[], &[]).is_err());
}

#[test]
fn test_binary_precision_recall_f1() {
    let y_true = vec![1, 1, 1, 0, 0, 0];
    let y_pred = vec![1, 1, 0, 1, 0, 0];
    let avg = Average::default();
    // tp=2, fp=1, fn=1
    assert!((precision(&y_true, &y_pred, avg).unwrap() - 2.0 / 3.0).abs() < 1e-6);
    assert!((recall(&y_true, &y_pred, avg).unwrap() - 2.0 / 3.0).abs() < 1e-6);
    assert!((f1_score(&y_true, &y_pred, avg).unwrap() - 2.0 / 3.0).abs() < 1e-6);
}

#[test]
fn test_binary_pos_label_zero() {
    let y_true = vec![1, 1, 0, 0];
    let y_pred = vec![1, 0, 0, 0];
    let p = precision(&y_true, &y_pred, Average::Binary { pos_label: 0 }).unwrap();
    assert!((p - 2.0 / 3.0).abs() < 1e-6);
}

#[test]
fn test_binary_no_predicted_positive_is_zero() {
    assert_eq!(precision(&[1, 0], &[0, 0], Average::default()).unwrap(), 0.0);
    assert_eq!(f1_score(&[1, 0], &[0, 0], Average::default()).unwrap(), 0.0);
}

#[test]
fn test_binary_average_rejects_multiclass() {
    assert!(precision(&[0, 1, 2], &[0, 1, 2], Average::default()).is_err());
}

#[test]
fn test_macro_micro_weighted() {
    let y_true = vec![0, 1, 2, 0, 1, 2];
    let y_pred = vec![0, 2, 1, 0, 0, 1];
    let micro = precision(&y_true, &y_pred, Average::Micro).unwrap();
    let acc = accuracy(&y_true, &y_pred).unwrap();
    assert!((micro - acc).abs() < 1e-6);
    let macro_r = recall(&y_true, &y_pred, Average::Macro).unwrap();
    // class recalls: 1.0, 0.0, 0.0
    assert!((macro_r - 1.0 / 3.0).abs() < 1e-6);
    let weighted = recall(&y_true, &y_pred, Average::Weighted).unwrap();
    assert!((weighted - 1.0 / 3.0).abs() < 1e-6);
}

#[test]
fn test_fbeta_large_beta_approaches_recall() {
    let y_true = vec![1, 1, 1, 1, 0, 0];
    let y_pred = vec![1, 1, 1, 1, 1, 1];
    // precision 4/6, recall 1
    let f10 = fbeta_score(&y_true, &y_pred, 10.0, Average::default()).unwrap();
    let expected = 101.0 * (4.0 / 6.0) / (100.0 * (4.0 / 6.0) + 1.0);
    assert!((f10 - expected).abs() < 1e-5);
    assert!(f10 > 0.99);
    assert!(fbeta_score(&y_true, &y_pred, 0.0, Average::default()).is_err());
}

#[test]
fn test_confusion_matrix_min_classes() {
    let cm = confusion_matrix(&[0, 0], &[0, 0], 2).unwrap();
    assert_eq!(cm.shape(), (2, 2));
    assert_eq!(cm.get(0, 0), 2);
    assert_eq!(cm.get(1, 1), 0);
}

#[test]
fn test_roc_auc_perfect_and_ties() {
    assert!((roc_auc_score(&[0, 0, 1, 1], &[0.1, 0.2, 0.8, 0.9]).unwrap() - 1.0).abs() < 1e-6);
    assert!((roc_auc_score(&[0, 1], &[0.5, 0.5]).unwrap() - 0.5).abs() < 1e-6);
    // Hard 0/1 predictions with one error on each side.
    let auc = roc_auc_score(&[0, 0, 1, 1], &[0.0, 1.0, 1.0, 0.0]).unwrap();
    assert!((auc - 0.5).abs() < 1e-6);
}

#[test]
fn test_roc_auc_single_class_error() {
    assert!(roc_auc_score(&[1, 1], &[0.2, 0.3]).is_err());
}

#[test]
fn test_average_precision() {
    let ap = average_precision_score(&[0, 0, 1, 1], &[0.1, 0.4, 0.35, 0.8]).unwrap();
    // thresholds 0.8 (P=1,R=.5), 0.4 (P=.5), 0.35 (P=2/3,R=1), 0.1
    assert!((ap - (0.5 + 0.5 * 2.0 / 3.0)).abs() < 1e-6);
    assert_eq!(average_precision_score(&[0, 0], &[0.1, 0.2]).unwrap(), 0.0);
}

#[test]
fn test_average_precision_hard_labels() {
    // All predicted positive: single threshold, AP equals the positive rate.
    let ap = average_precision_score(&[1, 0, 0, 1], &[1.0, 1.0, 1.0, 1.0]).unwrap();
    assert!((ap - 0.5).abs() < 1e-6);
}

#[test]
fn test_brier_score() {
    let loss = brier_score_loss(&[0, 1, 1, 0], &[0.1, 0.9, 0.8, 0.3]).unwrap();
    assert!((loss - 0.0375).abs() < 1e-6);
    assert!(brier_score_loss(&[2], &[0.5]).is_err());
}
