//! Classification metrics for evaluating classifier performance.
//!
//! Provides accuracy, precision, recall, F-scores, confusion matrices and
//! the ranking metrics (ROC AUC, average precision) plus the Brier loss.
//! Arguments follow the `(y_true, y_pred)` order throughout.

use crate::error::{EpimlError, Result};
use crate::primitives::Matrix;

/// Averaging strategy for precision, recall and F-scores.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Average {
    /// Report only the class `pos_label`.
    Binary {
        /// The class treated as positive
        pos_label: usize,
    },
    /// Calculate metrics for each label, return unweighted mean.
    Macro,
    /// Calculate metrics globally by counting total TP, FP, FN.
    Micro,
    /// Weighted mean by support (number of true instances per label).
    Weighted,
}

impl Default for Average {
    fn default() -> Self {
        Average::Binary { pos_label: 1 }
    }
}

fn check_lengths(y_true_len: usize, y_pred_len: usize) -> Result<()> {
    if y_true_len != y_pred_len {
        return Err(EpimlError::dimension_mismatch("y_true", y_true_len, y_pred_len));
    }
    if y_true_len == 0 {
        return Err(EpimlError::empty_input("metric on zero samples"));
    }
    Ok(())
}

/// Compute classification accuracy.
///
/// accuracy = `correct_predictions` / `total_predictions`
///
/// # Errors
///
/// Returns an error if the slices have different lengths or are empty.
///
/// # Examples
///
/// ```
/// use epiml::metrics::classification::accuracy;
///
/// let y_true = vec![0, 1, 2, 0, 1, 2];
/// let y_pred = vec![0, 2, 1, 0, 0, 1];
/// let acc = accuracy(&y_true, &y_pred).unwrap();
/// assert!((acc - 0.333333).abs() < 0.001);
/// ```
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> Result<f32> {
    check_lengths(y_true.len(), y_pred.len())?;
    let correct = y_pred
        .iter()
        .zip(y_true.iter())
        .filter(|(p, t)| p == t)
        .count();
    Ok(correct as f32 / y_true.len() as f32)
}

/// Per-class true positive, false positive, false negative and support counts.
#[derive(Debug, Clone)]
struct Counts {
    tp: Vec<usize>,
    fp: Vec<usize>,
    fn_counts: Vec<usize>,
    support: Vec<usize>,
}

fn compute_counts(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Counts {
    let mut counts = Counts {
        tp: vec![0; n_classes],
        fp: vec![0; n_classes],
        fn_counts: vec![0; n_classes],
        support: vec![0; n_classes],
    };
    for (&true_label, &pred_label) in y_true.iter().zip(y_pred.iter()) {
        counts.support[true_label] += 1;
        if true_label == pred_label {
            counts.tp[true_label] += 1;
        } else {
            counts.fp[pred_label] += 1;
            counts.fn_counts[true_label] += 1;
        }
    }
    counts
}

fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 {
        0.0
    } else {
        num as f32 / den as f32
    }
}

fn fbeta_from(precision: f32, recall: f32, beta: f32) -> f32 {
    let b2 = beta * beta;
    let den = b2 * precision + recall;
    if den == 0.0 {
        0.0
    } else {
        (1.0 + b2) * precision * recall / den
    }
}

/// Which per-class statistic to average.
#[derive(Clone, Copy)]
enum Stat {
    Precision,
    Recall,
    FBeta(f32),
}

impl Stat {
    fn of(self, tp: usize, fp: usize, fn_count: usize) -> f32 {
        match self {
            Stat::Precision => ratio(tp, tp + fp),
            Stat::Recall => ratio(tp, tp + fn_count),
            Stat::FBeta(beta) => {
                fbeta_from(ratio(tp, tp + fp), ratio(tp, tp + fn_count), beta)
            }
        }
    }
}

fn averaged(y_true: &[usize], y_pred: &[usize], average: Average, stat: Stat) -> Result<f32> {
    check_lengths(y_true.len(), y_pred.len())?;
    let mut n_classes = y_true
        .iter()
        .chain(y_pred.iter())
        .max()
        .map_or(0, |&m| m + 1);
    if let Average::Binary { pos_label } = average {
        n_classes = n_classes.max(pos_label + 1);
        if n_classes > 2 {
            return Err(EpimlError::InvalidLabels {
                message: format!("binary average used on {n_classes} classes"),
            });
        }
    }
    let c = compute_counts(y_true, y_pred, n_classes);

    Ok(match average {
        Average::Binary { pos_label } => {
            stat.of(c.tp[pos_label], c.fp[pos_label], c.fn_counts[pos_label])
        }
        Average::Micro => {
            let tp: usize = c.tp.iter().sum();
            let fp: usize = c.fp.iter().sum();
            let fn_count: usize = c.fn_counts.iter().sum();
            stat.of(tp, fp, fn_count)
        }
        Average::Macro => {
            let sum: f32 = (0..n_classes)
                .map(|i| stat.of(c.tp[i], c.fp[i], c.fn_counts[i]))
                .sum();
            sum / n_classes as f32
        }
        Average::Weighted => {
            let total_support: usize = c.support.iter().sum();
            (0..n_classes)
                .map(|i| {
                    stat.of(c.tp[i], c.fp[i], c.fn_counts[i]) * ratio(c.support[i], total_support)
                })
                .sum()
        }
    })
}

/// Compute precision score.
///
/// precision = TP / (TP + FP), 0 when nothing was predicted.
///
/// # Errors
///
/// Returns an error on length mismatch, empty input, or a binary average
/// over more than two classes.
///
/// # Examples
///
/// ```
/// use epiml::metrics::classification::{precision, Average};
///
/// let y_true = vec![0, 1, 1, 0];
/// let y_pred = vec![1, 1, 1, 0];
/// let prec = precision(&y_true, &y_pred, Average::default()).unwrap();
/// assert!((prec - 2.0 / 3.0).abs() < 1e-6);
/// ```
pub fn precision(y_true: &[usize], y_pred: &[usize], average: Average) -> Result<f32> {
    averaged(y_true, y_pred, average, Stat::Precision)
}

/// Compute recall score.
///
/// recall = TP / (TP + FN)
///
/// # Errors
///
/// Same as [`precision`].
pub fn recall(y_true: &[usize], y_pred: &[usize], average: Average) -> Result<f32> {
    averaged(y_true, y_pred, average, Stat::Recall)
}

/// Compute F1 score (harmonic mean of precision and recall).
///
/// # Errors
///
/// Same as [`precision`].
pub fn f1_score(y_true: &[usize], y_pred: &[usize], average: Average) -> Result<f32> {
    averaged(y_true, y_pred, average, Stat::FBeta(1.0))
}

/// Compute the F-beta score.
///
/// F_beta = (1 + β²) · P · R / (β² · P + R). Large β favors recall.
///
/// # Errors
///
/// Same as [`precision`], plus a non-positive `beta`.
pub fn fbeta_score(y_true: &[usize], y_pred: &[usize], beta: f32, average: Average) -> Result<f32> {
    if !(beta > 0.0) {
        return Err(EpimlError::invalid_param("beta", beta, "> 0"));
    }
    averaged(y_true, y_pred, average, Stat::FBeta(beta))
}

/// Compute confusion matrix.
///
/// Element `[i, j]` counts samples with true label `i` predicted as `j`.
/// The matrix covers at least `min_classes` labels, so a binary problem
/// always yields a 2x2 matrix.
///
/// # Errors
///
/// Returns an error on length mismatch or empty input.
///
/// # Examples
///
/// ```
/// use epiml::metrics::classification::confusion_matrix;
///
/// let y_true = vec![0, 0, 1, 1];
/// let y_pred = vec![0, 1, 1, 1];
/// let cm = confusion_matrix(&y_true, &y_pred, 2).unwrap();
/// assert_eq!(cm.get(0, 1), 1);
/// assert_eq!(cm.get(1, 1), 2);
/// ```
pub fn confusion_matrix(
    y_true: &[usize],
    y_pred: &[usize],
    min_classes: usize,
) -> Result<Matrix<usize>> {
    check_lengths(y_true.len(), y_pred.len())?;
    let n_classes = y_true
        .iter()
        .chain(y_pred.iter())
        .max()
        .map_or(0, |&m| m + 1)
        .max(min_classes);

    let mut data = vec![0usize; n_classes * n_classes];
    for (&true_label, &pred_label) in y_true.iter().zip(y_pred.iter()) {
        data[true_label * n_classes + pred_label] += 1;
    }
    Matrix::from_vec(n_classes, n_classes, data)
}

fn binary_truth(y_true: &[usize]) -> Result<(usize, usize)> {
    if let Some(&bad) = y_true.iter().find(|&&t| t > 1) {
        return Err(EpimlError::InvalidLabels {
            message: format!("binary metric got class {bad}"),
        });
    }
    let n_pos = y_true.iter().filter(|&&t| t == 1).count();
    Ok((n_pos, y_true.len() - n_pos))
}

/// Area under the ROC curve for a binary problem.
///
/// Computed from the Mann-Whitney statistic with tied scores sharing
/// their average rank.
///
/// # Errors
///
/// Returns an error unless both classes are present in `y_true`.
///
/// # Examples
///
/// ```
/// use epiml::metrics::classification::roc_auc_score;
///
/// let auc = roc_auc_score(&[0, 0, 1, 1], &[0.1, 0.4, 0.35, 0.8]).unwrap();
/// assert!((auc - 0.75).abs() < 1e-6);
/// ```
pub fn roc_auc_score(y_true: &[usize], y_score: &[f32]) -> Result<f32> {
    check_lengths(y_true.len(), y_score.len())?;
    let (n_pos, n_neg) = binary_truth(y_true)?;
    if n_pos == 0 || n_neg == 0 {
        return Err(EpimlError::InvalidLabels {
            message: "only one class present in y_true; ROC AUC is not defined".to_string(),
        });
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[a].total_cmp(&y_score[b]));

    let mut rank_sum_pos = 0.0f64;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        // 1-based ranks i+1..=j+1 share their mean.
        let avg_rank = (i + j + 2) as f64 / 2.0;
        for &k in &order[i..=j] {
            if y_true[k] == 1 {
                rank_sum_pos += avg_rank;
            }
        }
        i = j + 1;
    }

    let n_pos_f = n_pos as f64;
    let u = rank_sum_pos - n_pos_f * (n_pos_f + 1.0) / 2.0;
    Ok((u / (n_pos_f * n_neg as f64)) as f32)
}

/// Average precision: Σ (Rₙ − Rₙ₋₁) Pₙ over descending score thresholds.
///
/// # Errors
///
/// Returns an error on length mismatch, empty input or non-binary labels.
/// With no positives the result is 0.
pub fn average_precision_score(y_true: &[usize], y_score: &[f32]) -> Result<f32> {
    check_lengths(y_true.len(), y_score.len())?;
    let (n_pos, _) = binary_truth(y_true)?;
    if n_pos == 0 {
        return Ok(0.0);
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[b].total_cmp(&y_score[a]));

    let mut tp = 0usize;
    let mut seen = 0usize;
    let mut prev_recall = 0.0f64;
    let mut ap = 0.0f64;
    let mut i = 0;
    while i < order.len() {
        let threshold = y_score[order[i]];
        while i < order.len() && y_score[order[i]] == threshold {
            if y_true[order[i]] == 1 {
                tp += 1;
            }
            seen += 1;
            i += 1;
        }
        let recall = tp as f64 / n_pos as f64;
        let precision = tp as f64 / seen as f64;
        ap += (recall - prev_recall) * precision;
        prev_recall = recall;
    }
    Ok(ap as f32)
}

/// Mean squared difference between the positive-class probability and the
/// 0/1 outcome.
///
/// # Errors
///
/// Returns an error on length mismatch, empty input or non-binary labels.
pub fn brier_score_loss(y_true: &[usize], y_prob: &[f32]) -> Result<f32> {
    check_lengths(y_true.len(), y_prob.len())?;
    binary_truth(y_true)?;
    let sum: f32 = y_true
        .iter()
        .zip(y_prob)
        .map(|(&t, &p)| (t as f32 - p).powi(2))
        .sum();
    Ok(sum / y_true.len() as f32)
}

#[cfg(test)]
#[path = "classification_tests.rs"]
mod tests;
