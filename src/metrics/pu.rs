//! Metrics for positive-unlabeled data.
//!
//! Truth labels use `-1` for unlabeled, `0` for negative and `1` for
//! positive. Predictions are `0` or `1`.

use super::classification::brier_score_loss;
use crate::error::{EpimlError, Result};

/// Label of an unlabeled sample.
pub const UNLABELED: i32 = -1;

fn check_lengths(y_true: usize, y_pred: usize) -> Result<()> {
    if y_true != y_pred {
        return Err(EpimlError::dimension_mismatch("y_true", y_true, y_pred));
    }
    if y_true == 0 {
        return Err(EpimlError::empty_input("metric on zero samples"));
    }
    Ok(())
}

fn to_class(label: i32) -> Result<usize> {
    match label {
        0 => Ok(0),
        1 => Ok(1),
        other => Err(EpimlError::InvalidLabels {
            message: format!("expected 0 or 1, found {other}"),
        }),
    }
}

/// PU score, an F1-like measure usable without labeled negatives.
///
/// pu_score = recall² / P(y_pred = 1)
///
/// Recall counts only labeled positives. Returns 0 when nothing is
/// predicted positive.
///
/// # Errors
///
/// Returns an error on length mismatch or empty input.
///
/// # Examples
///
/// ```
/// use epiml::metrics::pu::pu_score;
///
/// let y_true = vec![1, 1, -1, -1];
/// let y_pred = vec![1, 0, 1, 0];
/// // recall 0.5, half predicted positive
/// assert!((pu_score(&y_true, &y_pred).unwrap() - 0.5).abs() < 1e-6);
/// ```
pub fn pu_score(y_true: &[i32], y_pred: &[i32]) -> Result<f32> {
    check_lengths(y_true.len(), y_pred.len())?;
    let tp = y_true
        .iter()
        .zip(y_pred)
        .filter(|&(&t, &p)| t == 1 && p == 1)
        .count();
    let n_pos = if tp > 0 {
        y_true.iter().filter(|&&t| t == 1).count()
    } else {
        1
    };
    let recall = tp as f32 / n_pos as f32;
    let predicted_pos = y_pred.iter().filter(|&&p| p == 1).count();
    if predicted_pos == 0 {
        return Ok(0.0);
    }
    let pr_true = predicted_pos as f32 / y_pred.len() as f32;
    Ok(recall * recall / pr_true)
}

/// Squared distance between the positive rate among unlabeled rows and
/// the expected `prior`. 0 when there are no unlabeled rows.
///
/// # Errors
///
/// Returns an error on length mismatch or empty input.
pub fn prior_squared_error(y_true: &[i32], y_pred: &[i32], prior: f32) -> Result<f32> {
    check_lengths(y_true.len(), y_pred.len())?;
    let unlabeled_n = y_true.iter().filter(|&&t| t == UNLABELED).count();
    if unlabeled_n == 0 {
        return Ok(0.0);
    }
    Ok((pr_one_unlabeled(y_true, y_pred)? - prior).powi(2))
}

/// Fraction of unlabeled rows predicted positive (0 without unlabeled rows).
///
/// # Errors
///
/// Returns an error on length mismatch or empty input.
pub fn pr_one_unlabeled(y_true: &[i32], y_pred: &[i32]) -> Result<f32> {
    check_lengths(y_true.len(), y_pred.len())?;
    let (n, pos) = y_true
        .iter()
        .zip(y_pred)
        .filter(|&(&t, _)| t == UNLABELED)
        .fold((0usize, 0usize), |(n, pos), (_, &p)| (n + 1, pos + usize::from(p == 1)));
    if n == 0 {
        Ok(0.0)
    } else {
        Ok(pos as f32 / n as f32)
    }
}

/// Applies `metric` to the labeled rows only.
///
/// # Errors
///
/// Returns an error on length mismatch, when no row is labeled, or
/// whatever `metric` returns.
pub fn labeled_metric<T, R, F>(y_true: &[i32], y_values: &[T], metric: F) -> Result<R>
where
    T: Copy,
    F: FnOnce(&[usize], &[T]) -> Result<R>,
{
    check_lengths(y_true.len(), y_values.len())?;
    let mut truth = Vec::new();
    let mut values = Vec::new();
    for (&t, &v) in y_true.iter().zip(y_values) {
        if t != UNLABELED {
            truth.push(to_class(t)?);
            values.push(v);
        }
    }
    if truth.is_empty() {
        return Err(EpimlError::empty_input("no labeled rows"));
    }
    metric(&truth, &values)
}

/// Applies `metric` treating unlabeled rows as negatives.
///
/// # Errors
///
/// Returns an error on length mismatch or whatever `metric` returns.
pub fn assumed_metric<T, R, F>(y_true: &[i32], y_values: &[T], metric: F) -> Result<R>
where
    F: FnOnce(&[usize], &[T]) -> Result<R>,
{
    check_lengths(y_true.len(), y_values.len())?;
    let truth = y_true
        .iter()
        .map(|&t| if t == UNLABELED { Ok(0) } else { to_class(t) })
        .collect::<Result<Vec<usize>>>()?;
    metric(&truth, y_values)
}

/// Brier loss over the rows whose truth equals `label`.
///
/// # Errors
///
/// Returns an error on length mismatch or when no row has `label`.
pub fn brier_score_partial_loss(y_true: &[usize], y_prob: &[f32], label: usize) -> Result<f32> {
    check_lengths(y_true.len(), y_prob.len())?;
    let (truth, prob): (Vec<usize>, Vec<f32>) = y_true
        .iter()
        .zip(y_prob)
        .filter(|&(&t, _)| t == label)
        .map(|(&t, &p)| (t, p))
        .unzip();
    if truth.is_empty() {
        return Err(EpimlError::empty_input("no rows with the requested label"));
    }
    brier_score_loss(&truth, &prob)
}

/// Brier loss over the labeled rows.
///
/// # Errors
///
/// See [`labeled_metric`].
pub fn brier_score_labeled_loss(y_true: &[i32], y_prob: &[f32]) -> Result<f32> {
    labeled_metric(y_true, y_prob, brier_score_loss)
}

/// Prior used by [`Scorer::prior_squared_error_015`].
pub const DEFAULT_PRIOR: f32 = 0.015;

/// A named PU metric usable for model selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scorer {
    /// [`pu_score`]
    Pu,
    /// [`prior_squared_error`] against `prior`
    PriorSquaredError {
        /// Expected positive rate among unlabeled rows
        prior: f32,
    },
    /// [`brier_score_labeled_loss`]
    BrierLabeledLoss,
}

impl Scorer {
    /// [`pu_score`] scorer.
    #[must_use]
    pub fn pu() -> Self {
        Scorer::Pu
    }

    /// [`prior_squared_error`] with a prior of 0.015.
    #[must_use]
    pub fn prior_squared_error_015() -> Self {
        Scorer::PriorSquaredError {
            prior: DEFAULT_PRIOR,
        }
    }

    /// [`brier_score_labeled_loss`] scorer.
    #[must_use]
    pub fn brier_score_labeled_loss() -> Self {
        Scorer::BrierLabeledLoss
    }

    /// Whether higher values are better.
    #[must_use]
    pub fn greater_is_better(self) -> bool {
        matches!(self, Scorer::Pu)
    }

    /// Whether the scorer reads probabilities instead of labels.
    #[must_use]
    pub fn needs_proba(self) -> bool {
        matches!(self, Scorer::BrierLabeledLoss)
    }

    /// Raw metric value.
    ///
    /// # Errors
    ///
    /// Propagates the metric's error.
    pub fn evaluate(self, y_true: &[i32], y_pred: &[i32], y_prob: &[f32]) -> Result<f32> {
        match self {
            Scorer::Pu => pu_score(y_true, y_pred),
            Scorer::PriorSquaredError { prior } => prior_squared_error(y_true, y_pred, prior),
            Scorer::BrierLabeledLoss => brier_score_labeled_loss(y_true, y_prob),
        }
    }

    /// Metric value signed so that larger is always better.
    ///
    /// # Errors
    ///
    /// Propagates the metric's error.
    pub fn score(self, y_true: &[i32], y_pred: &[i32], y_prob: &[f32]) -> Result<f32> {
        let value = self.evaluate(y_true, y_pred, y_prob)?;
        Ok(if self.greater_is_better() { value } else { -value })
    }
}
