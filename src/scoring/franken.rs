//! The all-metrics scorer.

use crate::error::{EpimlError, Result};
use crate::metrics::classification::{
    accuracy, average_precision_score, brier_score_loss, confusion_matrix, f1_score, fbeta_score,
    precision, recall, roc_auc_score, Average,
};
use crate::metrics::pu::{
    assumed_metric, brier_score_partial_loss, labeled_metric, pr_one_unlabeled, pu_score,
};
use crate::primitives::Matrix;
use crate::traits::PuClassifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Key under which the decision score is repeated in [`ScoreData`].
pub const SCORE_INDEX: &str = "SCORE";

/// Every metric [`FrankenScorer`] reports, in reporting order.
pub const SCORE_KEYS: [&str; 17] = [
    "labeled_acc",
    "labeled_prec",
    "labeled_recall",
    "labeled_f1",
    "labeled_roc_auc",
    "labeled_avg_prec",
    "labeled_brier",
    "labeled_brier_pos",
    "labeled_brier_neg",
    "confusion_matrix_lab",
    "pr_one_unlabeled",
    "assumed_brier",
    "assumed_brier_neg",
    "assumed_f1",
    "assumed_f1beta10",
    "confusion_matrix_un",
    "pu_score",
];

/// A single reported value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreValue {
    /// A scalar metric; `NaN` when undefined on the given data
    Scalar(f64),
    /// A 2x2 confusion matrix `[[tn, fp], [fn, tp]]`
    Confusion([[u64; 2]; 2]),
}

impl ScoreValue {
    /// The scalar value, if this is one.
    #[must_use]
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            ScoreValue::Scalar(v) => Some(*v),
            ScoreValue::Confusion(_) => None,
        }
    }

    /// `(tn, fp, fn, tp)` for a confusion matrix.
    #[must_use]
    pub fn as_confusion(&self) -> Option<(u64, u64, u64, u64)> {
        match self {
            ScoreValue::Confusion([[tn, fp], [fn_, tp]]) => Some((*tn, *fp, *fn_, *tp)),
            ScoreValue::Scalar(_) => None,
        }
    }
}

/// Metric name to value.
pub type ScoreData = BTreeMap<String, ScoreValue>;

fn scalar(key: &str, value: Result<f32>) -> ScoreValue {
    match value {
        Ok(v) => ScoreValue::Scalar(f64::from(v)),
        Err(e) => {
            debug!(metric = key, error = %e, "metric undefined on this split");
            ScoreValue::Scalar(f64::NAN)
        }
    }
}

fn confusion(key: &str, value: Result<Matrix<usize>>) -> ScoreValue {
    match value {
        Ok(cm) if cm.shape() == (2, 2) => ScoreValue::Confusion([
            [cm.get(0, 0) as u64, cm.get(0, 1) as u64],
            [cm.get(1, 0) as u64, cm.get(1, 1) as u64],
        ]),
        Ok(_) => ScoreValue::Scalar(f64::NAN),
        Err(e) => {
            debug!(metric = key, error = %e, "confusion matrix undefined on this split");
            ScoreValue::Confusion([[0, 0], [0, 0]])
        }
    }
}

/// Scorer returning every metric plus one decision score.
///
/// # Example
///
/// ```
/// use epiml::scoring::FrankenScorer;
///
/// let scorer = FrankenScorer::default();
/// let y_true = vec![1, 0, -1, -1];
/// let y_pred = vec![1, 0, 1, 0];
/// let y_prob = vec![0.9, 0.2, 0.7, 0.1];
/// let (data, score) = scorer.score_predictions(&y_true, &y_pred, &y_prob).unwrap();
/// assert_eq!(score, 1.0); // labeled_f1
/// assert!(data.contains_key("pu_score"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrankenScorer {
    decision_score: String,
}

impl Default for FrankenScorer {
    fn default() -> Self {
        Self {
            decision_score: "labeled_f1".to_string(),
        }
    }
}

fn check_decision_score(name: &str) -> Result<()> {
    if SCORE_KEYS.contains(&name) && !name.starts_with("confusion_matrix") {
        Ok(())
    } else {
        Err(EpimlError::invalid_param(
            "decision_score",
            name,
            "one of the scalar FrankenScorer metrics",
        ))
    }
}

impl FrankenScorer {
    /// Creates a scorer deciding on `decision_score`.
    ///
    /// # Errors
    ///
    /// Returns an error for names that are not scalar metrics.
    pub fn new(decision_score: &str) -> Result<Self> {
        check_decision_score(decision_score)?;
        Ok(Self {
            decision_score: decision_score.to_string(),
        })
    }

    /// Name of the decision metric.
    #[must_use]
    pub fn decision_score(&self) -> &str {
        &self.decision_score
    }

    /// Switches the decision metric.
    ///
    /// # Errors
    ///
    /// Returns an error for names that are not scalar metrics.
    pub fn change_decision_score(&mut self, decision_score: &str) -> Result<&mut Self> {
        check_decision_score(decision_score)?;
        self.decision_score = decision_score.to_string();
        Ok(self)
    }

    /// Scores a fitted estimator on `(x, y_true)`.
    ///
    /// # Errors
    ///
    /// Propagates prediction errors and length mismatches.
    pub fn score<C: PuClassifier + ?Sized>(
        &self,
        estimator: &C,
        x: &Matrix<f32>,
        y_true: &[i32],
    ) -> Result<(ScoreData, f64)> {
        let y_pred = estimator.predict_pu(x)?;
        let y_prob = estimator.predict_positive_proba(x)?;
        self.score_predictions(y_true, &y_pred, &y_prob)
    }

    /// Scores precomputed predictions and positive-class probabilities.
    ///
    /// Metrics undefined on the data (e.g. ROC AUC with a single labeled
    /// class) are reported as `NaN`.
    ///
    /// # Errors
    ///
    /// Returns an error when the three slices differ in length or are empty.
    pub fn score_predictions(
        &self,
        y_true: &[i32],
        y_pred: &[i32],
        y_prob: &[f32],
    ) -> Result<(ScoreData, f64)> {
        if y_true.len() != y_pred.len() || y_true.len() != y_prob.len() {
            return Err(EpimlError::dimension_mismatch("y_true", y_true.len(), y_pred.len()));
        }
        if y_true.is_empty() {
            return Err(EpimlError::empty_input("scoring zero samples"));
        }
        let pred: Vec<usize> = y_pred.iter().map(|&p| usize::from(p == 1)).collect();
        let pred_f: Vec<f32> = pred.iter().map(|&p| p as f32).collect();
        let binary = Average::default();

        let entries: Vec<(&str, ScoreValue)> = vec![
            ("labeled_acc", scalar("labeled_acc", labeled_metric(y_true, &pred, accuracy))),
            (
                "labeled_prec",
                scalar("labeled_prec", labeled_metric(y_true, &pred, |t, p| precision(t, p, binary))),
            ),
            (
                "labeled_recall",
                scalar("labeled_recall", labeled_metric(y_true, &pred, |t, p| recall(t, p, binary))),
            ),
            (
                "labeled_f1",
                scalar("labeled_f1", labeled_metric(y_true, &pred, |t, p| f1_score(t, p, binary))),
            ),
            (
                "labeled_roc_auc",
                scalar("labeled_roc_auc", labeled_metric(y_true, &pred_f, roc_auc_score)),
            ),
            (
                "labeled_avg_prec",
                scalar(
                    "labeled_avg_prec",
                    labeled_metric(y_true, &pred_f, average_precision_score),
                ),
            ),
            (
                "labeled_brier",
                scalar("labeled_brier", labeled_metric(y_true, y_prob, brier_score_loss)),
            ),
            (
                "labeled_brier_pos",
                scalar(
                    "labeled_brier_pos",
                    labeled_metric(y_true, y_prob, |t, p| brier_score_partial_loss(t, p, 1)),
                ),
            ),
            (
                "labeled_brier_neg",
                scalar(
                    "labeled_brier_neg",
                    labeled_metric(y_true, y_prob, |t, p| brier_score_partial_loss(t, p, 0)),
                ),
            ),
            (
                "confusion_matrix_lab",
                confusion(
                    "confusion_matrix_lab",
                    labeled_metric(y_true, &pred, |t, p| confusion_matrix(t, p, 2)),
                ),
            ),
            (
                "pr_one_unlabeled",
                scalar("pr_one_unlabeled", pr_one_unlabeled(y_true, y_pred)),
            ),
            (
                "assumed_brier",
                scalar("assumed_brier", assumed_metric(y_true, y_prob, brier_score_loss)),
            ),
            (
                "assumed_brier_neg",
                scalar(
                    "assumed_brier_neg",
                    assumed_metric(y_true, y_prob, |t, p| brier_score_partial_loss(t, p, 0)),
                ),
            ),
            (
                "assumed_f1",
                scalar("assumed_f1", assumed_metric(y_true, &pred, |t, p| f1_score(t, p, binary))),
            ),
            (
                "assumed_f1beta10",
                scalar(
                    "assumed_f1beta10",
                    assumed_metric(y_true, &pred, |t, p| fbeta_score(t, p, 10.0, binary)),
                ),
            ),
            (
                "confusion_matrix_un",
                confusion(
                    "confusion_matrix_un",
                    assumed_metric(y_true, &pred, |t, p| confusion_matrix(t, p, 2)),
                ),
            ),
            ("pu_score", scalar("pu_score", pu_score(y_true, y_pred))),
        ];

        let mut data: ScoreData = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let decision = data
            .get(&self.decision_score)
            .and_then(ScoreValue::as_scalar)
            .unwrap_or(f64::NAN);
        data.insert(SCORE_INDEX.to_string(), ScoreValue::Scalar(decision));
        Ok((data, decision))
    }
}
