//! Evaluation metrics.
//!
//! - [`classification`]: accuracy, precision, recall, F-scores, confusion
//!   matrices, ROC AUC, average precision and the Brier loss
//! - [`pu`]: metrics for positive-unlabeled data

pub mod classification;
pub mod pu;

pub use classification::{
    accuracy, average_precision_score, brier_score_loss, confusion_matrix, f1_score, fbeta_score,
    precision, recall, roc_auc_score, Average,
};
pub use pu::{pu_score, Scorer};
