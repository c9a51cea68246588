//! Core traits for classifiers and tunable estimators.
//!
//! These traits define the API contracts the ensembles and the model
//! selection utilities are written against.

use crate::error::{EpimlError, Result};
use crate::primitives::Matrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Supervised classifier over class indices `0..n_classes`.
///
/// Implemented by the trees, the forests and the repeated subsampler, so
/// ensembles can be stacked generically (`RepeatedRandomSubSampler<RandomForestClassifier>`).
///
/// # Examples
///
/// ```
/// use epiml::prelude::*;
///
/// let x = Matrix::from_vec(4, 1, vec![0.0, 1.0, 10.0, 11.0]).unwrap();
/// let y = vec![0, 0, 1, 1];
///
/// let mut tree = DecisionTreeClassifier::new();
/// tree.fit(&x, &y).unwrap();
/// assert_eq!(tree.predict(&x).unwrap(), y);
/// ```
pub trait Classifier {
    /// Fits the model to training data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails (dimension mismatch, invalid parameters, etc.).
    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()>;

    /// Class probabilities, shape `(n_samples, n_classes)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted or `x` has the wrong width.
    fn predict_proba(&self, x: &Matrix<f32>) -> Result<Matrix<f32>>;

    /// Number of classes seen during fit (0 before fit).
    fn n_classes(&self) -> usize;

    /// Reseeds the estimator. Ensembles call this on each clone they train.
    fn set_random_state(&mut self, seed: u64);

    /// Predicts class labels (argmax of `predict_proba`).
    ///
    /// # Errors
    ///
    /// Propagates errors from `predict_proba`.
    fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>> {
        Ok(self.predict_proba(x)?.argmax_rows())
    }

    /// Mean accuracy on `(x, y)`.
    ///
    /// # Errors
    ///
    /// Propagates errors from `predict`.
    fn score(&self, x: &Matrix<f32>, y: &[usize]) -> Result<f32> {
        let predictions = self.predict(x)?;
        if predictions.len() != y.len() {
            return Err(EpimlError::dimension_mismatch(
                "n_samples",
                predictions.len(),
                y.len(),
            ));
        }
        if y.is_empty() {
            return Err(EpimlError::empty_input("score"));
        }
        let correct = predictions.iter().zip(y).filter(|(p, t)| p == t).count();
        Ok(correct as f32 / y.len() as f32)
    }
}

/// Classifier trained on positive/negative/unlabeled labels (`1`, `0`, `-1`).
pub trait PuClassifier {
    /// Fits on labels in `{-1, 0, 1}`.
    ///
    /// # Errors
    ///
    /// Returns an error for labels outside `{-1, 0, 1}` or unusable data.
    fn fit_pu(&mut self, x: &Matrix<f32>, y: &[i32]) -> Result<()>;

    /// Predicts `0` or `1` per row.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted.
    fn predict_pu(&self, x: &Matrix<f32>) -> Result<Vec<i32>>;

    /// Probability of the positive class per row.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted.
    fn predict_positive_proba(&self, x: &Matrix<f32>) -> Result<Vec<f32>>;
}

/// A hyperparameter value as used by [`Tunable`] and the randomized search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// Unset / unlimited (e.g. `max_depth=None`)
    None,
    /// Boolean flag
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Named option (e.g. `'sqrt'`, `'balanced'`)
    Str(String),
}

impl ParamValue {
    /// Interprets the value as a non-negative integer.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a non-negative integer.
    pub fn as_usize(&self, param: &str) -> Result<usize> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Ok(*v as usize),
            other => Err(EpimlError::invalid_param(param, other, "non-negative integer")),
        }
    }

    /// Interprets the value as an optional non-negative integer.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is neither `None` nor a non-negative integer.
    pub fn as_opt_usize(&self, param: &str) -> Result<Option<usize>> {
        match self {
            ParamValue::None => Ok(None),
            other => other.as_usize(param).map(Some),
        }
    }

    /// Interprets the value as a float (integers are widened).
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not numeric.
    pub fn as_f64(&self, param: &str) -> Result<f64> {
        match self {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            other => Err(EpimlError::invalid_param(param, other, "number")),
        }
    }

    /// Interprets the value as a boolean.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a boolean.
    pub fn as_bool(&self, param: &str) -> Result<bool> {
        match self {
            ParamValue::Bool(v) => Ok(*v),
            other => Err(EpimlError::invalid_param(param, other, "boolean")),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::None => write!(f, "None"),
            ParamValue::Bool(true) => write!(f, "True"),
            ParamValue::Bool(false) => write!(f, "False"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Str(s) => write!(f, "'{s}'"),
        }
    }
}

/// Named hyperparameter assignment, ordered by name.
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Estimators whose hyperparameters can be set by name.
///
/// Nested estimators are addressed with the `base_estimator__` prefix, so
/// `base_estimator__base_estimator__n_estimators` reaches the forest inside
/// `PNUWrapper<RepeatedRandomSubSampler<RandomForestClassifier>>`.
pub trait Tunable {
    /// Sets a single hyperparameter.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown names or invalid values.
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()>;

    /// Sets every hyperparameter in `params`.
    ///
    /// # Errors
    ///
    /// Stops at the first failing assignment.
    fn set_params(&mut self, params: &ParamSet) -> Result<()> {
        for (name, value) in params {
            self.set_param(name, value)?;
        }
        Ok(())
    }
}

/// Prefix addressing a wrapped estimator's parameters.
pub const NESTED_PREFIX: &str = "base_estimator__";

/// Error for a parameter name an estimator does not know.
#[must_use]
pub fn unknown_param(estimator: &str, name: &str) -> EpimlError {
    EpimlError::InvalidHyperparameter {
        param: name.to_string(),
        value: String::from("<any>"),
        constraint: format!("a parameter of {estimator}"),
    }
}
