//! Positive / negative / unlabeled wrapper.

use super::route_nested;
use crate::error::{EpimlError, Result};
use crate::primitives::Matrix;
use crate::repr::{py_float, Repr};
use crate::traits::{unknown_param, Classifier, ParamValue, PuClassifier, Tunable};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Label of an unlabeled sample.
pub const UNLABELED: i32 = -1;

/// Turns a binary classifier into a PU learner.
///
/// A sample of the unlabeled rows joins training as negatives. With
/// `pu_iter > 0`, the most confident sampled rows are relabeled positive
/// after each fit and the base estimator is refit.
///
/// # Example
///
/// ```
/// use epiml::prelude::*;
///
/// let x = Matrix::from_vec(6, 1, vec![0.0, 0.1, 0.2, 5.0, 5.1, 5.2]).unwrap();
/// let y = vec![-1, -1, 0, 1, -1, 1];
///
/// let mut pnu = PNUWrapper::new(DecisionTreeClassifier::new()).with_num_unlabeled(1.0);
/// pnu.fit_pu(&x, &y).unwrap();
/// assert_eq!(pnu.predict_pu(&x).unwrap()[3], 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PNUWrapper<E> {
    base_estimator: E,
    num_unlabeled: f64,
    pu_iter: usize,
    threshold_set_pct: Option<f64>,
    random_state: Option<u64>,
    fitted: bool,
}

impl<E: Classifier> PNUWrapper<E> {
    /// Wraps `base_estimator`; no unlabeled rows are used by default.
    #[must_use]
    pub fn new(base_estimator: E) -> Self {
        Self {
            base_estimator,
            num_unlabeled: 0.0,
            pu_iter: 0,
            threshold_set_pct: None,
            random_state: None,
            fitted: false,
        }
    }

    /// Unlabeled rows used as negatives: a count when `>= 1`, a fraction
    /// of the unlabeled pool when in `(0, 1)`.
    #[must_use]
    pub fn with_num_unlabeled(mut self, num_unlabeled: f64) -> Self {
        self.num_unlabeled = num_unlabeled;
        self
    }

    /// Number of relabel-and-refit rounds.
    #[must_use]
    pub fn with_pu_iter(mut self, pu_iter: usize) -> Self {
        self.pu_iter = pu_iter;
        self
    }

    /// Fraction of sampled unlabeled rows relabeled positive each round.
    #[must_use]
    pub fn with_threshold_set_pct(mut self, pct: Option<f64>) -> Self {
        self.threshold_set_pct = pct;
        self
    }

    /// Sets the random state.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// The wrapped estimator (fitted after [`PuClassifier::fit_pu`]).
    #[must_use]
    pub fn base_estimator(&self) -> &E {
        &self.base_estimator
    }

    /// Mutable access to the wrapped estimator.
    pub fn base_estimator_mut(&mut self) -> &mut E {
        &mut self.base_estimator
    }

    /// Whether `fit_pu` has completed.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn validate(&self) -> Result<()> {
        if !(self.num_unlabeled >= 0.0 && self.num_unlabeled.is_finite()) {
            return Err(EpimlError::invalid_param(
                "num_unlabeled",
                self.num_unlabeled,
                ">= 0",
            ));
        }
        if self.pu_iter > 0 {
            match self.threshold_set_pct {
                Some(p) if p > 0.0 && p < 1.0 => {}
                other => {
                    return Err(EpimlError::invalid_param(
                        "threshold_set_pct",
                        other.map_or_else(|| "None".to_string(), |p| p.to_string()),
                        "a fraction in (0, 1) when pu_iter > 0",
                    ))
                }
            }
        }
        Ok(())
    }

    fn n_unlabeled_to_sample(&self, pool: usize) -> usize {
        if self.num_unlabeled >= 1.0 {
            (self.num_unlabeled as usize).min(pool)
        } else {
            (self.num_unlabeled * pool as f64) as usize
        }
    }

    fn check_fitted(&self) -> Result<()> {
        if self.fitted {
            Ok(())
        } else {
            Err(EpimlError::not_fitted("PNUWrapper"))
        }
    }
}

impl<E: Classifier> PuClassifier for PNUWrapper<E> {
    /// # Errors
    ///
    /// Fails on labels outside `{-1, 0, 1}`, when no positive is present,
    /// or when neither negatives nor sampled unlabeled rows remain.
    fn fit_pu(&mut self, x: &Matrix<f32>, y: &[i32]) -> Result<()> {
        self.validate()?;
        if x.n_rows() != y.len() {
            return Err(EpimlError::dimension_mismatch("n_samples", x.n_rows(), y.len()));
        }
        if let Some(&bad) = y.iter().find(|&&v| !(-1..=1).contains(&v)) {
            return Err(EpimlError::InvalidLabels {
                message: format!("expected -1, 0 or 1, found {bad}"),
            });
        }
        if !y.contains(&1) {
            return Err(EpimlError::InvalidLabels {
                message: "no positive samples".to_string(),
            });
        }

        let unlabeled: Vec<usize> = (0..y.len()).filter(|&i| y[i] == UNLABELED).collect();
        let mut rng = match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let n_take = self.n_unlabeled_to_sample(unlabeled.len());
        let sampled: Vec<usize> = sample(&mut rng, unlabeled.len(), n_take)
            .into_iter()
            .map(|j| unlabeled[j])
            .collect();

        let mut rows: Vec<usize> = (0..y.len()).filter(|&i| y[i] != UNLABELED).collect();
        let n_labeled = rows.len();
        rows.extend_from_slice(&sampled);
        let mut labels: Vec<usize> = rows.iter().map(|&i| usize::from(y[i] == 1)).collect();
        if !labels.contains(&0) {
            return Err(EpimlError::InvalidLabels {
                message: "only one class after sampling unlabeled rows; add negatives or raise num_unlabeled"
                    .to_string(),
            });
        }
        debug!(
            labeled = n_labeled,
            unlabeled = unlabeled.len(),
            sampled = sampled.len(),
            "PNU training set"
        );

        let x_train = x.select_rows(&rows);
        self.base_estimator.set_random_state(rng.gen());
        self.base_estimator.fit(&x_train, &labels)?;

        if self.pu_iter > 0 && !sampled.is_empty() {
            let pct = self.threshold_set_pct.unwrap_or(0.0);
            let n_relabel = (pct * sampled.len() as f64) as usize;
            let x_sampled = x.select_rows(&sampled);
            for iteration in 0..self.pu_iter {
                let proba = self.base_estimator.predict_proba(&x_sampled)?;
                let mut order: Vec<usize> = (0..sampled.len()).collect();
                let score = |i: usize| {
                    if proba.n_cols() > 1 {
                        proba.get(i, 1)
                    } else {
                        0.0
                    }
                };
                order.sort_by(|&a, &b| score(b).total_cmp(&score(a)));
                for (rank, &j) in order.iter().enumerate() {
                    labels[n_labeled + j] = usize::from(rank < n_relabel);
                }
                debug!(iteration, relabeled = n_relabel, "PU relabel round");
                self.base_estimator.fit(&x_train, &labels)?;
            }
        }

        self.fitted = true;
        Ok(())
    }

    fn predict_pu(&self, x: &Matrix<f32>) -> Result<Vec<i32>> {
        self.check_fitted()?;
        Ok(self
            .base_estimator
            .predict(x)?
            .into_iter()
            .map(|c| i32::from(c == 1))
            .collect())
    }

    fn predict_positive_proba(&self, x: &Matrix<f32>) -> Result<Vec<f32>> {
        self.check_fitted()?;
        let proba = self.base_estimator.predict_proba(x)?;
        if proba.n_cols() < 2 {
            return Ok(vec![0.0; x.n_rows()]);
        }
        Ok((0..proba.n_rows()).map(|i| proba.get(i, 1)).collect())
    }
}

impl<E: Tunable> Tunable for PNUWrapper<E> {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        if let Some(result) = route_nested(&mut self.base_estimator, name, value) {
            return result;
        }
        match name {
            "num_unlabeled" => self.num_unlabeled = value.as_f64(name)?,
            "pu_iter" => self.pu_iter = value.as_usize(name)?,
            "threshold_set_pct" => {
                self.threshold_set_pct = match value {
                    ParamValue::None => None,
                    other => Some(other.as_f64(name)?),
                }
            }
            "random_state" => self.random_state = value.as_opt_usize(name)?.map(|v| v as u64),
            _ => return Err(unknown_param("PNUWrapper", name)),
        }
        Ok(())
    }
}

impl<E: fmt::Display> fmt::Display for PNUWrapper<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = Repr::new("PNUWrapper")
            .param("base_estimator", &self.base_estimator)
            .param("num_unlabeled", py_float(self.num_unlabeled))
            .param("pu_iter", self.pu_iter)
            .opt("random_state", self.random_state)
            .opt("threshold_set_pct", self.threshold_set_pct.map(py_float));
        write!(f, "{repr}")
    }
}

#[cfg(test)]
#[path = "pnu_tests.rs"]
mod tests;
