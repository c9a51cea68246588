//! Repeated balanced subsampling around any binary classifier.

use super::{route_nested, run_seeded};
use crate::error::{EpimlError, Result};
use crate::primitives::Matrix;
use crate::repr::{py_float, Repr};
use crate::traits::{unknown_param, Classifier, ParamValue, Tunable};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// How member estimators are combined at prediction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Voting {
    /// Mean positive probability, positive above 0.5
    Soft,
    /// Positive when more than half of the members vote positive
    Hard,
    /// Positive when the fraction of positive votes reaches `threshold`
    #[default]
    Thresh,
}

impl Voting {
    fn name(self) -> &'static str {
        match self {
            Voting::Soft => "soft",
            Voting::Hard => "hard",
            Voting::Thresh => "thresh",
        }
    }

    /// Parses `"soft"`, `"hard"` or `"thresh"`.
    ///
    /// # Errors
    ///
    /// Returns an error for any other name.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "soft" => Ok(Voting::Soft),
            "hard" => Ok(Voting::Hard),
            "thresh" => Ok(Voting::Thresh),
            other => Err(EpimlError::invalid_param(
                "voting",
                other,
                "'soft', 'hard' or 'thresh'",
            )),
        }
    }
}

/// Trains clones of a base estimator on balanced subsamples of a binary
/// problem and combines them by voting.
///
/// Every subsample holds all minority samples and a consecutive slice of a
/// shuffled majority permutation, so together the members see the whole
/// majority class (unless `max_samples` stops early).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatedRandomSubSampler<E> {
    base_estimator: E,
    estimators: Vec<E>,
    sample_ratio: f32,
    voting: Voting,
    threshold: f32,
    max_samples: Option<usize>,
    n_jobs: usize,
    random_state: Option<u64>,
    n_features: Option<usize>,
}

impl<E> RepeatedRandomSubSampler<E>
where
    E: Classifier + Clone + Send + Sync,
{
    /// Wraps `base_estimator` with default settings.
    #[must_use]
    pub fn new(base_estimator: E) -> Self {
        Self {
            base_estimator,
            estimators: Vec::new(),
            sample_ratio: 1.0,
            voting: Voting::Thresh,
            threshold: 0.5,
            max_samples: None,
            n_jobs: 1,
            random_state: None,
            n_features: None,
        }
    }

    /// Minority/majority ratio in each subsample, in (0, 1].
    #[must_use]
    pub fn with_sample_ratio(mut self, ratio: f32) -> Self {
        self.sample_ratio = ratio;
        self
    }

    /// Sets the voting rule.
    #[must_use]
    pub fn with_voting(mut self, voting: Voting) -> Self {
        self.voting = voting;
        self
    }

    /// Positive-vote fraction required by [`Voting::Thresh`].
    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Upper bound on the number of members.
    #[must_use]
    pub fn with_max_samples(mut self, max_samples: Option<usize>) -> Self {
        self.max_samples = max_samples;
        self
    }

    /// Worker threads; 0 uses all cores.
    #[must_use]
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    /// Sets the random state.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// The unfitted template estimator.
    #[must_use]
    pub fn base_estimator(&self) -> &E {
        &self.base_estimator
    }

    /// Mutable access to the template, e.g. to tune it directly.
    pub fn base_estimator_mut(&mut self) -> &mut E {
        &mut self.base_estimator
    }

    /// Fitted members.
    #[must_use]
    pub fn estimators(&self) -> &[E] {
        &self.estimators
    }

    /// Current voting rule.
    #[must_use]
    pub fn voting(&self) -> Voting {
        self.voting
    }

    fn validate(&self) -> Result<()> {
        if !(self.sample_ratio > 0.0 && self.sample_ratio <= 1.0) {
            return Err(EpimlError::invalid_param(
                "sample_ratio",
                self.sample_ratio,
                "0 < ratio <= 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(EpimlError::invalid_param(
                "threshold",
                self.threshold,
                "0 <= threshold <= 1",
            ));
        }
        if self.max_samples == Some(0) {
            return Err(EpimlError::invalid_param("max_samples", 0, ">= 1 or None"));
        }
        Ok(())
    }

    /// Majority slices, one per member.
    fn plan_subsamples(&self, minority: usize, majority: &[usize]) -> Vec<Vec<usize>> {
        let per_sample = ((minority as f32 / self.sample_ratio) as usize).clamp(1, majority.len());
        let mut k = majority.len().div_ceil(per_sample);
        if let Some(cap) = self.max_samples {
            k = k.min(cap);
        }
        (0..k)
            .map(|i| {
                (0..per_sample)
                    .map(|j| majority[(i * per_sample + j) % majority.len()])
                    .collect()
            })
            .collect()
    }

    /// Positive-class score per row: mean probability or vote fraction.
    fn positive_scores(&self, x: &Matrix<f32>) -> Result<Vec<f32>> {
        if self.estimators.is_empty() {
            return Err(EpimlError::not_fitted("RepeatedRandomSubSampler"));
        }
        if let Some(expected) = self.n_features {
            if x.n_cols() != expected {
                return Err(EpimlError::dimension_mismatch("n_features", expected, x.n_cols()));
            }
        }
        let n = x.n_rows();
        let mut scores = vec![0.0f32; n];
        for est in &self.estimators {
            match self.voting {
                Voting::Soft => {
                    let proba = est.predict_proba(x)?;
                    let positive = proba.n_cols() > 1;
                    for (i, s) in scores.iter_mut().enumerate() {
                        if positive {
                            *s += proba.get(i, 1);
                        }
                    }
                }
                Voting::Hard | Voting::Thresh => {
                    for (s, p) in scores.iter_mut().zip(est.predict(x)?) {
                        if p == 1 {
                            *s += 1.0;
                        }
                    }
                }
            }
        }
        let m = self.estimators.len() as f32;
        scores.iter_mut().for_each(|s| *s /= m);
        Ok(scores)
    }
}

impl<E> Classifier for RepeatedRandomSubSampler<E>
where
    E: Classifier + Clone + Send + Sync,
{
    /// Fits one member per balanced subsample.
    ///
    /// # Errors
    ///
    /// Fails on invalid parameters, labels other than 0/1, or data with a
    /// single class.
    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        self.validate()?;
        if x.n_rows() != y.len() {
            return Err(EpimlError::dimension_mismatch("n_samples", x.n_rows(), y.len()));
        }
        if let Some(&bad) = y.iter().find(|&&c| c > 1) {
            return Err(EpimlError::InvalidLabels {
                message: format!("RepeatedRandomSubSampler is binary, found class {bad}"),
            });
        }
        let positives: Vec<usize> = (0..y.len()).filter(|&i| y[i] == 1).collect();
        let negatives: Vec<usize> = (0..y.len()).filter(|&i| y[i] == 0).collect();
        if positives.is_empty() || negatives.is_empty() {
            return Err(EpimlError::InvalidLabels {
                message: "both classes must be present".to_string(),
            });
        }
        let (minority, mut majority) = if positives.len() <= negatives.len() {
            (positives, negatives)
        } else {
            (negatives, positives)
        };

        let mut rng = match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        majority.shuffle(&mut rng);
        let plans = self.plan_subsamples(minority.len(), &majority);
        let seeds: Vec<u64> = (0..plans.len()).map(|_| rng.gen()).collect();
        debug!(
            n_estimators = plans.len(),
            minority = minority.len(),
            majority = majority.len(),
            "repeated random subsampling"
        );

        let base = &self.base_estimator;
        let estimators = run_seeded(self.n_jobs, &seeds, |i, seed| {
            let mut rows = minority.clone();
            rows.extend_from_slice(&plans[i]);
            let sub_y: Vec<usize> = rows.iter().map(|&r| y[r]).collect();
            let mut est = base.clone();
            est.set_random_state(seed);
            est.fit(&x.select_rows(&rows), &sub_y)?;
            Ok(est)
        })?;

        self.estimators = estimators;
        self.n_features = Some(x.n_cols());
        Ok(())
    }

    /// Columns are `[1 - score, score]` where score is the mean positive
    /// probability (soft) or the positive vote fraction (hard, thresh).
    fn predict_proba(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let scores = self.positive_scores(x)?;
        let data = scores.iter().flat_map(|&s| [1.0 - s, s]).collect();
        Matrix::from_vec(scores.len(), 2, data)
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>> {
        let scores = self.positive_scores(x)?;
        Ok(scores
            .into_iter()
            .map(|s| {
                let positive = match self.voting {
                    Voting::Soft | Voting::Hard => s > 0.5,
                    Voting::Thresh => s >= self.threshold,
                };
                usize::from(positive)
            })
            .collect())
    }

    fn n_classes(&self) -> usize {
        if self.estimators.is_empty() {
            0
        } else {
            2
        }
    }

    fn set_random_state(&mut self, seed: u64) {
        self.random_state = Some(seed);
    }
}

impl<E: Tunable> Tunable for RepeatedRandomSubSampler<E> {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        if let Some(result) = route_nested(&mut self.base_estimator, name, value) {
            return result;
        }
        match name {
            "sample_ratio" => self.sample_ratio = value.as_f64(name)? as f32,
            "voting" => match value {
                ParamValue::Str(s) => self.voting = Voting::parse(s)?,
                other => {
                    return Err(EpimlError::invalid_param(
                        name,
                        other,
                        "'soft', 'hard' or 'thresh'",
                    ))
                }
            },
            "threshold" => self.threshold = value.as_f64(name)? as f32,
            "max_samples" => self.max_samples = value.as_opt_usize(name)?,
            "n_jobs" => self.n_jobs = value.as_usize(name)?,
            "random_state" => self.random_state = value.as_opt_usize(name)?.map(|v| v as u64),
            _ => return Err(unknown_param("RepeatedRandomSubSampler", name)),
        }
        Ok(())
    }
}

impl<E: fmt::Display> fmt::Display for RepeatedRandomSubSampler<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = Repr::new("RepeatedRandomSubSampler")
            .param("base_estimator", &self.base_estimator)
            .opt("max_samples", self.max_samples)
            .param("n_jobs", self.n_jobs)
            .opt("random_state", self.random_state)
            .param("sample_ratio", py_float(f64::from(self.sample_ratio)))
            .param("threshold", py_float(f64::from(self.threshold)))
            .text("voting", self.voting.name());
        write!(f, "{repr}")
    }
}

#[cfg(test)]
#[path = "repeated_tests.rs"]
mod tests;
