//! Random forest trained on class-balanced bootstraps.

use crate::error::Result;
use crate::primitives::Matrix;
use crate::traits::{Classifier, ParamValue, Tunable};
use crate::tree::{ClassWeight, RandomForestClassifier, Sampling};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default minority/majority ratio of each tree's sample.
pub const DEFAULT_TARGET_IMBALANCE_RATIO: f32 = 1.0;

/// Random forest where every tree is fit on a bootstrap of a balanced subset.
///
/// The subset holds the whole minority class plus
/// `floor(n_minority / target_imbalance_ratio)` majority samples, so with
/// the default ratio of 1.0 each tree sees roughly equal class counts.
///
/// # Example
///
/// ```
/// use epiml::prelude::*;
///
/// let x = Matrix::from_vec(6, 1, vec![0.0, 0.1, 0.2, 0.3, 5.0, 5.1]).unwrap();
/// let y = vec![0, 0, 0, 0, 1, 1];
///
/// let mut rf = RandomForestSubsample::new(5).with_random_state(1);
/// rf.fit(&x, &y).unwrap();
/// assert_eq!(rf.predict(&x).unwrap()[5], 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestSubsample {
    forest: RandomForestClassifier,
}

impl RandomForestSubsample {
    /// Creates a forest of `n_estimators` balanced trees.
    #[must_use]
    pub fn new(n_estimators: usize) -> Self {
        Self {
            forest: RandomForestClassifier::new(n_estimators).with_sampling(
                Sampling::BalancedSubsample {
                    target_imbalance_ratio: DEFAULT_TARGET_IMBALANCE_RATIO,
                },
            ),
        }
    }

    /// Sets the minority/majority ratio, in (0.1, 1.0].
    #[must_use]
    pub fn with_target_imbalance_ratio(mut self, ratio: f32) -> Self {
        self.forest = self.forest.with_sampling(Sampling::BalancedSubsample {
            target_imbalance_ratio: ratio,
        });
        self
    }

    /// Sets the maximum depth of each tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.forest = self.forest.with_max_depth(max_depth);
        self
    }

    /// Sets the random state.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.forest = self.forest.with_random_state(seed);
        self
    }

    /// Sets class reweighting.
    #[must_use]
    pub fn with_class_weight(mut self, class_weight: Option<ClassWeight>) -> Self {
        self.forest = self.forest.with_class_weight(class_weight);
        self
    }

    /// Worker threads for fitting.
    #[must_use]
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.forest = self.forest.with_n_jobs(n_jobs);
        self
    }

    /// The underlying forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForestClassifier {
        &self.forest
    }

    /// Fits with optional sample weights.
    ///
    /// # Errors
    ///
    /// See [`RandomForestClassifier::fit_weighted`]; additionally fails when
    /// `bootstrap` was switched off.
    pub fn fit_weighted(
        &mut self,
        x: &Matrix<f32>,
        y: &[usize],
        sample_weight: Option<&[f32]>,
    ) -> Result<()> {
        self.forest.fit_weighted(x, y, sample_weight)
    }
}

impl Default for RandomForestSubsample {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Classifier for RandomForestSubsample {
    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        self.forest.fit(x, y)
    }

    fn predict_proba(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.forest.predict_proba(x)
    }

    fn n_classes(&self) -> usize {
        self.forest.n_classes()
    }

    fn set_random_state(&mut self, seed: u64) {
        self.forest.set_random_state(seed);
    }
}

impl Tunable for RandomForestSubsample {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        self.forest.set_param(name, value)
    }
}

impl fmt::Display for RandomForestSubsample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.forest.fmt_as("RandomForestSubsample", f)
    }
}
