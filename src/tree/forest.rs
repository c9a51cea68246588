//! Random forest classifier.
//!
//! Each tree is trained on a resampled view of the data expressed as
//! sample weights. Two resampling strategies are available:
//!
//! - [`Sampling::Bootstrap`]: `n_samples` draws with replacement.
//! - [`Sampling::BalancedSubsample`]: all minority samples plus a random
//!   majority subset sized by `target_imbalance_ratio`, then a bootstrap of
//!   that pool.
//!
//! Per-tree seeds are drawn from the forest RNG before any tree is fit, so
//! results do not depend on `n_jobs`.

use super::{Criterion, DecisionTreeClassifier, MaxFeatures};
use crate::ensemble::run_seeded;
use crate::error::{EpimlError, Result};
use crate::primitives::Matrix;
use crate::repr::{py_float, Repr};
use crate::traits::{unknown_param, Classifier, ParamValue, Tunable};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// How each tree's training sample is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Sampling {
    /// Classic bootstrap of the full data set
    #[default]
    Bootstrap,
    /// Bootstrap of a class-balanced subset
    BalancedSubsample {
        /// Target ratio of minority to majority samples, in (0.1, 1.0]
        target_imbalance_ratio: f32,
    },
}

/// Class reweighting applied on top of the sampling weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassWeight {
    /// `n_samples / (n_classes * count(class))` over the full training set
    Balanced,
    /// Same formula, recomputed on each tree's drawn sample
    BalancedSubsample,
}

impl ClassWeight {
    fn name(self) -> &'static str {
        match self {
            ClassWeight::Balanced => "balanced",
            ClassWeight::BalancedSubsample => "balanced_subsample",
        }
    }

    /// Parses `None`, `'balanced'` or `'balanced_subsample'`.
    ///
    /// # Errors
    ///
    /// Returns an error for other values.
    pub fn from_param(value: &ParamValue) -> Result<Option<Self>> {
        match value {
            ParamValue::None => Ok(None),
            ParamValue::Str(s) if s == "balanced" => Ok(Some(ClassWeight::Balanced)),
            ParamValue::Str(s) if s == "balanced_subsample" => {
                Ok(Some(ClassWeight::BalancedSubsample))
            }
            other => Err(EpimlError::invalid_param(
                "class_weight",
                other,
                "None, 'balanced' or 'balanced_subsample'",
            )),
        }
    }
}

/// Random Forest classifier - an ensemble of decision trees.
///
/// # Example
///
/// ```
/// use epiml::prelude::*;
///
/// let x = Matrix::from_vec(6, 1, vec![0.0, 0.5, 1.0, 9.0, 9.5, 10.0]).unwrap();
/// let y = vec![0, 0, 0, 1, 1, 1];
///
/// let mut rf = RandomForestClassifier::new(5).with_random_state(7);
/// rf.fit(&x, &y).unwrap();
/// assert_eq!(rf.n_trees(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTreeClassifier>,
    n_estimators: usize,
    criterion: Criterion,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    max_features: MaxFeatures,
    bootstrap: bool,
    oob_score: bool,
    n_jobs: usize,
    random_state: Option<u64>,
    warm_start: bool,
    class_weight: Option<ClassWeight>,
    sampling: Sampling,
    n_classes: usize,
    n_features: Option<usize>,
    oob_score_value: Option<f32>,
}

impl RandomForestClassifier {
    /// Creates a new Random Forest classifier.
    ///
    /// # Arguments
    ///
    /// * `n_estimators` - Number of trees in the forest
    #[must_use]
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            criterion: Criterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            oob_score: false,
            n_jobs: 1,
            random_state: None,
            warm_start: false,
            class_weight: None,
            sampling: Sampling::Bootstrap,
            n_classes: 0,
            n_features: None,
            oob_score_value: None,
        }
    }

    /// Sets the maximum depth for each tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Sets the random state for reproducibility.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// Sets the split criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Minimum samples to split a node.
    #[must_use]
    pub fn with_min_samples_split(mut self, n: usize) -> Self {
        self.min_samples_split = n;
        self
    }

    /// Minimum samples per leaf.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = n;
        self
    }

    /// Features considered per split.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Enables or disables resampling.
    #[must_use]
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Computes an out-of-bag accuracy during fit.
    #[must_use]
    pub fn with_oob_score(mut self, oob_score: bool) -> Self {
        self.oob_score = oob_score;
        self
    }

    /// Worker threads for fitting; 0 uses all available cores.
    #[must_use]
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    /// Keeps existing trees on refit and only adds new ones.
    #[must_use]
    pub fn with_warm_start(mut self, warm_start: bool) -> Self {
        self.warm_start = warm_start;
        self
    }

    /// Sets class reweighting.
    #[must_use]
    pub fn with_class_weight(mut self, class_weight: Option<ClassWeight>) -> Self {
        self.class_weight = class_weight;
        self
    }

    /// Sets the per-tree sampling strategy.
    #[must_use]
    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    /// Changes the target number of trees (used with warm start).
    pub fn set_n_estimators(&mut self, n_estimators: usize) {
        self.n_estimators = n_estimators;
    }

    /// Number of fitted trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// The fitted trees.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTreeClassifier] {
        &self.trees
    }

    /// Whether resampling is enabled.
    #[must_use]
    pub fn bootstrap(&self) -> bool {
        self.bootstrap
    }

    /// Current sampling strategy.
    #[must_use]
    pub fn sampling(&self) -> Sampling {
        self.sampling
    }

    /// Out-of-bag accuracy, when `oob_score` was enabled.
    #[must_use]
    pub fn oob_score(&self) -> Option<f32> {
        self.oob_score_value
    }

    /// Mean of the per-tree normalized importances.
    #[must_use]
    pub fn feature_importances(&self) -> Option<Vec<f32>> {
        let n_features = self.n_features?;
        if self.trees.is_empty() {
            return None;
        }
        let mut total = vec![0.0f32; n_features];
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (t, v) in total.iter_mut().zip(imp) {
                    *t += v;
                }
            }
        }
        let sum: f32 = total.iter().sum();
        if sum > 0.0 {
            total.iter_mut().for_each(|v| *v /= sum);
        }
        Some(total)
    }

    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(EpimlError::invalid_param("n_estimators", 0, ">= 1"));
        }
        if let Sampling::BalancedSubsample {
            target_imbalance_ratio,
        } = self.sampling
        {
            if !self.bootstrap {
                return Err(EpimlError::invalid_param(
                    "bootstrap",
                    "False",
                    "True when sampling is a balanced subsample",
                ));
            }
            if !(target_imbalance_ratio > 0.1 && target_imbalance_ratio <= 1.0) {
                return Err(EpimlError::invalid_param(
                    "target_imbalance_ratio",
                    target_imbalance_ratio,
                    "0.1 < ratio <= 1.0",
                ));
            }
        }
        if self.oob_score && !self.bootstrap {
            return Err(EpimlError::invalid_param(
                "oob_score",
                "True",
                "bootstrap=True for out-of-bag estimation",
            ));
        }
        Ok(())
    }

    fn tree_template(&self) -> DecisionTreeClassifier {
        let mut tree = DecisionTreeClassifier::new()
            .with_criterion(self.criterion)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_max_features(self.max_features);
        if let Some(depth) = self.max_depth {
            tree = tree.with_max_depth(depth);
        }
        tree
    }

    /// Draws the sample for one tree and returns (weights, drawn indices).
    fn tree_sample(
        &self,
        y: &[usize],
        base_weight: Option<&[f32]>,
        seed: u64,
    ) -> Result<(Vec<f32>, Option<Vec<usize>>)> {
        let n_samples = y.len();
        let mut weights = base_weight.map_or_else(|| vec![1.0f32; n_samples], <[f32]>::to_vec);
        if !self.bootstrap {
            return Ok((weights, None));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let indices = match self.sampling {
            Sampling::Bootstrap => bootstrap_indices(n_samples, &mut rng),
            Sampling::BalancedSubsample {
                target_imbalance_ratio,
            } => balanced_subsample_indices(y, target_imbalance_ratio, &mut rng)?,
        };

        let mut counts = vec![0.0f32; n_samples];
        for &i in &indices {
            counts[i] += 1.0;
        }
        for (w, c) in weights.iter_mut().zip(&counts) {
            *w *= c;
        }
        if self.class_weight == Some(ClassWeight::BalancedSubsample) {
            let drawn: Vec<usize> = indices.iter().map(|&i| y[i]).collect();
            let per_class = balanced_class_weights(&drawn, self.n_classes);
            for (i, w) in weights.iter_mut().enumerate() {
                *w *= per_class[y[i]];
            }
        }
        Ok((weights, Some(indices)))
    }

    fn compute_oob_score(
        &self,
        x: &Matrix<f32>,
        y: &[usize],
        drawn: &[Option<Vec<usize>>],
    ) -> Result<f32> {
        let n_samples = y.len();
        let mut votes = vec![0.0f32; n_samples * self.n_classes];
        let mut seen = vec![false; n_samples];

        for (tree, indices) in self.trees.iter().zip(drawn) {
            let Some(indices) = indices else { continue };
            let mut in_bag = vec![false; n_samples];
            for &i in indices {
                in_bag[i] = true;
            }
            let oob: Vec<usize> = (0..n_samples).filter(|&i| !in_bag[i]).collect();
            if oob.is_empty() {
                continue;
            }
            let proba = tree.predict_proba(&x.select_rows(&oob))?;
            for (row, &i) in oob.iter().enumerate() {
                seen[i] = true;
                for c in 0..self.n_classes {
                    votes[i * self.n_classes + c] += proba.get(row, c);
                }
            }
        }

        let skipped = seen.iter().filter(|s| !**s).count();
        if skipped > 0 {
            warn!(
                skipped,
                "some inputs do not have OOB scores; too few trees were used to compute a reliable OOB estimate"
            );
        }
        let scored = n_samples - skipped;
        if scored == 0 {
            return Ok(0.0);
        }
        let correct = (0..n_samples)
            .filter(|&i| seen[i])
            .filter(|&i| {
                let row = &votes[i * self.n_classes..(i + 1) * self.n_classes];
                let mut best = 0;
                for (c, &v) in row.iter().enumerate() {
                    if v > row[best] {
                        best = c;
                    }
                }
                best == y[i]
            })
            .count();
        Ok(correct as f32 / scored as f32)
    }

    /// Fits with optional per-sample weights.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid parameters, mismatched shapes or a warm
    /// start that would shrink the forest.
    pub fn fit_weighted(
        &mut self,
        x: &Matrix<f32>,
        y: &[usize],
        sample_weight: Option<&[f32]>,
    ) -> Result<()> {
        self.validate()?;
        let (n_samples, n_features) = x.shape();
        if n_samples != y.len() {
            return Err(EpimlError::dimension_mismatch("n_samples", n_samples, y.len()));
        }
        if n_samples == 0 {
            return Err(EpimlError::empty_input("Cannot fit with zero samples"));
        }
        if let Some(w) = sample_weight {
            if w.len() != n_samples {
                return Err(EpimlError::dimension_mismatch("sample_weight", n_samples, w.len()));
            }
        }

        let seen_classes = y.iter().max().map_or(0, |&m| m + 1);
        if !self.warm_start || self.trees.is_empty() {
            self.trees.clear();
            self.n_classes = seen_classes;
        } else if self.n_features != Some(n_features) {
            return Err(EpimlError::dimension_mismatch(
                "n_features",
                self.n_features.unwrap_or(0),
                n_features,
            ));
        } else if seen_classes > self.n_classes {
            return Err(EpimlError::InvalidLabels {
                message: format!(
                    "class {} was not seen by the first warm-start fit ({} classes)",
                    seen_classes - 1,
                    self.n_classes
                ),
            });
        }
        self.n_features = Some(n_features);

        let existing = self.trees.len();
        if self.n_estimators < existing {
            return Err(EpimlError::invalid_param(
                "n_estimators",
                self.n_estimators,
                &format!("larger or equal to len(estimators_)={existing} when warm_start is set"),
            ));
        }
        if self.n_estimators == existing {
            warn!("warm-start fitting without increasing n_estimators does not fit new trees");
            return Ok(());
        }

        let base_weight: Option<Vec<f32>> = match self.class_weight {
            Some(ClassWeight::Balanced) => {
                let per_class = balanced_class_weights(y, self.n_classes);
                Some(
                    (0..n_samples)
                        .map(|i| per_class[y[i]] * sample_weight.map_or(1.0, |w| w[i]))
                        .collect(),
                )
            }
            _ => sample_weight.map(<[f32]>::to_vec),
        };

        // Seeds for trees that already exist are drawn and discarded so a warm
        // start reproduces the same forest as a single fit.
        let mut rng = match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let seeds: Vec<u64> = (0..self.n_estimators).map(|_| rng.gen()).collect();
        let new_seeds = &seeds[existing..];
        let n_new = new_seeds.len();
        let n_classes = self.n_classes;
        let template = self.tree_template();

        let fitted: Vec<(DecisionTreeClassifier, Option<Vec<usize>>)> =
            run_seeded(self.n_jobs, new_seeds, |i, seed| {
                debug!(tree = existing + i + 1, total = existing + n_new, "building tree");
                let (weights, drawn) = self.tree_sample(y, base_weight.as_deref(), seed)?;
                let mut tree = template.clone().with_random_state(seed);
                tree.fit_with_classes(x, y, Some(&weights), n_classes)?;
                Ok((tree, drawn))
            })?;

        let (trees, drawn): (Vec<_>, Vec<_>) = fitted.into_iter().unzip();
        self.trees.extend(trees);

        if self.oob_score {
            let mut all_drawn = vec![None; existing];
            all_drawn.extend(drawn);
            // Trees from an earlier warm-start round have no recorded draw and are skipped.
            self.oob_score_value = Some(self.compute_oob_score(x, y, &all_drawn)?);
        }
        Ok(())
    }

    fn repr_params(&self, name: &'static str) -> Repr {
        let class_weight = self.class_weight.map(|c| format!("'{}'", c.name()));
        let mut repr = Repr::new(name)
            .flag("bootstrap", self.bootstrap)
            .opt("class_weight", class_weight)
            .text("criterion", self.criterion.name())
            .opt("max_depth", self.max_depth)
            .param("max_features", self.max_features)
            .param("min_samples_leaf", self.min_samples_leaf)
            .param("min_samples_split", self.min_samples_split)
            .param("n_estimators", self.n_estimators)
            .param("n_jobs", self.n_jobs)
            .flag("oob_score", self.oob_score)
            .opt("random_state", self.random_state)
            .flag("warm_start", self.warm_start);
        if let Sampling::BalancedSubsample {
            target_imbalance_ratio,
        } = self.sampling
        {
            repr = repr.param(
                "target_imbalance_ratio",
                py_float(f64::from(target_imbalance_ratio)),
            );
        }
        repr
    }

    pub(crate) fn fmt_as(&self, name: &'static str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repr_params(name))
    }
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Classifier for RandomForestClassifier {
    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        self.fit_weighted(x, y, None)
    }

    /// Averages the per-tree class probabilities.
    fn predict_proba(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        if self.trees.is_empty() {
            return Err(EpimlError::not_fitted("RandomForestClassifier"));
        }
        let n_samples = x.n_rows();
        let mut sum = vec![0.0f32; n_samples * self.n_classes];
        for tree in &self.trees {
            let proba = tree.predict_proba(x)?;
            for (s, p) in sum.iter_mut().zip(proba.as_slice()) {
                *s += p;
            }
        }
        let n_trees = self.trees.len() as f32;
        sum.iter_mut().for_each(|v| *v /= n_trees);
        Matrix::from_vec(n_samples, self.n_classes, sum)
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn set_random_state(&mut self, seed: u64) {
        self.random_state = Some(seed);
    }
}

impl Tunable for RandomForestClassifier {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "n_estimators" => self.n_estimators = value.as_usize(name)?,
            "criterion" => match value {
                ParamValue::Str(s) => self.criterion = Criterion::parse(s)?,
                other => return Err(EpimlError::invalid_param(name, other, "'gini' or 'entropy'")),
            },
            "max_depth" => self.max_depth = value.as_opt_usize(name)?,
            "min_samples_split" => self.min_samples_split = value.as_usize(name)?,
            "min_samples_leaf" => self.min_samples_leaf = value.as_usize(name)?,
            "max_features" => self.max_features = MaxFeatures::from_param(value)?,
            "bootstrap" => self.bootstrap = value.as_bool(name)?,
            "oob_score" => self.oob_score = value.as_bool(name)?,
            "n_jobs" => self.n_jobs = value.as_usize(name)?,
            "random_state" => self.random_state = value.as_opt_usize(name)?.map(|v| v as u64),
            "warm_start" => self.warm_start = value.as_bool(name)?,
            "class_weight" => self.class_weight = ClassWeight::from_param(value)?,
            "target_imbalance_ratio" => {
                let ratio = value.as_f64(name)? as f32;
                self.sampling = Sampling::BalancedSubsample {
                    target_imbalance_ratio: ratio,
                };
            }
            _ => return Err(unknown_param("RandomForestClassifier", name)),
        }
        Ok(())
    }
}

impl fmt::Display for RandomForestClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_as("RandomForestClassifier", f)
    }
}

/// `n_samples` uniform draws with replacement.
pub(crate) fn bootstrap_indices(n_samples: usize, rng: &mut StdRng) -> Vec<usize> {
    let dist = Uniform::from(0..n_samples);
    (0..n_samples).map(|_| dist.sample(rng)).collect()
}

/// Sample indices grouped by class, for every class that occurs in `y`.
pub(crate) fn class_indices(y: &[usize]) -> Vec<Vec<usize>> {
    let n_classes = y.iter().max().map_or(0, |&m| m + 1);
    let mut groups = vec![Vec::new(); n_classes];
    for (i, &c) in y.iter().enumerate() {
        groups[c].push(i);
    }
    groups.retain(|g| !g.is_empty());
    groups
}

/// Draws one tree's sample from a class-balanced pool.
///
/// The pool is every minority sample plus `floor(n_minority / ratio)`
/// majority samples drawn without replacement; the returned indices are
/// `len(pool)` draws with replacement from the pool.
///
/// # Errors
///
/// Returns an error when `y` holds fewer than two classes.
pub(crate) fn balanced_subsample_indices(
    y: &[usize],
    target_imbalance_ratio: f32,
    rng: &mut StdRng,
) -> Result<Vec<usize>> {
    let groups = class_indices(y);
    if groups.len() < 2 {
        return Err(EpimlError::InvalidLabels {
            message: "balanced subsampling needs at least two classes".to_string(),
        });
    }
    let lens: Vec<usize> = groups.iter().map(Vec::len).collect();
    // First occurrence wins ties; the majority is never the minority class.
    let minority = (0..lens.len()).fold(0, |best, i| if lens[i] < lens[best] { i } else { best });
    let majority = (0..lens.len())
        .filter(|&i| i != minority)
        .fold(None, |best: Option<usize>, i| match best {
            Some(b) if lens[b] >= lens[i] => Some(b),
            _ => Some(i),
        })
        .unwrap_or(minority);

    let min_samples = lens[minority];
    let maj_samples =
        ((min_samples as f32 / target_imbalance_ratio) as usize).min(lens[majority]);
    let n_draw = min_samples + maj_samples;
    debug!(
        n = y.len(),
        target_imbalance_ratio,
        minorities = min_samples,
        majorities = maj_samples,
        n_samples = n_draw,
        "balanced subsample"
    );

    let mut pool: Vec<usize> = groups[minority].clone();
    pool.extend(
        sample(rng, lens[majority], maj_samples)
            .into_iter()
            .map(|j| groups[majority][j]),
    );

    let dist = Uniform::from(0..pool.len());
    Ok((0..n_draw).map(|_| pool[dist.sample(rng)]).collect())
}

/// `n / (n_present_classes * count(class))` per class; absent classes get 0.
pub(crate) fn balanced_class_weights(y: &[usize], n_classes: usize) -> Vec<f32> {
    let mut counts = vec![0usize; n_classes];
    for &c in y {
        if c < n_classes {
            counts[c] += 1;
        }
    }
    let present = counts.iter().filter(|&&c| c > 0).count().max(1);
    counts
        .iter()
        .map(|&c| {
            if c == 0 {
                0.0
            } else {
                y.len() as f32 / (present * c) as f32
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "forest_tests.rs"]
mod tests;
