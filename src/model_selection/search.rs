//! Randomized hyperparameter search and nested cross-validation.

use super::{rng_for, take_rows, StratifiedKFold};
use crate::ensemble::par_map;
use crate::error::{EpimlError, Result};
use crate::primitives::Matrix;
use crate::scoring::{FrankenScorer, ScoreData, ScoreValue, SCORE_INDEX};
use crate::traits::{ParamSet, ParamValue, PuClassifier, Tunable};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Distribution a hyperparameter is drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamDistribution {
    /// Integers in `[low, high)`
    IntRange(i64, i64),
    /// One of the listed values, uniformly
    Choice(Vec<ParamValue>),
    /// Floats in `[low, high)`
    Uniform(f64, f64),
}

impl ParamDistribution {
    fn validate(&self, name: &str) -> Result<()> {
        let ok = match self {
            ParamDistribution::IntRange(low, high) => low < high,
            ParamDistribution::Choice(values) => !values.is_empty(),
            ParamDistribution::Uniform(low, high) => {
                low < high && low.is_finite() && high.is_finite()
            }
        };
        if ok {
            Ok(())
        } else {
            Err(EpimlError::invalid_param(
                name,
                format!("{self:?}"),
                "a non-empty distribution",
            ))
        }
    }

    fn sample(&self, rng: &mut StdRng) -> ParamValue {
        match self {
            ParamDistribution::IntRange(low, high) => ParamValue::Int(rng.gen_range(*low..*high)),
            ParamDistribution::Choice(values) => values[rng.gen_range(0..values.len())].clone(),
            ParamDistribution::Uniform(low, high) => ParamValue::Float(rng.gen_range(*low..*high)),
        }
    }
}

/// Score data of one candidate on one split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitScores {
    /// Scores on the held-out fold
    pub test: ScoreData,
    /// Scores on the training folds
    pub train: ScoreData,
}

/// Everything recorded for one parameter candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    /// The sampled parameters
    pub params: ParamSet,
    /// Per-split scores, in fold order
    pub splits: Vec<SplitScores>,
    /// Mean decision score over test folds
    pub mean_test_score: f64,
    /// Population standard deviation of the test decision scores
    pub std_test_score: f64,
    /// 1 for the best candidate; ties share a rank
    pub rank: usize,
}

/// Results of a randomized search, one entry per candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    candidates: Vec<CandidateResult>,
}

impl SearchResults {
    /// Wraps candidate results.
    #[must_use]
    pub fn new(candidates: Vec<CandidateResult>) -> Self {
        Self { candidates }
    }

    /// All candidates, in sampling order.
    #[must_use]
    pub fn candidates(&self) -> &[CandidateResult] {
        &self.candidates
    }

    /// Index of the first candidate ranked 1.
    #[must_use]
    pub fn best_index(&self) -> Option<usize> {
        self.candidates.iter().position(|c| c.rank == 1)
    }

    /// Number of cross-validation splits.
    #[must_use]
    pub fn n_splits(&self) -> usize {
        self.candidates.first().map_or(0, |c| c.splits.len())
    }
}

fn decision(data: &ScoreData) -> f64 {
    data.get(SCORE_INDEX)
        .and_then(ScoreValue::as_scalar)
        .unwrap_or(f64::NAN)
}

/// Ranks by descending mean score; NaN ranks last, ties share the lower rank.
fn rank_candidates(means: &[f64]) -> Vec<usize> {
    let key = |v: f64| if v.is_nan() { f64::NEG_INFINITY } else { v };
    means
        .iter()
        .map(|&m| 1 + means.iter().filter(|&&o| key(o) > key(m)).count())
        .collect()
}

/// Randomized search over hyperparameters of a PU classifier.
///
/// Each of `n_iter` candidates is drawn from the distributions (in name
/// order), scored with a [`FrankenScorer`] on stratified folds and ranked
/// by its mean test decision score. With `refit`, the best candidate is
/// refit on all data and the search itself predicts through it.
///
/// # Example
///
/// ```
/// use epiml::model_selection::{ParamDistribution, RandomizedSearchCV};
/// use epiml::prelude::*;
///
/// let x = Matrix::from_vec(12, 1, vec![
///     0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 5.0, 5.1, 5.2, 5.3, 5.4, 5.5,
/// ]).unwrap();
/// let y = vec![0, 0, 0, -1, -1, -1, 1, 1, 1, 1, 1, 1];
///
/// let mut search = RandomizedSearchCV::new(PNUWrapper::new(DecisionTreeClassifier::new()))
///     .with_param("num_unlabeled", ParamDistribution::Uniform(0.0, 1.0))
///     .with_n_iter(3)
///     .with_random_state(0);
/// search.fit(&x, &y).unwrap();
/// assert_eq!(search.results().unwrap().candidates().len(), 3);
/// assert!(search.best_estimator().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct RandomizedSearchCV<E> {
    estimator: E,
    param_distributions: BTreeMap<String, ParamDistribution>,
    n_iter: usize,
    cv: usize,
    scorer: FrankenScorer,
    refit: bool,
    random_state: Option<u64>,
    n_jobs: usize,
    best_estimator: Option<E>,
    results: Option<SearchResults>,
}

impl<E> RandomizedSearchCV<E>
where
    E: PuClassifier + Tunable + Clone + Send + Sync,
{
    /// Search around `estimator` with 10 candidates and 3 folds.
    #[must_use]
    pub fn new(estimator: E) -> Self {
        Self {
            estimator,
            param_distributions: BTreeMap::new(),
            n_iter: 10,
            cv: 3,
            scorer: FrankenScorer::default(),
            refit: true,
            random_state: None,
            n_jobs: 1,
            best_estimator: None,
            results: None,
        }
    }

    /// Adds a parameter to search over.
    #[must_use]
    pub fn with_param(mut self, name: &str, distribution: ParamDistribution) -> Self {
        self.param_distributions
            .insert(name.to_string(), distribution);
        self
    }

    /// Number of candidates.
    #[must_use]
    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    /// Number of stratified folds.
    #[must_use]
    pub fn with_cv(mut self, cv: usize) -> Self {
        self.cv = cv;
        self
    }

    /// Scorer whose decision score ranks candidates.
    #[must_use]
    pub fn with_scorer(mut self, scorer: FrankenScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Whether to refit the best candidate on all data.
    #[must_use]
    pub fn with_refit(mut self, refit: bool) -> Self {
        self.refit = refit;
        self
    }

    /// Seeds candidate sampling and fold shuffling.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Worker threads over (candidate, fold) fits; 0 uses all cores.
    #[must_use]
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    /// The scorer in use.
    #[must_use]
    pub fn scorer(&self) -> &FrankenScorer {
        &self.scorer
    }

    /// The refit best estimator.
    #[must_use]
    pub fn best_estimator(&self) -> Option<&E> {
        self.best_estimator.as_ref()
    }

    /// Parameters of the best candidate.
    #[must_use]
    pub fn best_params(&self) -> Option<&ParamSet> {
        let results = self.results.as_ref()?;
        Some(&results.candidates[results.best_index()?].params)
    }

    /// Mean test decision score of the best candidate.
    #[must_use]
    pub fn best_score(&self) -> Option<f64> {
        let results = self.results.as_ref()?;
        Some(results.candidates[results.best_index()?].mean_test_score)
    }

    /// Full per-candidate results.
    #[must_use]
    pub fn results(&self) -> Option<&SearchResults> {
        self.results.as_ref()
    }

    fn sample_candidates(&self, rng: &mut StdRng) -> Result<Vec<ParamSet>> {
        for (name, dist) in &self.param_distributions {
            dist.validate(name)?;
        }
        Ok((0..self.n_iter)
            .map(|_| {
                self.param_distributions
                    .iter()
                    .map(|(name, dist)| (name.clone(), dist.sample(rng)))
                    .collect()
            })
            .collect())
    }

    /// Runs the search on `(x, y)` with labels in `{-1, 0, 1}`.
    ///
    /// # Errors
    ///
    /// Fails on invalid settings or distributions, when a candidate's
    /// parameters are rejected, or when any fit fails.
    pub fn fit(&mut self, x: &Matrix<f32>, y: &[i32]) -> Result<()> {
        if self.n_iter == 0 {
            return Err(EpimlError::invalid_param("n_iter", self.n_iter, ">= 1"));
        }
        if x.n_rows() != y.len() {
            return Err(EpimlError::dimension_mismatch("n_samples", x.n_rows(), y.len()));
        }
        let mut rng = rng_for(self.random_state);
        let candidates = self.sample_candidates(&mut rng)?;
        let folds = StratifiedKFold::new(self.cv)
            .with_random_state(rng.gen())
            .split(y)?;
        let fold_data: Vec<_> = folds
            .iter()
            .map(|(train, test)| (take_rows(x, y, train), take_rows(x, y, test)))
            .collect();
        let n_splits = fold_data.len();
        info!(
            candidates = candidates.len(),
            splits = n_splits,
            "randomized search"
        );

        let split_scores = par_map(self.n_jobs, candidates.len() * n_splits, |task| {
            let (c, s) = (task / n_splits, task % n_splits);
            let ((x_train, y_train), (x_test, y_test)) = &fold_data[s];
            let mut model = self.estimator.clone();
            model.set_params(&candidates[c])?;
            model.fit_pu(x_train, y_train)?;
            let (test, _) = self.scorer.score(&model, x_test, y_test)?;
            let (train, _) = self.scorer.score(&model, x_train, y_train)?;
            debug!(candidate = c, split = s, score = decision(&test), "split scored");
            Ok(SplitScores { test, train })
        })?;

        let mut per_candidate: Vec<Vec<SplitScores>> =
            vec![Vec::with_capacity(n_splits); candidates.len()];
        for (task, scores) in split_scores.into_iter().enumerate() {
            per_candidate[task / n_splits].push(scores);
        }
        let stats: Vec<(f64, f64)> = per_candidate
            .iter()
            .map(|splits| {
                let values: Vec<f64> = splits.iter().map(|s| decision(&s.test)).collect();
                let n = values.len() as f64;
                let mean = values.iter().sum::<f64>() / n;
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                (mean, var.sqrt())
            })
            .collect();
        let ranks = rank_candidates(&stats.iter().map(|s| s.0).collect::<Vec<_>>());

        let results = SearchResults::new(
            candidates
                .into_iter()
                .zip(per_candidate)
                .zip(stats.iter().zip(ranks))
                .map(|((params, splits), (&(mean, std), rank))| CandidateResult {
                    params,
                    splits,
                    mean_test_score: mean,
                    std_test_score: std,
                    rank,
                })
                .collect(),
        );

        self.best_estimator = None;
        if self.refit {
            if let Some(best) = results.best_index() {
                let params = &results.candidates[best].params;
                info!(
                    candidate = best,
                    score = results.candidates[best].mean_test_score,
                    "refitting best candidate"
                );
                let mut model = self.estimator.clone();
                model.set_params(params)?;
                model.fit_pu(x, y)?;
                self.best_estimator = Some(model);
            }
        }
        self.results = Some(results);
        Ok(())
    }

    fn fitted(&self) -> Result<&E> {
        self.best_estimator
            .as_ref()
            .ok_or_else(|| EpimlError::not_fitted("RandomizedSearchCV"))
    }
}

impl<E> PuClassifier for RandomizedSearchCV<E>
where
    E: PuClassifier + Tunable + Clone + Send + Sync,
{
    fn fit_pu(&mut self, x: &Matrix<f32>, y: &[i32]) -> Result<()> {
        self.fit(x, y)
    }

    fn predict_pu(&self, x: &Matrix<f32>) -> Result<Vec<i32>> {
        self.fitted()?.predict_pu(x)
    }

    fn predict_positive_proba(&self, x: &Matrix<f32>) -> Result<Vec<f32>> {
        self.fitted()?.predict_positive_proba(x)
    }
}

/// Nested cross-validation: the search is refit on each outer training
/// fold and scored on the outer test fold.
///
/// Returns one score data map per outer fold.
///
/// # Errors
///
/// Fails on invalid fold counts or when an inner search fails.
pub fn nested_cross_validate<E>(
    search: &RandomizedSearchCV<E>,
    x: &Matrix<f32>,
    y: &[i32],
    outer_cv: usize,
    random_state: Option<u64>,
) -> Result<Vec<ScoreData>>
where
    E: PuClassifier + Tunable + Clone + Send + Sync,
{
    if x.n_rows() != y.len() {
        return Err(EpimlError::dimension_mismatch("n_samples", x.n_rows(), y.len()));
    }
    let mut outer = StratifiedKFold::new(outer_cv);
    if let Some(seed) = random_state {
        outer = outer.with_random_state(seed);
    }
    let mut scores = Vec::with_capacity(outer_cv);
    for (fold, (train, test)) in outer.split(y)?.into_iter().enumerate() {
        let (x_train, y_train) = take_rows(x, y, &train);
        let (x_test, y_test) = take_rows(x, y, &test);
        let mut inner = search.clone().with_refit(true);
        inner.fit(&x_train, &y_train)?;
        let (data, score) = inner.scorer.score(&inner, &x_test, &y_test)?;
        info!(fold, score, "outer fold scored");
        scores.push(data);
    }
    Ok(scores)
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
