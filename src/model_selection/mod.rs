//! Cross-validation splits, randomized hyperparameter search and nested
//! cross-validation, all scored with a [`FrankenScorer`](crate::scoring::FrankenScorer).
//!
//! Splitters return index pairs rather than data so the same folds can be
//! applied to features and labels alike (see `take_rows`).

mod search;

pub use search::{
    nested_cross_validate, CandidateResult, ParamDistribution, RandomizedSearchCV, SearchResults,
    SplitScores,
};

use crate::error::{EpimlError, Result};
use crate::primitives::Matrix;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Train/test index pairs, one per fold.
pub type Folds = Vec<(Vec<usize>, Vec<usize>)>;

fn rng_for(random_state: Option<u64>) -> StdRng {
    random_state.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

fn check_n_splits(n_splits: usize, n_samples: usize) -> Result<()> {
    if n_splits < 2 {
        return Err(EpimlError::invalid_param("n_splits", n_splits, ">= 2"));
    }
    if n_splits > n_samples {
        return Err(EpimlError::invalid_param(
            "n_splits",
            n_splits,
            &format!("<= n_samples={n_samples}"),
        ));
    }
    Ok(())
}

/// Appends consecutive chunks of `indices` to `folds`; the first
/// `len % folds.len()` folds get one extra index.
fn deal(indices: &[usize], folds: &mut [Vec<usize>]) {
    let (base, extra) = (indices.len() / folds.len(), indices.len() % folds.len());
    let mut rest = indices;
    for (i, fold) in folds.iter_mut().enumerate() {
        let (chunk, tail) = rest.split_at(base + usize::from(i < extra));
        fold.extend_from_slice(chunk);
        rest = tail;
    }
}

/// Each fold is a test set once; the others form its training set.
fn into_folds(test_sets: Vec<Vec<usize>>) -> Folds {
    (0..test_sets.len())
        .map(|i| {
            let train = test_sets
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .flat_map(|(_, fold)| fold.iter().copied())
                .collect();
            (train, test_sets[i].clone())
        })
        .collect()
}

/// Consecutive (optionally shuffled) folds.
///
/// ```rust
/// use epiml::model_selection::KFold;
///
/// let folds = KFold::new(5).split(10).unwrap();
/// assert_eq!(folds.len(), 5);
/// assert_eq!(folds[0].1, vec![0, 1]);
/// assert_eq!(folds[0].0.len(), 8);
/// ```
#[derive(Debug, Clone)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl KFold {
    /// `n_splits` folds (at least 2), in row order.
    #[must_use]
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Seeds the shuffle and turns shuffling on.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self.shuffle = true;
        self
    }

    /// Folds over `0..n_samples`.
    ///
    /// # Errors
    ///
    /// `n_splits` below 2 or above `n_samples`.
    pub fn split(&self, n_samples: usize) -> Result<Folds> {
        check_n_splits(self.n_splits, n_samples)?;
        let mut order: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            order.shuffle(&mut rng_for(self.random_state));
        }
        let mut test_sets = vec![Vec::new(); self.n_splits];
        deal(&order, &mut test_sets);
        Ok(into_folds(test_sets))
    }
}

/// Folds that keep every label's share (unlabeled `-1` included) close to
/// its share in the whole set, so rare positives reach every fold.
///
/// ```rust
/// use epiml::model_selection::StratifiedKFold;
///
/// let y = vec![1, 1, 0, 0, -1, -1];
/// let folds = StratifiedKFold::new(2).split(&y).unwrap();
/// for (_, test) in &folds {
///     assert_eq!(test.iter().filter(|&&i| y[i] == 1).count(), 1);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl StratifiedKFold {
    /// `n_splits` folds (at least 2).
    #[must_use]
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    /// Shuffle members within each label before dealing.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Seeds the shuffle and turns shuffling on.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self.shuffle = true;
        self
    }

    /// Folds over the members labeled by `y`. Labels are dealt in
    /// ascending order, each starting again from the first fold.
    ///
    /// # Errors
    ///
    /// `n_splits` below 2 or above `y.len()`.
    pub fn split(&self, y: &[i32]) -> Result<Folds> {
        check_n_splits(self.n_splits, y.len())?;

        let mut by_label: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (i, &label) in y.iter().enumerate() {
            by_label.entry(label).or_default().push(i);
        }
        let mut rng = self.shuffle.then(|| rng_for(self.random_state));

        let mut test_sets = vec![Vec::new(); self.n_splits];
        for members in by_label.values_mut() {
            if let Some(rng) = rng.as_mut() {
                members.shuffle(rng);
            }
            deal(members, &mut test_sets);
        }
        Ok(into_folds(test_sets))
    }
}

/// Selects `indices` from both features and labels.
pub(crate) fn take_rows(x: &Matrix<f32>, y: &[i32], indices: &[usize]) -> (Matrix<f32>, Vec<i32>) {
    (x.select_rows(indices), indices.iter().map(|&i| y[i]).collect())
}

/// Random holdout: `(x_train, x_test, y_train, y_test)` with
/// `round(n_samples * test_size)` test rows.
///
/// # Errors
///
/// `test_size` outside (0, 1), mismatched lengths, or an empty side.
///
/// ```rust
/// use epiml::model_selection::train_test_split;
/// use epiml::primitives::Matrix;
///
/// let x = Matrix::from_vec(10, 1, (0..10).map(|i| i as f32).collect()).unwrap();
/// let y = vec![0, 1, 0, 1, 0, 1, 0, 1, -1, -1];
/// let (x_train, x_test, y_train, y_test) = train_test_split(&x, &y, 0.2, Some(42)).unwrap();
/// assert_eq!((x_train.n_rows(), x_test.n_rows()), (8, 2));
/// assert_eq!((y_train.len(), y_test.len()), (8, 2));
/// ```
#[allow(clippy::type_complexity)]
pub fn train_test_split(
    x: &Matrix<f32>,
    y: &[i32],
    test_size: f32,
    random_state: Option<u64>,
) -> Result<(Matrix<f32>, Matrix<f32>, Vec<i32>, Vec<i32>)> {
    if test_size <= 0.0 || test_size >= 1.0 {
        return Err(EpimlError::invalid_param("test_size", test_size, "0 < test_size < 1"));
    }
    let n_samples = x.n_rows();
    if n_samples != y.len() {
        return Err(EpimlError::dimension_mismatch("n_samples", n_samples, y.len()));
    }
    let n_test = (n_samples as f32 * test_size).round() as usize;
    if n_test == 0 || n_test == n_samples {
        return Err(EpimlError::Other(format!(
            "test_size={test_size} leaves an empty side of {n_samples} rows"
        )));
    }

    let mut order: Vec<usize> = (0..n_samples).collect();
    order.shuffle(&mut rng_for(random_state));
    let (train, test) = order.split_at(n_samples - n_test);
    let (x_train, y_train) = take_rows(x, y, train);
    let (x_test, y_test) = take_rows(x, y, test);
    Ok((x_train, x_test, y_train, y_test))
}
