//! Ensembles for imbalanced and positive-unlabeled membership data.
//!
//! - [`RandomForestSubsample`]: a random forest whose trees each see a
//!   class-balanced bootstrap.
//! - [`RepeatedRandomSubSampler`]: trains clones of any classifier on
//!   balanced subsamples that together cover the whole majority class.
//! - [`PNUWrapper`]: turns a binary classifier into a PU learner by
//!   sampling unlabeled rows as negatives and optionally relabeling the
//!   most confident ones.

mod pnu;
mod repeated;
mod subsample;

pub use pnu::PNUWrapper;
pub use repeated::{RepeatedRandomSubSampler, Voting};
pub use subsample::RandomForestSubsample;

use crate::error::{EpimlError, Result};
use crate::traits::{ParamValue, Tunable, NESTED_PREFIX};

/// Routes `base_estimator__<name>` to the wrapped estimator.
///
/// Returns `None` when `name` carries no nested prefix.
pub(crate) fn route_nested<E: Tunable>(
    base: &mut E,
    name: &str,
    value: &ParamValue,
) -> Option<Result<()>> {
    let rest = name.strip_prefix(NESTED_PREFIX)?;
    if rest.is_empty() {
        return Some(Err(EpimlError::invalid_param(
            name,
            value,
            "a nested parameter name after base_estimator__",
        )));
    }
    Some(base.set_param(rest, value))
}

/// Runs `job(i)` for `i in 0..n_tasks` on a rayon pool of `n_jobs`
/// threads (0 = all cores, 1 = the calling thread). Results keep task order.
pub(crate) fn par_map<T, F>(n_jobs: usize, n_tasks: usize, job: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> Result<T> + Sync + Send,
{
    use rayon::prelude::*;

    if n_jobs == 1 {
        return (0..n_tasks).map(job).collect();
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_jobs)
        .build()
        .map_err(|e| EpimlError::Other(format!("failed to start worker pool: {e}")))?;
    pool.install(|| (0..n_tasks).into_par_iter().map(job).collect())
}

/// [`par_map`] over precomputed seeds; `job` receives the task index and its seed.
pub(crate) fn run_seeded<T, F>(n_jobs: usize, seeds: &[u64], job: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize, u64) -> Result<T> + Sync + Send,
{
    par_map(n_jobs, seeds.len(), |i| job(i, seeds[i]))
}
