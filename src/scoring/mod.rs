//! Multi-metric scoring for PU classifiers.
//!
//! [`FrankenScorer`] evaluates a fitted [`PuClassifier`](crate::traits::PuClassifier)
//! on every labeled, assumed and PU metric at once and returns the whole
//! set together with one decision score used for model selection. The
//! grid helpers flatten collections of these results into tables.

mod franken;
mod grid;

pub use franken::{FrankenScorer, ScoreData, ScoreValue, SCORE_INDEX, SCORE_KEYS};
pub use grid::{extract_score_grid, extract_scores_from_nested, get_mean_test_scores, ScoreGrid};
