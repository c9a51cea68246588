//! Flattening score data into tables.

use super::franken::{ScoreData, ScoreValue, SCORE_INDEX};
use crate::model_selection::SearchResults;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A table of named numeric columns, one row per split or candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreGrid {
    rows: Vec<BTreeMap<String, f64>>,
}

impl ScoreGrid {
    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Sorted union of all column names.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        let set: BTreeSet<&String> = self.rows.iter().flat_map(BTreeMap::keys).collect();
        set.into_iter().cloned().collect()
    }

    /// Value at `(row, column)`, if present.
    #[must_use]
    pub fn get(&self, row: usize, column: &str) -> Option<f64> {
        self.rows.get(row)?.get(column).copied()
    }

    /// A whole column, `None` where a row lacks it.
    #[must_use]
    pub fn column(&self, column: &str) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.get(column).copied()).collect()
    }

    /// The rows as maps.
    #[must_use]
    pub fn rows(&self) -> &[BTreeMap<String, f64>] {
        &self.rows
    }

    /// Keeps only the columns accepted by `keep`.
    #[must_use]
    pub fn select<F: Fn(&str) -> bool>(&self, keep: F) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .map(|r| {
                    r.iter()
                        .filter(|(k, _)| keep(k))
                        .map(|(k, v)| (k.clone(), *v))
                        .collect()
                })
                .collect(),
        }
    }
}

/// Writes `key -> value` into `row`, expanding confusion matrices into
/// `tn_`, `fp_`, `fn_` and `tp_` columns. Returns the columns written.
fn flatten_into(row: &mut BTreeMap<String, f64>, key: &str, value: &ScoreValue) -> Vec<String> {
    match value {
        ScoreValue::Scalar(v) => {
            row.insert(key.to_string(), *v);
            vec![key.to_string()]
        }
        ScoreValue::Confusion([[tn, fp], [fn_, tp]]) => {
            let mut written = Vec::with_capacity(4);
            for (prefix, count) in [("tn", tn), ("fp", fp), ("fn", fn_), ("tp", tp)] {
                let col = format!("{prefix}_{key}");
                row.insert(col.clone(), *count as f64);
                written.push(col);
            }
            written
        }
    }
}

/// One row per outer split of a nested cross-validation.
///
/// The repeated decision score (`SCORE`) is left out.
#[must_use]
pub fn extract_scores_from_nested(scores: &[ScoreData]) -> ScoreGrid {
    let rows = scores
        .iter()
        .map(|split| {
            let mut row = BTreeMap::new();
            for (k, v) in split {
                if k != SCORE_INDEX {
                    flatten_into(&mut row, k, v);
                }
            }
            row
        })
        .collect();
    ScoreGrid { rows }
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if values.len() < 2 {
        f64::NAN
    } else {
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    };
    (mean, std)
}

/// One row per search candidate.
///
/// Columns are `<metric>_<test|train><split>`; every metric additionally
/// gets `mean_<metric>_<test|train>` and `std_<metric>_<test|train>`
/// (sample standard deviation) across splits.
#[must_use]
pub fn extract_score_grid(results: &SearchResults) -> ScoreGrid {
    let rows = results
        .candidates()
        .iter()
        .map(|candidate| {
            let mut row = BTreeMap::new();
            let mut per_label: BTreeMap<String, Vec<f64>> = BTreeMap::new();
            for (split, scores) in candidate.splits.iter().enumerate() {
                for (kind, data) in [("test", &scores.test), ("train", &scores.train)] {
                    for (k, v) in data {
                        if k == SCORE_INDEX {
                            continue;
                        }
                        let key = format!("{k}_{kind}{split}");
                        let suffix = split.to_string();
                        for col in flatten_into(&mut row, &key, v) {
                            let label = col[..col.len() - suffix.len()].to_string();
                            per_label.entry(label).or_default().push(row[&col]);
                        }
                    }
                }
            }
            for (label, values) in per_label {
                let (mean, std) = mean_std(&values);
                row.insert(format!("mean_{label}"), mean);
                row.insert(format!("std_{label}"), std);
            }
            row
        })
        .collect();
    ScoreGrid { rows }
}

/// Columns whose name contains both `mean` and `test`.
#[must_use]
pub fn get_mean_test_scores(grid: &ScoreGrid) -> ScoreGrid {
    grid.select(|c| c.contains("mean") && c.contains("test"))
}
