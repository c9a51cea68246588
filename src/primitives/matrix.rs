//! Row-major sample matrix.
//!
//! Rows are members (samples) and columns are features. Estimator outputs
//! such as class probabilities reuse the same type with one column per class.

use super::Vector;
use crate::error::{EpimlError, Result};
use serde::{Deserialize, Serialize};

/// Dense row-major matrix.
///
/// ```
/// use epiml::primitives::Matrix;
///
/// // three members, two features
/// let x = Matrix::from_vec(3, 2, vec![0.1_f32, 4.0, 0.3, 2.5, 0.9, 1.0])?;
/// assert_eq!(x.shape(), (3, 2));
/// assert_eq!(x.row_slice(1), &[0.3, 2.5]);
/// # Ok::<(), epiml::EpimlError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Copy> Matrix<T> {
    /// Wraps `data`, laid out row after row.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` unless `data.len() == rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(EpimlError::DimensionMismatch {
                expected: format!("{rows}x{cols}={} values", rows * cols),
                actual: format!("{} values", data.len()),
            });
        }
        Ok(Self { data, rows, cols })
    }

    /// `(rows, cols)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of members.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// Number of features.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    /// Element at `(row, col)`. Panics when out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[self.offset(row, col)]
    }

    /// Overwrites `(row, col)`. Panics when out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        let at = self.offset(row, col);
        self.data[at] = value;
    }

    fn offset(&self, row: usize, col: usize) -> usize {
        debug_assert!(col < self.cols, "column {col} out of {}", self.cols);
        row * self.cols + col
    }

    /// One member's features, borrowed.
    #[must_use]
    pub fn row_slice(&self, row: usize) -> &[T] {
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }

    /// One member's features, copied.
    #[must_use]
    pub fn row(&self, row: usize) -> Vector<T> {
        Vector::from_slice(self.row_slice(row))
    }

    /// One feature across all members.
    #[must_use]
    pub fn column(&self, col: usize) -> Vector<T> {
        let values = self
            .data
            .iter()
            .skip(col)
            .step_by(self.cols.max(1))
            .take(self.rows)
            .copied()
            .collect();
        Vector::from_vec(values)
    }

    /// Gathers rows in the given order; repeated indices repeat the row,
    /// which is how bootstrap draws are materialized.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let data = indices
            .iter()
            .flat_map(|&i| self.row_slice(i).iter().copied())
            .collect();
        Self {
            data,
            rows: indices.len(),
            cols: self.cols,
        }
    }

    /// All values, row-major.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl Matrix<f32> {
    /// A `rows x cols` matrix of `0.0`.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Column of the largest value in each row; the lowest column wins ties,
    /// so a 0.5/0.5 probability row predicts class 0.
    #[must_use]
    pub fn argmax_rows(&self) -> Vec<usize> {
        (0..self.rows)
            .map(|r| {
                self.row_slice(r)
                    .iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |best, (j, &v)| {
                        if v > best.1 {
                            (j, v)
                        } else {
                            best
                        }
                    })
                    .0
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "matrix_tests.rs"]
mod tests;
