//! Core compute primitives (Vector, Matrix).
//!
//! Feature data is a row-major `Matrix<f32>`, one row per member.

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::Vector;
