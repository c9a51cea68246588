//! epiml: positive-unlabeled membership classification in pure Rust.
//!
//! epiml trains classifiers on membership data where only some members
//! carry a label: positives (`1`), known negatives (`0`) and a large
//! unlabeled pool (`-1`). The trained model is a two-step pipeline,
//! a [`LoadCreon`](data::LoadCreon) loader followed by a
//! [`PNUWrapper`](ensemble::PNUWrapper) around a
//! [`RepeatedRandomSubSampler`](ensemble::RepeatedRandomSubSampler) of
//! random forests.
//!
//! # Quick Start
//!
//! ```
//! use epiml::prelude::*;
//!
//! // Positives near 5, negatives and unlabeled rows near 0.
//! let x = Matrix::from_vec(8, 1, vec![
//!     5.0, 5.1, 5.2,
//!     0.0, 0.1,
//!     0.2, 0.3, 0.25,
//! ]).unwrap();
//! let y = vec![1, 1, 1, 0, 0, -1, -1, -1];
//!
//! let forest = RandomForestClassifier::new(10).with_random_state(0);
//! let mut model = PNUWrapper::new(RepeatedRandomSubSampler::new(forest))
//!     .with_num_unlabeled(1.0)
//!     .with_random_state(0);
//! model.fit_pu(&x, &y).unwrap();
//!
//! let scorer = FrankenScorer::default();
//! let (scores, f1) = scorer.score(&model, &x, &y).unwrap();
//! assert!(f1 > 0.9);
//! assert!(scores.contains_key("pu_score"));
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Core Vector and Matrix types
//! - [`tree`]: Decision trees and random forests (bootstrap or balanced subsample)
//! - [`ensemble`]: Balanced-subsample forest, repeated subsampler, PU wrapper
//! - [`metrics`]: Classification and PU metrics
//! - [`scoring`]: The all-metrics `FrankenScorer` and score tables
//! - [`model_selection`]: Folds, randomized search, nested cross-validation
//! - [`data`]: Membership file loader
//! - [`pipeline`]: The load-then-classify pipeline
//! - [`persist`]: Checksummed model files
//! - [`config`]: TOML training configuration

pub mod config;
pub mod data;
pub mod ensemble;
pub mod epimlmain;
pub mod error;
pub mod metrics;
pub mod model_selection;
pub mod persist;
pub mod pipeline;
pub mod prelude;
pub mod primitives;
mod repr;
pub mod scoring;
pub mod traits;
pub mod tree;

pub use epimlmain::EpimlModel;
pub use error::{EpimlError, Result};
pub use primitives::{Matrix, Vector};
pub use traits::{Classifier, PuClassifier, Tunable};
