//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use epiml::prelude::*;
//! ```

pub use crate::config::EpimlConfig;
pub use crate::data::LoadCreon;
pub use crate::ensemble::{PNUWrapper, RandomForestSubsample, RepeatedRandomSubSampler, Voting};
pub use crate::epimlmain::EpimlModel;
pub use crate::error::{EpimlError, Result};
pub use crate::pipeline::CreonPipeline;
pub use crate::primitives::{Matrix, Vector};
pub use crate::scoring::FrankenScorer;
pub use crate::traits::{Classifier, ParamSet, ParamValue, PuClassifier, Tunable};
pub use crate::tree::{ClassWeight, DecisionTreeClassifier, MaxFeatures, RandomForestClassifier};
