//! Training configuration.
//!
//! An [`EpimlConfig`] is read from TOML; every section and field is
//! optional and falls back to its default.
//!
//! ```toml
//! random_state = 42
//!
//! [loader]
//! delimiter = ","
//!
//! [forest]
//! n_estimators = 200
//! max_features = "sqrt"
//! class_weight = "balanced_subsample"
//!
//! [subsampler]
//! voting = "soft"
//!
//! [pu]
//! num_unlabeled = 0.25
//! ```

use crate::ensemble::Voting;
use crate::error::{EpimlError, Result};
use crate::traits::ParamValue;
use crate::tree::{ClassWeight, MaxFeatures};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// `max_features` as written in TOML: a name, a count or a fraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureSetting {
    /// A fixed number of features
    Count(i64),
    /// A fraction of the features
    Fraction(f64),
    /// `"sqrt"`, `"log2"` or `"all"`
    Name(String),
}

impl FeatureSetting {
    /// Resolves the setting.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown names and out-of-range numbers.
    pub fn resolve(&self) -> Result<MaxFeatures> {
        let value = match self {
            FeatureSetting::Count(n) => ParamValue::Int(*n),
            FeatureSetting::Fraction(f) => ParamValue::Float(*f),
            FeatureSetting::Name(s)
                if s.eq_ignore_ascii_case("all") || s.eq_ignore_ascii_case("none") =>
            {
                ParamValue::None
            }
            FeatureSetting::Name(s) => ParamValue::Str(s.clone()),
        };
        MaxFeatures::from_param(&value)
    }
}

/// `[loader]`: membership file layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Single-character field delimiter
    pub delimiter: String,
    /// Id column name
    pub id_column: String,
    /// Label column name
    pub label_column: String,
    /// Value for empty and `NA` cells
    pub fill_value: f32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delimiter: "\t".to_string(),
            id_column: "member_id".to_string(),
            label_column: "label".to_string(),
            fill_value: 0.0,
        }
    }
}

impl LoaderConfig {
    /// The delimiter as a byte.
    ///
    /// # Errors
    ///
    /// Returns an error unless the delimiter is one ASCII character.
    pub fn delimiter_byte(&self) -> Result<u8> {
        match self.delimiter.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(EpimlError::invalid_param(
                "loader.delimiter",
                format!("{:?}", self.delimiter),
                "a single ASCII character",
            )),
        }
    }
}

/// `[forest]`: the random forest inside each subsampler member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Trees per forest
    pub n_estimators: usize,
    /// Maximum tree depth; unlimited when absent
    pub max_depth: Option<usize>,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Features considered per split
    pub max_features: FeatureSetting,
    /// `"balanced"` or `"balanced_subsample"`; none when absent
    pub class_weight: Option<String>,
    /// Worker threads for tree fitting (0 = all cores)
    pub n_jobs: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_leaf: 1,
            max_features: FeatureSetting::Name("sqrt".to_string()),
            class_weight: None,
            n_jobs: 1,
        }
    }
}

impl ForestConfig {
    /// Resolved class weighting.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown names.
    pub fn class_weight(&self) -> Result<Option<ClassWeight>> {
        match &self.class_weight {
            None => Ok(None),
            Some(name) if name.eq_ignore_ascii_case("none") => Ok(None),
            Some(name) => ClassWeight::from_param(&ParamValue::Str(name.clone())),
        }
    }
}

/// `[subsampler]`: the repeated random subsampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsamplerConfig {
    /// Minority/majority ratio per subsample, in (0, 1]
    pub sample_ratio: f32,
    /// `"soft"`, `"hard"` or `"thresh"`
    pub voting: String,
    /// Vote fraction needed for a positive under `"thresh"`
    pub threshold: f32,
    /// Cap on the number of members
    pub max_samples: Option<usize>,
}

impl Default for SubsamplerConfig {
    fn default() -> Self {
        Self {
            sample_ratio: 1.0,
            voting: "thresh".to_string(),
            threshold: 0.5,
            max_samples: None,
        }
    }
}

/// `[pu]`: the PU wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuConfig {
    /// Unlabeled rows used as negatives: a count when `>= 1`, else a fraction
    pub num_unlabeled: f64,
    /// Relabel-and-refit rounds
    pub pu_iter: usize,
    /// Fraction relabeled positive per round, required when `pu_iter > 0`
    pub threshold_set_pct: Option<f64>,
}

impl Default for PuConfig {
    fn default() -> Self {
        Self {
            num_unlabeled: 0.5,
            pu_iter: 0,
            threshold_set_pct: None,
        }
    }
}

/// Complete training configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpimlConfig {
    /// Seed shared by every random component
    pub random_state: Option<u64>,
    /// Loader settings
    pub loader: LoaderConfig,
    /// Forest settings
    pub forest: ForestConfig,
    /// Subsampler settings
    pub subsampler: SubsamplerConfig,
    /// PU wrapper settings
    pub pu: PuConfig,
}

impl EpimlConfig {
    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed TOML or invalid values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| EpimlError::Serialization(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns I/O, parse and validation errors.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| EpimlError::Serialization(e.to_string()))
    }

    /// Checks every value range.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.loader.delimiter_byte()?;
        if self.forest.n_estimators == 0 {
            return Err(EpimlError::invalid_param("forest.n_estimators", 0, ">= 1"));
        }
        if self.forest.min_samples_leaf == 0 {
            return Err(EpimlError::invalid_param("forest.min_samples_leaf", 0, ">= 1"));
        }
        self.forest.max_features.resolve()?;
        self.forest.class_weight()?;

        let s = &self.subsampler;
        if !(s.sample_ratio > 0.0 && s.sample_ratio <= 1.0) {
            return Err(EpimlError::invalid_param(
                "subsampler.sample_ratio",
                s.sample_ratio,
                "0 < sample_ratio <= 1",
            ));
        }
        Voting::parse(&s.voting)?;
        if !(0.0..=1.0).contains(&s.threshold) {
            return Err(EpimlError::invalid_param(
                "subsampler.threshold",
                s.threshold,
                "0 <= threshold <= 1",
            ));
        }
        if s.max_samples == Some(0) {
            return Err(EpimlError::invalid_param("subsampler.max_samples", 0, ">= 1"));
        }

        let pu = &self.pu;
        if !(pu.num_unlabeled >= 0.0 && pu.num_unlabeled.is_finite()) {
            return Err(EpimlError::invalid_param(
                "pu.num_unlabeled",
                pu.num_unlabeled,
                ">= 0",
            ));
        }
        if pu.pu_iter > 0 && !matches!(pu.threshold_set_pct, Some(p) if p > 0.0 && p < 1.0) {
            return Err(EpimlError::invalid_param(
                "pu.threshold_set_pct",
                format!("{:?}", pu.threshold_set_pct),
                "a fraction in (0, 1) when pu_iter > 0",
            ));
        }
        Ok(())
    }
}
