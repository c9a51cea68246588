//! The user-facing model: train, predict, save, load.

use crate::config::EpimlConfig;
use crate::error::{EpimlError, Result};
use crate::persist::{self, ModelMetadata};
use crate::pipeline::{CreonPipeline, Predictions};
use crate::scoring::{FrankenScorer, ScoreData};
use std::path::Path;
use tracing::info;

/// Model type tag written into model files.
pub const MODEL_TYPE: &str = "CreonPipeline";

/// Membership model wrapping a [`CreonPipeline`].
///
/// # Example
///
/// ```no_run
/// use epiml::EpimlModel;
///
/// let mut model = EpimlModel::default();
/// model.generate_trained_model("members.tsv")?;
/// let predictions = model.predict("new_members.tsv")?;
/// model.save_model("members.epml")?;
///
/// let restored = EpimlModel::load_model("members.epml")?;
/// assert_eq!(restored.predict("new_members.tsv")?, predictions);
/// # Ok::<(), epiml::EpimlError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct EpimlModel {
    config: EpimlConfig,
    pipeline: Option<CreonPipeline>,
    metadata: Option<ModelMetadata>,
}

impl EpimlModel {
    /// An untrained model using `config`.
    #[must_use]
    pub fn new(config: EpimlConfig) -> Self {
        Self {
            config,
            pipeline: None,
            metadata: None,
        }
    }

    /// The training configuration.
    #[must_use]
    pub fn config(&self) -> &EpimlConfig {
        &self.config
    }

    /// The trained pipeline, if any.
    #[must_use]
    pub fn pipeline(&self) -> Option<&CreonPipeline> {
        self.pipeline.as_ref()
    }

    /// Metadata of the file this model was loaded from.
    #[must_use]
    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.metadata.as_ref()
    }

    /// Whether a trained pipeline is present.
    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.pipeline.as_ref().is_some_and(CreonPipeline::is_fitted)
    }

    fn trained(&self) -> Result<&CreonPipeline> {
        self.pipeline
            .as_ref()
            .filter(|p| p.is_fitted())
            .ok_or_else(|| EpimlError::not_fitted("EpimlModel"))
    }

    /// Builds a pipeline from the configuration and fits it on a labeled
    /// membership file. Replaces any earlier pipeline.
    ///
    /// # Errors
    ///
    /// Returns configuration, loader and fitting errors.
    pub fn generate_trained_model(&mut self, path: impl AsRef<Path>) -> Result<&CreonPipeline> {
        let path = path.as_ref();
        let mut pipeline = CreonPipeline::from_config(&self.config)?;
        info!(path = %path.display(), "training membership model");
        pipeline.fit(path)?;
        self.metadata = None;
        Ok(self.pipeline.insert(pipeline))
    }

    /// Predicts every member of a file.
    ///
    /// # Errors
    ///
    /// Returns `NotFitted` before training, and loader errors.
    pub fn predict(&self, path: impl AsRef<Path>) -> Result<Predictions> {
        self.trained()?.predict(path)
    }

    /// Scores the trained pipeline on a labeled file.
    ///
    /// # Errors
    ///
    /// Returns `NotFitted` before training, and loader errors.
    pub fn score(
        &self,
        path: impl AsRef<Path>,
        scorer: &FrankenScorer,
    ) -> Result<(ScoreData, f64)> {
        self.trained()?.score(path, scorer)
    }

    /// Writes the trained pipeline to `model_path`.
    ///
    /// # Errors
    ///
    /// Returns `NotFitted` before training, and I/O errors.
    pub fn save_model(&self, model_path: impl AsRef<Path>) -> Result<ModelMetadata> {
        let pipeline = self.trained()?;
        let metadata = ModelMetadata::new(
            MODEL_TYPE,
            pipeline.to_string(),
            pipeline.feature_names().unwrap_or_default().to_vec(),
        );
        persist::save(pipeline, &metadata, model_path.as_ref())?;
        info!(path = %model_path.as_ref().display(), "saved model");
        Ok(metadata)
    }

    /// Restores a model written by [`save_model`](Self::save_model).
    ///
    /// # Errors
    ///
    /// Returns I/O and format errors, and a format error when the restored
    /// pipeline's repr differs from the recorded one.
    pub fn load_model(model_path: impl AsRef<Path>) -> Result<Self> {
        let (metadata, pipeline): (ModelMetadata, CreonPipeline) =
            persist::load(model_path.as_ref(), MODEL_TYPE)?;
        let repr = pipeline.to_string();
        if repr != metadata.repr {
            return Err(EpimlError::FormatError {
                message: format!(
                    "restored pipeline does not match its recorded repr: {repr} != {}",
                    metadata.repr
                ),
            });
        }
        Ok(Self {
            config: EpimlConfig::default(),
            pipeline: Some(pipeline),
            metadata: Some(metadata),
        })
    }
}
