//! The two-step membership pipeline: load, then classify.

use crate::config::EpimlConfig;
use crate::data::{LoadCreon, MembershipData};
use crate::ensemble::{PNUWrapper, RepeatedRandomSubSampler, Voting};
use crate::error::{EpimlError, Result};
use crate::scoring::{FrankenScorer, ScoreData};
use crate::traits::PuClassifier;
use crate::tree::{MaxFeatures, RandomForestClassifier};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// The classifier step: a PU wrapper around repeated subsampled forests.
pub type MembershipModel = PNUWrapper<RepeatedRandomSubSampler<RandomForestClassifier>>;

/// Per-member predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    /// Member ids, in file order
    pub ids: Vec<String>,
    /// Predicted labels, `0` or `1`
    pub labels: Vec<i32>,
    /// Positive-class probabilities
    pub probabilities: Vec<f32>,
}

impl Predictions {
    /// Number of predicted members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether there are no predictions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Writes `member_id`, `prediction` and `probability` columns,
    /// tab-delimited, with a header line.
    ///
    /// # Errors
    ///
    /// Returns write errors.
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);
        out.write_record(["member_id", "prediction", "probability"])?;
        for ((id, label), prob) in self.ids.iter().zip(&self.labels).zip(&self.probabilities) {
            out.write_record([id.as_str(), &label.to_string(), &prob.to_string()])?;
        }
        out.flush()?;
        Ok(())
    }
}

/// `[('lc', LoadCreon), ('model', PNUWrapper(...))]`.
///
/// # Example
///
/// ```
/// use epiml::pipeline::CreonPipeline;
///
/// let pipeline = CreonPipeline::default();
/// assert!(pipeline.to_string().starts_with("Pipeline(steps=[('lc', LoadCreon("));
/// assert!(!pipeline.is_fitted());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreonPipeline {
    lc: LoadCreon,
    model: MembershipModel,
}

/// Matches `CreonPipeline::from_config(&EpimlConfig::default())`.
impl Default for CreonPipeline {
    fn default() -> Self {
        let forest = RandomForestClassifier::new(100)
            .with_min_samples_leaf(1)
            .with_max_features(MaxFeatures::Sqrt)
            .with_class_weight(None)
            .with_n_jobs(1);
        let subsampler = RepeatedRandomSubSampler::new(forest)
            .with_sample_ratio(1.0)
            .with_voting(Voting::Thresh)
            .with_threshold(0.5)
            .with_max_samples(None);
        let model = PNUWrapper::new(subsampler)
            .with_num_unlabeled(0.5)
            .with_pu_iter(0)
            .with_threshold_set_pct(None);
        Self::new(LoadCreon::new(), model)
    }
}

impl CreonPipeline {
    /// Assembles a pipeline from its steps.
    #[must_use]
    pub fn new(lc: LoadCreon, model: MembershipModel) -> Self {
        Self { lc, model }
    }

    /// Builds an unfitted pipeline from a configuration.
    ///
    /// # Errors
    ///
    /// Returns configuration validation errors.
    pub fn from_config(config: &EpimlConfig) -> Result<Self> {
        config.validate()?;
        let lc = LoadCreon::new()
            .with_delimiter(config.loader.delimiter_byte()?)
            .with_id_column(&config.loader.id_column)
            .with_label_column(&config.loader.label_column)
            .with_fill_value(config.loader.fill_value);

        let f = &config.forest;
        let mut forest = RandomForestClassifier::new(f.n_estimators)
            .with_min_samples_leaf(f.min_samples_leaf)
            .with_max_features(f.max_features.resolve()?)
            .with_class_weight(f.class_weight()?)
            .with_n_jobs(f.n_jobs);
        if let Some(depth) = f.max_depth {
            forest = forest.with_max_depth(depth);
        }

        let s = &config.subsampler;
        let mut subsampler = RepeatedRandomSubSampler::new(forest)
            .with_sample_ratio(s.sample_ratio)
            .with_voting(Voting::parse(&s.voting)?)
            .with_threshold(s.threshold)
            .with_max_samples(s.max_samples);
        if let Some(seed) = config.random_state {
            subsampler = subsampler.with_random_state(seed);
        }

        let pu = &config.pu;
        let mut model = PNUWrapper::new(subsampler)
            .with_num_unlabeled(pu.num_unlabeled)
            .with_pu_iter(pu.pu_iter)
            .with_threshold_set_pct(pu.threshold_set_pct);
        if let Some(seed) = config.random_state {
            model = model.with_random_state(seed);
        }
        Ok(Self::new(lc, model))
    }

    /// The loader step.
    #[must_use]
    pub fn loader(&self) -> &LoadCreon {
        &self.lc
    }

    /// The classifier step.
    #[must_use]
    pub fn model(&self) -> &MembershipModel {
        &self.model
    }

    /// Whether both steps are fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.lc.is_fitted() && self.model.is_fitted()
    }

    /// Feature names recorded at fit.
    #[must_use]
    pub fn feature_names(&self) -> Option<&[String]> {
        self.lc.feature_names()
    }

    /// Fits both steps on a labeled membership file.
    ///
    /// # Errors
    ///
    /// Returns loader errors and model fitting errors.
    pub fn fit(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let data = self.lc.fit(path)?;
        self.fit_data(&data)
    }

    /// Fits the model on already loaded data.
    fn fit_data(&mut self, data: &MembershipData) -> Result<()> {
        let labels = data.require_labels()?;
        info!(
            members = data.n_rows(),
            features = data.feature_names.len(),
            positives = labels.iter().filter(|&&l| l == 1).count(),
            unlabeled = labels.iter().filter(|&&l| l == -1).count(),
            "fitting membership model"
        );
        self.model.fit_pu(&data.x, labels)
    }

    fn check_fitted(&self) -> Result<()> {
        if self.is_fitted() {
            Ok(())
        } else {
            Err(EpimlError::not_fitted("Pipeline"))
        }
    }

    /// Predicts every member of a file.
    ///
    /// # Errors
    ///
    /// Fails before fit, on loader errors, or when features are missing.
    pub fn predict(&self, path: impl AsRef<Path>) -> Result<Predictions> {
        self.check_fitted()?;
        let data = self.lc.transform(path)?;
        self.predict_data(data)
    }

    /// Predicts already transformed data.
    ///
    /// # Errors
    ///
    /// Fails before fit or when the feature count differs.
    pub fn predict_data(&self, data: MembershipData) -> Result<Predictions> {
        self.check_fitted()?;
        let labels = self.model.predict_pu(&data.x)?;
        let probabilities = self.model.predict_positive_proba(&data.x)?;
        Ok(Predictions {
            ids: data.ids,
            labels,
            probabilities,
        })
    }

    /// Scores the pipeline on a labeled file.
    ///
    /// # Errors
    ///
    /// Fails before fit, on loader errors, or without a label column.
    pub fn score(
        &self,
        path: impl AsRef<Path>,
        scorer: &FrankenScorer,
    ) -> Result<(ScoreData, f64)> {
        self.check_fitted()?;
        let data = self.lc.transform(path)?;
        let labels = data.require_labels()?;
        scorer.score(&self.model, &data.x, labels)
    }
}

impl fmt::Display for CreonPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pipeline(steps=[('lc', {}), ('model', {})])",
            self.lc, self.model
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn membership_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "member_id\tlabel\tscore_a\tscore_b").expect("write header");
        for i in 0..12 {
            writeln!(file, "p{i}\t1\t{}\t1", 8.0 + i as f32 * 0.1).expect("write row");
        }
        for i in 0..8 {
            writeln!(file, "n{i}\t0\t{}\t0", i as f32 * 0.1).expect("write row");
        }
        for i in 0..30 {
            writeln!(file, "u{i}\t-1\t{}\tNA", 0.05 + i as f32 * 0.1).expect("write row");
        }
        file
    }

    fn small_config() -> EpimlConfig {
        let mut config = EpimlConfig::default();
        config.random_state = Some(5);
        config.forest.n_estimators = 5;
        config
    }

    #[test]
    fn test_default_matches_default_config() {
        let from_config = CreonPipeline::from_config(&EpimlConfig::default()).unwrap();
        assert_eq!(CreonPipeline::default(), from_config);
        assert!(CreonPipeline::default().to_string().contains("num_unlabeled=0.5"));
    }

    #[test]
    fn test_from_config_wires_every_step() {
        let mut config = small_config();
        config.subsampler.voting = "soft".into();
        config.pu.num_unlabeled = 10.0;
        let pipeline = CreonPipeline::from_config(&config).unwrap();
        let repr = pipeline.to_string();
        assert!(repr.contains("voting='soft'"), "{repr}");
        assert!(repr.contains("num_unlabeled=10.0"), "{repr}");
        assert!(repr.contains("n_estimators=5"), "{repr}");
        assert!(repr.contains("random_state=5"), "{repr}");
        assert!(repr.ends_with(")])"));
    }

    #[test]
    fn test_fit_predict_and_score() {
        let file = membership_file();
        let mut pipeline = CreonPipeline::from_config(&small_config()).unwrap();
        pipeline.fit(file.path()).unwrap();
        assert!(pipeline.is_fitted());
        assert_eq!(pipeline.feature_names().unwrap(), ["score_a", "score_b"]);

        let predictions = pipeline.predict(file.path()).unwrap();
        assert_eq!(predictions.len(), 50);
        assert_eq!(predictions.ids[0], "p0");
        assert!(predictions.labels[..12].iter().all(|&l| l == 1));
        assert!(predictions.labels[12..20].iter().all(|&l| l == 0));
        assert!(predictions
            .probabilities
            .iter()
            .all(|p| (0.0..=1.0).contains(p)));

        let (data, score) = pipeline.score(file.path(), &FrankenScorer::default()).unwrap();
        assert!((score - 1.0).abs() < 1e-9);
        assert!(data.contains_key("pu_score"));
    }

    #[test]
    fn test_unfitted_pipeline_refuses_to_predict() {
        let file = membership_file();
        let pipeline = CreonPipeline::default();
        assert!(matches!(
            pipeline.predict(file.path()),
            Err(EpimlError::NotFitted { .. })
        ));
    }

    #[test]
    fn test_predictions_tsv() {
        let predictions = Predictions {
            ids: vec!["a".into(), "b".into()],
            labels: vec![1, 0],
            probabilities: vec![0.75, 0.25],
        };
        let mut out = Vec::new();
        predictions.write_tsv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "member_id\tprediction\tprobability\na\t1\t0.75\nb\t0\t0.25\n"
        );
    }
}
