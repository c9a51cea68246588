//! `epiml train`

use super::validate_path;
use crate::error::{CliError, Result};
use crate::output;
use epiml::config::EpimlConfig;
use epiml::{EpimlError, EpimlModel};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

pub(crate) fn run(
    data: &Path,
    model_path: &Path,
    config: Option<&Path>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    validate_path(data)?;
    let config = match config {
        Some(path) => {
            validate_path(path)?;
            EpimlConfig::from_file(path).map_err(|e| match e {
                EpimlError::Serialization(message) => CliError::Config(message),
                other => other.into(),
            })?
        }
        None => EpimlConfig::default(),
    };

    debug!(?config, "training configuration");

    let start = Instant::now();
    let mut model = EpimlModel::new(config);
    model.generate_trained_model(data)?;
    let metadata = model.save_model(model_path)?;
    let elapsed = start.elapsed();

    if json {
        return output::json(&metadata);
    }
    if !quiet {
        output::section("Trained model");
        output::kv("Data", data.display());
        output::kv("Model", model_path.display());
        output::kv("Features", metadata.n_features);
        output::kv("Pipeline", &metadata.repr);
        output::kv("Time", format!("{:.2}s", elapsed.as_secs_f64()));
        output::success(&format!("saved {}", model_path.display()));
    }
    Ok(())
}
