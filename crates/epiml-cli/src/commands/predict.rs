//! `epiml predict`

use super::validate_path;
use crate::error::{CliError, Result};
use crate::output;
use epiml::EpimlModel;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub(crate) fn run(
    model_path: &Path,
    data: &Path,
    out: Option<&Path>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    validate_path(model_path)?;
    validate_path(data)?;
    let model = EpimlModel::load_model(model_path)?;
    let predictions = model.predict(data)?;

    match (out, json) {
        (None, true) => output::json(&predictions)?,
        (None, false) => predictions.write_tsv(std::io::stdout().lock())?,
        (Some(path), true) => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, &predictions)
                .map_err(|e| CliError::Epiml(format!("JSON output failed: {e}")))?;
            writer.flush()?;
        }
        (Some(path), false) => predictions.write_tsv(BufWriter::new(File::create(path)?))?,
    }

    if let (Some(path), false) = (out, quiet) {
        let positives = predictions.labels.iter().filter(|&&l| l == 1).count();
        output::success(&format!(
            "wrote {} predictions ({positives} positive) to {}",
            predictions.len(),
            path.display()
        ));
    }
    Ok(())
}
