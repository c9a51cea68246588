//! `epiml inspect`

use super::validate_path;
use crate::error::Result;
use crate::output;
use epiml::persist;
use std::path::Path;

pub(crate) fn run(model_path: &Path, json: bool) -> Result<()> {
    validate_path(model_path)?;
    let metadata = persist::read_metadata(model_path)?;
    if json {
        return output::json(&metadata);
    }

    output::section(&format!("{}", model_path.display()));
    output::kv("Model type", &metadata.model_type);
    output::kv("Created", &metadata.created_at);
    output::kv("epiml version", &metadata.epiml_version);
    output::kv("Features", metadata.n_features);
    if !metadata.feature_names.is_empty() {
        output::kv("Feature names", metadata.feature_names.join(", "));
    }
    output::section("Pipeline");
    println!("  {}", metadata.repr);
    Ok(())
}
