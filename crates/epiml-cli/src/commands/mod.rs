//! Subcommand implementations.

pub(crate) mod inspect;
pub(crate) mod predict;
pub(crate) mod score;
pub(crate) mod train;

use crate::error::{CliError, Result};
use std::path::Path;

/// Fails early with a file-specific error for missing inputs.
pub(crate) fn validate_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(CliError::NotAFile(path.to_path_buf()));
    }
    Ok(())
}
