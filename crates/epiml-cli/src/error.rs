//! Error types for epiml-cli.

use epiml::EpimlError;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Result type alias for CLI operations
pub(crate) type Result<T> = std::result::Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug)]
pub(crate) enum CliError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Not a file (e.g., directory)
    #[error("Not a file: {0}")]
    NotAFile(PathBuf),

    /// Unreadable or corrupt model file
    #[error("Invalid model file: {0}")]
    InvalidModel(String),

    /// Malformed membership data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Bad configuration or option value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Model used before training
    #[error("Model not trained: {0}")]
    NotTrained(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other library error
    #[error("{0}")]
    Epiml(String),
}

impl CliError {
    /// Get exit code for this error
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::Epiml(_) => ExitCode::from(1),
            Self::FileNotFound(_) | Self::NotAFile(_) => ExitCode::from(3),
            Self::InvalidModel(_) => ExitCode::from(4),
            Self::InvalidData(_) => ExitCode::from(5),
            Self::Config(_) => ExitCode::from(6),
            Self::Io(_) => ExitCode::from(7),
            Self::NotTrained(_) => ExitCode::from(8),
        }
    }
}

impl From<EpimlError> for CliError {
    fn from(e: EpimlError) -> Self {
        let message = e.to_string();
        match e {
            EpimlError::Io(io) => Self::Io(io),
            EpimlError::FormatError { .. }
            | EpimlError::UnsupportedVersion { .. }
            | EpimlError::ChecksumMismatch { .. }
            | EpimlError::Serialization(_) => Self::InvalidModel(message),
            EpimlError::DataFormat { .. }
            | EpimlError::EmptyInput { .. }
            | EpimlError::InvalidLabels { .. }
            | EpimlError::DimensionMismatch { .. } => Self::InvalidData(message),
            EpimlError::InvalidHyperparameter { .. } => Self::Config(message),
            EpimlError::NotFitted { .. } => Self::NotTrained(message),
            EpimlError::Other(_) => Self::Epiml(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_errors_map_to_distinct_codes() {
        let cases = [
            EpimlError::ChecksumMismatch {
                expected: 1,
                actual: 2,
            },
            EpimlError::DataFormat {
                line: 3,
                column: "age".into(),
                message: "bad".into(),
            },
            EpimlError::invalid_param("forest.n_estimators", 0, ">= 1"),
            EpimlError::not_fitted("EpimlModel"),
            EpimlError::Other("boom".into()),
        ];
        let codes: Vec<String> = cases
            .into_iter()
            .map(|e| format!("{:?}", CliError::from(e).exit_code()))
            .collect();
        let mut unique = codes.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn test_empty_data_is_invalid_data() {
        let err = CliError::from(EpimlError::empty_input("membership file has no rows"));
        assert!(matches!(err, CliError::InvalidData(_)));
        assert_eq!(format!("{:?}", err.exit_code()), format!("{:?}", ExitCode::from(5)));
    }

    #[test]
    fn test_io_error_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(
            CliError::from(EpimlError::Io(io)),
            CliError::Io(_)
        ));
    }
}
