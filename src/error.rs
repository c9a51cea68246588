//! Errors for loading members, fitting estimators and reading model files.

use std::fmt;

/// Every failure epiml reports.
///
/// Input problems (`DimensionMismatch`, `InvalidLabels`, `DataFormat`) are
/// separated from configuration problems (`InvalidHyperparameter`) and from
/// model file problems (`FormatError`, `UnsupportedVersion`,
/// `ChecksumMismatch`) so callers such as the CLI can map them to distinct
/// exit codes.
///
/// ```
/// use epiml::error::EpimlError;
///
/// let err = EpimlError::dimension_mismatch("n_features", 12, 11);
/// assert_eq!(err.to_string(), "shape mismatch: expected n_features=12, got 11");
/// ```
#[derive(Debug)]
pub enum EpimlError {
    /// Input shapes disagree, e.g. predicting with fewer features than at fit.
    DimensionMismatch {
        /// What was expected
        expected: String,
        /// What was given
        actual: String,
    },

    /// A hyperparameter or config value is out of range or of the wrong kind.
    InvalidHyperparameter {
        /// Parameter name, dotted for config keys
        param: String,
        /// Rejected value
        value: String,
        /// Accepted range
        constraint: String,
    },

    /// Predict, score or save before fit.
    NotFitted {
        /// Estimator type
        estimator: String,
    },

    /// Labels outside {-1, 0, 1}, or a label set that cannot be trained on.
    InvalidLabels {
        /// What is wrong
        message: String,
    },

    /// A membership file cell or header could not be read.
    DataFormat {
        /// 1-based line, the header being line 1
        line: usize,
        /// Column name, `-` when unknown
        column: String,
        /// What is wrong
        message: String,
    },

    /// Nothing to fit or score, e.g. a membership file with only a header.
    EmptyInput {
        /// What was empty
        context: String,
    },

    /// Underlying I/O failure.
    Io(std::io::Error),

    /// serde encoding or decoding failed.
    Serialization(String),

    /// A model file is not in the expected layout.
    FormatError {
        /// What is wrong
        message: String,
    },

    /// A model file written by an incompatible format version.
    UnsupportedVersion {
        /// `(major, minor)` in the file
        found: (u8, u8),
        /// `(major, minor)` this build reads
        supported: (u8, u8),
    },

    /// A model file whose stored CRC32 does not match its contents.
    ChecksumMismatch {
        /// Stored checksum
        expected: u32,
        /// Checksum of the bytes read
        actual: u32,
    },

    /// Anything else.
    Other(String),
}

impl fmt::Display for EpimlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch { expected, actual } => {
                write!(f, "shape mismatch: expected {expected}, got {actual}")
            }
            Self::InvalidHyperparameter {
                param,
                value,
                constraint,
            } => write!(f, "invalid {param} = {value} (must be {constraint})"),
            Self::NotFitted { estimator } => {
                write!(f, "{estimator} must be fitted before use")
            }
            Self::InvalidLabels { message } => write!(f, "bad labels: {message}"),
            Self::DataFormat {
                line,
                column,
                message,
            } => write!(f, "line {line}, column {column}: {message}"),
            Self::EmptyInput { context } => write!(f, "empty input: {context}"),
            Self::Io(e) => write!(f, "{e}"),
            Self::Serialization(msg) => write!(f, "encoding failed: {msg}"),
            Self::FormatError { message } => write!(f, "bad model file: {message}"),
            Self::UnsupportedVersion { found, supported } => write!(
                f,
                "model file version {}.{} cannot be read (this build reads {}.x up to {}.{})",
                found.0, found.1, supported.0, supported.0, supported.1
            ),
            Self::ChecksumMismatch { expected, actual } => write!(
                f,
                "model file is corrupt: stored CRC32 {expected:#010x}, computed {actual:#010x}"
            ),
            Self::Other(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for EpimlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Self::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<std::io::Error> for EpimlError {
    fn from(err: std::io::Error) -> Self {
        EpimlError::Io(err)
    }
}

impl From<csv::Error> for EpimlError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map_or(0, |p| p.line() as usize);
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(e) => EpimlError::Io(e),
            _ => EpimlError::DataFormat {
                line,
                column: String::from("-"),
                message,
            },
        }
    }
}

impl From<&str> for EpimlError {
    fn from(msg: &str) -> Self {
        EpimlError::Other(msg.to_string())
    }
}

impl From<String> for EpimlError {
    fn from(msg: String) -> Self {
        EpimlError::Other(msg)
    }
}

impl EpimlError {
    /// `DimensionMismatch` for a named count, rendered `name=expected`.
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: actual.to_string(),
        }
    }

    /// `InvalidHyperparameter` from any displayable value.
    #[must_use]
    pub fn invalid_param(param: &str, value: impl fmt::Display, constraint: &str) -> Self {
        Self::InvalidHyperparameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }

    #[must_use]
    pub fn not_fitted(estimator: &str) -> Self {
        Self::NotFitted {
            estimator: estimator.to_string(),
        }
    }

    /// Nothing to fit or score.
    #[must_use]
    pub fn empty_input(context: &str) -> Self {
        Self::EmptyInput {
            context: context.to_string(),
        }
    }
}

/// `Result` with [`EpimlError`].
pub type Result<T> = std::result::Result<T, EpimlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_value() {
        assert_eq!(
            EpimlError::invalid_param("target_imbalance_ratio", 0.05, "0.1 < r <= 1.0").to_string(),
            "invalid target_imbalance_ratio = 0.05 (must be 0.1 < r <= 1.0)"
        );
        assert_eq!(
            EpimlError::not_fitted("PNUWrapper").to_string(),
            "PNUWrapper must be fitted before use"
        );
        let cell = EpimlError::DataFormat {
            line: 3,
            column: "age".to_string(),
            message: "not a number".to_string(),
        };
        assert_eq!(cell.to_string(), "line 3, column age: not a number");
    }

    #[test]
    fn test_empty_input_is_its_own_variant() {
        let err = EpimlError::empty_input("membership file has no rows");
        assert!(matches!(err, EpimlError::EmptyInput { .. }));
        assert_eq!(err.to_string(), "empty input: membership file has no rows");
    }

    #[test]
    fn test_model_file_errors() {
        let crc = EpimlError::ChecksumMismatch {
            expected: 0xDEAD_BEEF,
            actual: 0x1,
        };
        assert!(crc.to_string().contains("0xdeadbeef"));
        assert!(crc.to_string().contains("0x00000001"));

        let version = EpimlError::UnsupportedVersion {
            found: (2, 0),
            supported: (1, 0),
        };
        assert!(version.to_string().starts_with("model file version 2.0"));
    }

    #[test]
    fn test_conversions() {
        use std::error::Error;
        let err: EpimlError = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "missing");

        let a: EpimlError = "boom".into();
        let b: EpimlError = String::from("boom").into();
        assert!(matches!((&a, &b), (EpimlError::Other(x), EpimlError::Other(y)) if x == y));
    }

    #[test]
    fn test_csv_error_keeps_line() {
        let text = "member_id\tlabel\na\t1\nb\t1\textra\n";
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_reader(text.as_bytes());
        let err = reader
            .records()
            .find_map(|r| r.err())
            .expect("ragged row must fail");
        match EpimlError::from(err) {
            EpimlError::DataFormat { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected {other:?}"),
        }
    }
}
