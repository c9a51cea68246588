//! Loader for delimited membership files.

use crate::error::{EpimlError, Result};
use crate::primitives::Matrix;
use crate::repr::{py_float, Repr};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Parsed membership data.
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipData {
    /// Member ids, one per row
    pub ids: Vec<String>,
    /// Feature column names, in matrix column order
    pub feature_names: Vec<String>,
    /// Feature matrix, `(n_members, n_features)`
    pub x: Matrix<f32>,
    /// Labels in `{-1, 0, 1}` when the file has a label column
    pub labels: Option<Vec<i32>>,
}

impl MembershipData {
    /// Number of members.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.ids.len()
    }

    /// Labels, or an error naming the missing column.
    ///
    /// # Errors
    ///
    /// Returns an error when the file carried no label column.
    pub fn require_labels(&self) -> Result<&[i32]> {
        self.labels.as_deref().ok_or_else(|| EpimlError::InvalidLabels {
            message: "membership file has no label column".to_string(),
        })
    }
}

/// Reads membership files into feature matrices.
///
/// The first line is a header. One column holds member ids, one holds
/// labels (`-1`, `0` or `1`), and every other column is a numeric feature.
/// Empty and `NA` cells become `fill_value`.
///
/// After [`fit`](Self::fit), [`transform`](Self::transform) reorders the
/// features of later files to the fitted column order.
///
/// # Example
///
/// ```
/// use epiml::data::LoadCreon;
///
/// let text = "member_id\tlabel\tage\tvisits\nA\t1\t40\t3\nB\t-1\t\tNA\n";
/// let mut lc = LoadCreon::new();
/// let data = lc.fit_reader(text.as_bytes()).unwrap();
/// assert_eq!(data.feature_names, vec!["age", "visits"]);
/// assert_eq!(data.x.get(1, 0), 0.0);
/// assert_eq!(data.labels, Some(vec![1, -1]));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadCreon {
    delimiter: u8,
    id_column: String,
    label_column: String,
    fill_value: f32,
    feature_names: Option<Vec<String>>,
}

impl Default for LoadCreon {
    fn default() -> Self {
        Self::new()
    }
}

/// Header layout of one file.
struct Layout {
    id: usize,
    label: Option<usize>,
    features: Vec<(usize, String)>,
}

fn is_missing(cell: &str) -> bool {
    cell.is_empty() || cell.eq_ignore_ascii_case("na") || cell.eq_ignore_ascii_case("nan")
}

fn parse_label(cell: &str, line: usize, column: &str) -> Result<i32> {
    let bad = |message: String| EpimlError::DataFormat {
        line,
        column: column.to_string(),
        message,
    };
    let value = match cell.parse::<i32>() {
        Ok(v) => v,
        Err(_) => match cell.parse::<f64>() {
            Ok(v) if v.fract() == 0.0 => v as i32,
            _ => return Err(bad(format!("label {cell:?} is not an integer"))),
        },
    };
    if (-1..=1).contains(&value) {
        Ok(value)
    } else {
        Err(bad(format!("label {value} not in {{-1, 0, 1}}")))
    }
}

impl LoadCreon {
    /// Tab-delimited files with `member_id` and `label` columns.
    #[must_use]
    pub fn new() -> Self {
        Self {
            delimiter: b'\t',
            id_column: "member_id".to_string(),
            label_column: "label".to_string(),
            fill_value: 0.0,
            feature_names: None,
        }
    }

    /// Field delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Name of the id column.
    #[must_use]
    pub fn with_id_column(mut self, name: &str) -> Self {
        self.id_column = name.to_string();
        self
    }

    /// Name of the label column.
    #[must_use]
    pub fn with_label_column(mut self, name: &str) -> Self {
        self.label_column = name.to_string();
        self
    }

    /// Value for empty and `NA` cells.
    #[must_use]
    pub fn with_fill_value(mut self, fill_value: f32) -> Self {
        self.fill_value = fill_value;
        self
    }

    /// Feature order recorded by `fit`.
    #[must_use]
    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Whether `fit` has recorded a feature order.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.feature_names.is_some()
    }

    fn layout(&self, headers: &csv::StringRecord) -> Result<Layout> {
        for (i, name) in headers.iter().enumerate() {
            if headers.iter().take(i).any(|h| h == name) {
                return Err(EpimlError::DataFormat {
                    line: 1,
                    column: name.to_string(),
                    message: "duplicate column".to_string(),
                });
            }
        }
        let id = headers
            .iter()
            .position(|h| h == self.id_column)
            .ok_or_else(|| EpimlError::DataFormat {
                line: 1,
                column: self.id_column.clone(),
                message: format!(
                    "missing id column; available columns: {:?}",
                    headers.iter().collect::<Vec<_>>()
                ),
            })?;
        let label = headers.iter().position(|h| h == self.label_column);
        let features = headers
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != id && Some(i) != label)
            .map(|(i, h)| (i, h.to_string()))
            .collect();
        Ok(Layout {
            id,
            label,
            features,
        })
    }

    /// Parses a file in its own column order.
    ///
    /// # Errors
    ///
    /// Returns I/O errors, a missing id column, and malformed cells with
    /// their line and column.
    pub fn read(&self, path: impl AsRef<Path>) -> Result<MembershipData> {
        let file = std::fs::File::open(path.as_ref())?;
        self.read_from(file)
    }

    /// Parses membership data from any reader.
    ///
    /// # Errors
    ///
    /// See [`read`](Self::read).
    pub fn read_from<R: Read>(&self, reader: R) -> Result<MembershipData> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = reader.headers()?.clone();
        let layout = self.layout(&headers)?;

        let mut ids = Vec::new();
        let mut labels = layout.label.map(|_| Vec::new());
        let mut values = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map_or(0, |p| p.line() as usize);
            ids.push(record.get(layout.id).unwrap_or_default().to_string());
            if let (Some(col), Some(labels)) = (layout.label, labels.as_mut()) {
                let cell = record.get(col).unwrap_or_default();
                labels.push(parse_label(cell, line, &self.label_column)?);
            }
            for (col, name) in &layout.features {
                let cell = record.get(*col).unwrap_or_default();
                if is_missing(cell) {
                    values.push(self.fill_value);
                } else {
                    values.push(cell.parse::<f32>().map_err(|e| EpimlError::DataFormat {
                        line,
                        column: name.clone(),
                        message: format!("{cell:?} is not a number: {e}"),
                    })?);
                }
            }
        }
        if ids.is_empty() {
            return Err(EpimlError::empty_input("membership file has no rows"));
        }

        let feature_names: Vec<String> = layout.features.into_iter().map(|(_, n)| n).collect();
        let x = Matrix::from_vec(ids.len(), feature_names.len(), values)?;
        debug!(
            rows = ids.len(),
            features = feature_names.len(),
            labeled = labels.is_some(),
            "read membership data"
        );
        Ok(MembershipData {
            ids,
            feature_names,
            x,
            labels,
        })
    }

    /// Reads `path` and records its feature order. Labels are required.
    ///
    /// # Errors
    ///
    /// See [`read`](Self::read); also fails without a label column.
    pub fn fit(&mut self, path: impl AsRef<Path>) -> Result<MembershipData> {
        let file = std::fs::File::open(path.as_ref())?;
        self.fit_reader(file)
    }

    /// [`fit`](Self::fit) from any reader.
    ///
    /// # Errors
    ///
    /// See [`fit`](Self::fit).
    pub fn fit_reader<R: Read>(&mut self, reader: R) -> Result<MembershipData> {
        let data = self.read_from(reader)?;
        data.require_labels()?;
        self.feature_names = Some(data.feature_names.clone());
        Ok(data)
    }

    /// Reads `path` with features reordered to the fitted order.
    ///
    /// # Errors
    ///
    /// Fails before `fit`, when a fitted feature column is missing, or on
    /// any [`read`](Self::read) error.
    pub fn transform(&self, path: impl AsRef<Path>) -> Result<MembershipData> {
        let file = std::fs::File::open(path.as_ref())?;
        self.transform_reader(file)
    }

    /// [`transform`](Self::transform) from any reader.
    ///
    /// # Errors
    ///
    /// See [`transform`](Self::transform).
    pub fn transform_reader<R: Read>(&self, reader: R) -> Result<MembershipData> {
        let fitted = self
            .feature_names
            .as_ref()
            .ok_or_else(|| EpimlError::not_fitted("LoadCreon"))?;
        let data = self.read_from(reader)?;

        let mut order = Vec::with_capacity(fitted.len());
        for name in fitted {
            let col = data
                .feature_names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| EpimlError::DataFormat {
                    line: 1,
                    column: name.clone(),
                    message: "feature column seen during fit is missing".to_string(),
                })?;
            order.push(col);
        }
        let extra: Vec<&String> = data
            .feature_names
            .iter()
            .filter(|n| !fitted.contains(*n))
            .collect();
        if !extra.is_empty() {
            warn!(columns = ?extra, "ignoring columns not seen during fit");
        }

        let n = data.n_rows();
        let mut values = Vec::with_capacity(n * order.len());
        for row in 0..n {
            values.extend(order.iter().map(|&c| data.x.get(row, c)));
        }
        Ok(MembershipData {
            x: Matrix::from_vec(n, order.len(), values)?,
            feature_names: fitted.clone(),
            ids: data.ids,
            labels: data.labels,
        })
    }
}

impl fmt::Display for LoadCreon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let delimiter = char::from(self.delimiter).escape_default().to_string();
        let repr = Repr::new("LoadCreon")
            .text("delimiter", &delimiter)
            .param("fill_value", py_float(f64::from(self.fill_value)))
            .text("id_column", &self.id_column)
            .text("label_column", &self.label_column);
        write!(f, "{repr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TRAIN: &str = "member_id\tage\tlabel\tvisits\n\
                         m1\t40\t1\t3\n\
                         m2\t31\t0\tNA\n\
                         m3\t\t-1\t7.5\n";

    #[test]
    fn test_fit_records_feature_order_and_fills_missing() {
        let mut lc = LoadCreon::new().with_fill_value(-9.0);
        let data = lc.fit_reader(TRAIN.as_bytes()).unwrap();
        assert_eq!(data.ids, vec!["m1", "m2", "m3"]);
        assert_eq!(data.feature_names, vec!["age", "visits"]);
        assert_eq!(data.labels, Some(vec![1, 0, -1]));
        assert_eq!(data.x.get(1, 1), -9.0);
        assert_eq!(data.x.get(2, 0), -9.0);
        assert_eq!(data.x.get(2, 1), 7.5);
        assert_eq!(lc.feature_names().unwrap(), ["age", "visits"]);
    }

    #[test]
    fn test_transform_reorders_and_drops_extra_columns() {
        let mut lc = LoadCreon::new();
        lc.fit_reader(TRAIN.as_bytes()).unwrap();
        let later = "visits\textra\tmember_id\tage\n2\t9\tm9\t50\n";
        let data = lc.transform_reader(later.as_bytes()).unwrap();
        assert_eq!(data.feature_names, vec!["age", "visits"]);
        assert_eq!(data.x.get(0, 0), 50.0);
        assert_eq!(data.x.get(0, 1), 2.0);
        assert_eq!(data.labels, None);
        assert_eq!(data.ids, vec!["m9"]);
    }

    #[test]
    fn test_duplicate_header_is_an_error() {
        let mut lc = LoadCreon::new();
        lc.fit_reader(TRAIN.as_bytes()).unwrap();
        let later = "member_id\tage\tvisits\tage\nm9\t50\t2\t60\n";
        let err = lc.transform_reader(later.as_bytes()).unwrap_err();
        match err {
            EpimlError::DataFormat { line, column, .. } => {
                assert_eq!(line, 1);
                assert_eq!(column, "age");
            }
            other => panic!("unexpected error: {other}"),
        }
        let dup_id = "member_id\tlabel\tmember_id\nm1\t1\tm2\n";
        assert!(LoadCreon::new().read_from(dup_id.as_bytes()).is_err());
    }

    #[test]
    fn test_transform_missing_feature_is_an_error() {
        let mut lc = LoadCreon::new();
        lc.fit_reader(TRAIN.as_bytes()).unwrap();
        let err = lc
            .transform_reader("member_id\tage\nm1\t3\n".as_bytes())
            .unwrap_err();
        assert!(err.to_string().contains("visits"));
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let lc = LoadCreon::new();
        assert!(matches!(
            lc.transform_reader(TRAIN.as_bytes()),
            Err(EpimlError::NotFitted { .. })
        ));
    }

    #[test]
    fn test_bad_cells_report_line_and_column() {
        let lc = LoadCreon::new();
        let text = "member_id\tlabel\tage\nm1\t1\t3\nm2\t0\tabc\n";
        match lc.read_from(text.as_bytes()) {
            Err(EpimlError::DataFormat { line, column, .. }) => {
                assert_eq!(line, 3);
                assert_eq!(column, "age");
            }
            other => panic!("expected a data format error, got {other:?}"),
        }
        let text = "member_id\tlabel\tage\nm1\t2\t3\n";
        assert!(matches!(
            lc.read_from(text.as_bytes()),
            Err(EpimlError::DataFormat { line: 2, .. })
        ));
    }

    #[test]
    fn test_fit_requires_labels_and_id_column() {
        let mut lc = LoadCreon::new();
        assert!(lc.fit_reader("member_id\tage\nm1\t3\n".as_bytes()).is_err());
        assert!(lc.fit_reader("id\tlabel\tage\nm1\t1\t3\n".as_bytes()).is_err());
        assert!(!lc.is_fitted());
    }

    #[test]
    fn test_custom_delimiter_and_columns_from_file() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "uid,y,f1").expect("write header");
        writeln!(file, "a,1.0,0.5").expect("write row");
        writeln!(file, "b,-1,1.5").expect("write row");
        let mut lc = LoadCreon::new()
            .with_delimiter(b',')
            .with_id_column("uid")
            .with_label_column("y");
        let data = lc.fit(file.path()).unwrap();
        assert_eq!(data.labels, Some(vec![1, -1]));
        assert_eq!(data.x.get(1, 0), 1.5);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let lc = LoadCreon::new();
        assert!(matches!(
            lc.read("/nonexistent/membership.tsv"),
            Err(EpimlError::Io(_))
        ));
    }

    #[test]
    fn test_display_repr() {
        assert_eq!(
            LoadCreon::new().to_string(),
            "LoadCreon(delimiter='\\t', fill_value=0.0, id_column='member_id', label_column='label')"
        );
    }
}
