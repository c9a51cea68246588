//! Model file format.
//!
//! ```text
//! "EPML" | major u8 | minor u8 | metadata len u32 LE | metadata (JSON)
//!        | payload len u32 LE | payload (bincode) | CRC32 u32 LE
//! ```
//!
//! The checksum covers every preceding byte. Metadata can be read without
//! decoding the payload, which is what `epiml inspect` does.

use crate::error::{EpimlError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

/// File magic.
pub const MAGIC: [u8; 4] = *b"EPML";

/// Current format version `(major, minor)`.
pub const FORMAT_VERSION: (u8, u8) = (1, 0);

const PREAMBLE: usize = MAGIC.len() + 2;

/// Descriptive header stored alongside the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model kind, checked on load
    pub model_type: String,
    /// Estimator repr at save time
    pub repr: String,
    /// RFC 3339 save timestamp
    pub created_at: String,
    /// Number of input features
    pub n_features: usize,
    /// Input feature names, in order
    pub feature_names: Vec<String>,
    /// Version of the crate that wrote the file
    pub epiml_version: String,
}

impl ModelMetadata {
    /// Metadata stamped with the current time and crate version.
    #[must_use]
    pub fn new(model_type: &str, repr: String, feature_names: Vec<String>) -> Self {
        Self {
            model_type: model_type.to_string(),
            repr,
            created_at: chrono::Utc::now().to_rfc3339(),
            n_features: feature_names.len(),
            feature_names,
            epiml_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

fn format_error(message: impl Into<String>) -> EpimlError {
    EpimlError::FormatError {
        message: message.into(),
    }
}

fn push_section(content: &mut Vec<u8>, section: &[u8]) -> Result<()> {
    let len = u32::try_from(section.len())
        .map_err(|_| format_error(format!("section of {} bytes is too large", section.len())))?;
    content.extend_from_slice(&len.to_le_bytes());
    content.extend_from_slice(section);
    Ok(())
}

/// Reads a length-prefixed section starting at `*pos`.
fn take_section<'a>(body: &'a [u8], pos: &mut usize, name: &str) -> Result<&'a [u8]> {
    let len_end = *pos + 4;
    let len_bytes = body
        .get(*pos..len_end)
        .ok_or_else(|| format_error(format!("truncated {name} length")))?;
    let len =
        u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
    let section = body
        .get(len_end..len_end + len)
        .ok_or_else(|| format_error(format!("{name} extends beyond end of file")))?;
    *pos = len_end + len;
    Ok(section)
}

/// Encodes a model and its metadata.
///
/// # Errors
///
/// Returns serialization errors.
pub fn to_bytes<M: Serialize>(model: &M, metadata: &ModelMetadata) -> Result<Vec<u8>> {
    let metadata_bytes = serde_json::to_vec(metadata)
        .map_err(|e| EpimlError::Serialization(format!("Failed to serialize metadata: {e}")))?;
    let payload = bincode::serialize(model)
        .map_err(|e| EpimlError::Serialization(format!("Failed to serialize model: {e}")))?;

    let mut content = Vec::with_capacity(PREAMBLE + 12 + metadata_bytes.len() + payload.len());
    content.extend_from_slice(&MAGIC);
    content.extend_from_slice(&[FORMAT_VERSION.0, FORMAT_VERSION.1]);
    push_section(&mut content, &metadata_bytes)?;
    push_section(&mut content, &payload)?;
    let checksum = crc32fast::hash(&content);
    content.extend_from_slice(&checksum.to_le_bytes());
    Ok(content)
}

/// Verifies framing and checksum; returns metadata and raw payload.
fn split(data: &[u8]) -> Result<(ModelMetadata, &[u8])> {
    if data.len() < PREAMBLE + 12 {
        return Err(format_error(format!("File too small: {} bytes", data.len())));
    }
    if data[..MAGIC.len()] != MAGIC {
        return Err(format_error("not an epiml model file (bad magic)"));
    }
    let version = (data[4], data[5]);
    if version.0 != FORMAT_VERSION.0 || version.1 > FORMAT_VERSION.1 {
        return Err(EpimlError::UnsupportedVersion {
            found: version,
            supported: FORMAT_VERSION,
        });
    }

    let (body, tail) = data.split_at(data.len() - 4);
    let stored = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
    let computed = crc32fast::hash(body);
    if stored != computed {
        return Err(EpimlError::ChecksumMismatch {
            expected: stored,
            actual: computed,
        });
    }

    let mut pos = PREAMBLE;
    let metadata_bytes = take_section(body, &mut pos, "metadata")?;
    let payload = take_section(body, &mut pos, "payload")?;
    if pos != body.len() {
        return Err(format_error(format!(
            "{} trailing bytes after payload",
            body.len() - pos
        )));
    }
    let metadata = serde_json::from_slice(metadata_bytes)
        .map_err(|e| EpimlError::Serialization(format!("Failed to parse metadata: {e}")))?;
    Ok((metadata, payload))
}

/// Decodes a model, checking its type.
///
/// # Errors
///
/// Returns format, version, checksum and type errors.
pub fn from_bytes<M: DeserializeOwned>(
    data: &[u8],
    expected_type: &str,
) -> Result<(ModelMetadata, M)> {
    let (metadata, payload) = split(data)?;
    if metadata.model_type != expected_type {
        return Err(format_error(format!(
            "Model type mismatch: file contains {}, expected {expected_type}",
            metadata.model_type
        )));
    }
    let model = bincode::deserialize(payload)
        .map_err(|e| EpimlError::Serialization(format!("Failed to deserialize model: {e}")))?;
    Ok((metadata, model))
}

/// Writes a model file.
///
/// # Errors
///
/// Returns serialization and I/O errors.
pub fn save<M: Serialize>(
    model: &M,
    metadata: &ModelMetadata,
    path: impl AsRef<Path>,
) -> Result<()> {
    let content = to_bytes(model, metadata)?;
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&content)?;
    writer.flush()?;
    Ok(())
}

fn read_all(path: &Path) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    File::open(path)?.read_to_end(&mut content)?;
    Ok(content)
}

/// Reads a model file.
///
/// # Errors
///
/// See [`from_bytes`].
pub fn load<M: DeserializeOwned>(
    path: impl AsRef<Path>,
    expected_type: &str,
) -> Result<(ModelMetadata, M)> {
    from_bytes(&read_all(path.as_ref())?, expected_type)
}

/// Reads only the metadata of a model file (the checksum is still verified).
///
/// # Errors
///
/// Returns I/O, format, version and checksum errors.
pub fn read_metadata(path: impl AsRef<Path>) -> Result<ModelMetadata> {
    let content = read_all(path.as_ref())?;
    Ok(split(&content)?.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Toy {
        weights: Vec<f32>,
        depth: Option<usize>,
    }

    fn toy() -> (Toy, ModelMetadata) {
        let model = Toy {
            weights: vec![0.5, -1.25],
            depth: Some(3),
        };
        let meta = ModelMetadata::new("Toy", "Toy(depth=3)".into(), vec!["a".into(), "b".into()]);
        (model, meta)
    }

    #[test]
    fn test_bytes_round_trip() {
        let (model, meta) = toy();
        let bytes = to_bytes(&model, &meta).unwrap();
        assert_eq!(&bytes[..4], b"EPML");
        let (meta2, model2): (ModelMetadata, Toy) = from_bytes(&bytes, "Toy").unwrap();
        assert_eq!(model2, model);
        assert_eq!(meta2, meta);
        assert_eq!(meta2.n_features, 2);
    }

    #[test]
    fn test_corruption_is_detected() {
        let (model, meta) = toy();
        let mut bytes = to_bytes(&model, &meta).unwrap();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;
        assert!(matches!(
            from_bytes::<Toy>(&bytes, "Toy"),
            Err(EpimlError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_bad_magic_version_and_type() {
        let (model, meta) = toy();
        let bytes = to_bytes(&model, &meta).unwrap();

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(matches!(
            from_bytes::<Toy>(&bad_magic, "Toy"),
            Err(EpimlError::FormatError { .. })
        ));

        let mut newer = bytes.clone();
        newer[4] = FORMAT_VERSION.0 + 1;
        assert!(matches!(
            from_bytes::<Toy>(&newer, "Toy"),
            Err(EpimlError::UnsupportedVersion { .. })
        ));

        assert!(from_bytes::<Toy>(&bytes, "Other").is_err());
        assert!(from_bytes::<Toy>(&bytes[..8], "Toy").is_err());
    }

    #[test]
    fn test_file_round_trip_and_metadata_only_read() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("toy.epml");
        let (model, meta) = toy();
        save(&model, &meta, &path).unwrap();
        assert_eq!(read_metadata(&path).unwrap().repr, "Toy(depth=3)");
        let (_, loaded): (ModelMetadata, Toy) = load(&path, "Toy").unwrap();
        assert_eq!(loaded, model);
    }
}
