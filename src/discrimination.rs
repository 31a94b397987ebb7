//! Representational similarity between stimuli, measured on hidden-layer activations.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::audio::{AudioError, DecodeOptions, decode_audio};
use crate::dataset::first_slice;
use crate::ml::{Classifier, ModelError};

pub const STIMULUS1_COLUMN: &str = "Stimulus1";
pub const STIMULUS2_COLUMN: &str = "Stimulus2";

#[derive(Debug, Error)]
pub enum DiscriminationError {
    #[error("Vectors differ in length ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },
    #[error("Cosine distance is undefined for a zero vector")]
    ZeroNorm,
    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("{path} has no `{column}` column")]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// `1 - a.b / (|a||b|)`, computed in `f64`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f32, DiscriminationError> {
    if a.len() != b.len() {
        return Err(DiscriminationError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return Err(DiscriminationError::ZeroNorm);
    }
    Ok((1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())) as f32)
}

fn load_stimulus(classifier: &Classifier, path: &Path) -> Result<Vec<f32>, DiscriminationError> {
    let options = DecodeOptions::from(&classifier.manifest.data);
    let clip = decode_audio(path, &options)?;
    let arch = &classifier.manifest.architecture;
    Ok(first_slice(&clip.samples, arch.input_channels, arch.slice_len))
}

/// Cosine distance between the activations of `layer` for two stimuli.
pub fn layer_distance(
    classifier: &Classifier,
    layer: &str,
    stimulus1: &Path,
    stimulus2: &Path,
) -> Result<f32, DiscriminationError> {
    let layer_names = classifier.manifest.architecture.layer_names();
    if !layer_names.iter().any(|name| name == layer) {
        return Err(ModelError::UnknownLayer {
            name: layer.to_string(),
            available: layer_names.join(", "),
        }
        .into());
    }
    let mut audio = load_stimulus(classifier, stimulus1)?;
    audio.extend(load_stimulus(classifier, stimulus2)?);
    let activations = classifier.activations(&audio, 2)?;
    let (_, rows) = activations
        .into_iter()
        .find(|(name, _)| name == layer)
        .ok_or_else(|| ModelError::UnknownLayer {
            name: layer.to_string(),
            available: layer_names.join(", "),
        })?;
    match rows.as_slice() {
        [first, second] => cosine_distance(first, second),
        _ => Err(ModelError::Tensor(format!(
            "expected 2 activation rows, got {}",
            rows.len()
        ))
        .into()),
    }
}

/// One compared pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceRow {
    #[serde(rename = "Stimulus1")]
    pub stimulus1: String,
    #[serde(rename = "Stimulus2")]
    pub stimulus2: String,
    #[serde(rename = "Layer")]
    pub layer: String,
    #[serde(rename = "CosineDistance")]
    pub distance: f32,
}

/// Read `Stimulus1,Stimulus2` pairs; relative paths resolve against the table's directory.
pub fn read_pairs(pairs_csv: &Path) -> Result<Vec<(String, String)>, DiscriminationError> {
    let csv_err = |source| DiscriminationError::Csv {
        path: pairs_csv.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(pairs_csv)
        .map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| DiscriminationError::MissingColumn {
                path: pairs_csv.to_path_buf(),
                column: name,
            })
    };
    let first = column(STIMULUS1_COLUMN)?;
    let second = column(STIMULUS2_COLUMN)?;
    let mut pairs = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        if let (Some(a), Some(b)) = (record.get(first), record.get(second)) {
            if !a.is_empty() && !b.is_empty() {
                pairs.push((a.to_string(), b.to_string()));
            }
        }
    }
    Ok(pairs)
}

/// Distances for every pair listed in `pairs_csv` at one layer.
pub fn distance_table(
    classifier: &Classifier,
    layer: &str,
    pairs_csv: &Path,
) -> Result<Vec<DistanceRow>, DiscriminationError> {
    let base = pairs_csv.parent().unwrap_or_else(|| Path::new(""));
    let pairs = read_pairs(pairs_csv)?;
    let mut rows = Vec::with_capacity(pairs.len());
    for (stimulus1, stimulus2) in pairs {
        let distance = layer_distance(
            classifier,
            layer,
            &base.join(&stimulus1),
            &base.join(&stimulus2),
        )?;
        rows.push(DistanceRow {
            stimulus1,
            stimulus2,
            layer: layer.to_string(),
            distance,
        });
    }
    info!("Computed {} distances at layer {layer}", rows.len());
    Ok(rows)
}

pub fn write_distance_table(path: &Path, rows: &[DistanceRow]) -> Result<(), DiscriminationError> {
    let csv_err = |source| DiscriminationError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer
        .flush()
        .map_err(|source| csv_err(csv::Error::from(source)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn cosine_distance_of_known_vectors() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).unwrap().abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 2.0]).unwrap() - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 1.0], &[-1.0, -1.0]).unwrap() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_distance_rejects_bad_input() {
        assert!(matches!(
            cosine_distance(&[1.0], &[1.0, 2.0]),
            Err(DiscriminationError::LengthMismatch { left: 1, right: 2 })
        ));
        assert!(matches!(
            cosine_distance(&[0.0, 0.0], &[1.0, 2.0]),
            Err(DiscriminationError::ZeroNorm)
        ));
    }

    #[test]
    fn pairs_are_read_by_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pairs.csv");
        std::fs::write(&path, "Trial,Stimulus2,Stimulus1\n1,b.wav,a.wav\n2,,c.wav\n").unwrap();
        let pairs = read_pairs(&path).unwrap();
        assert_eq!(pairs, vec![("a.wav".to_string(), "b.wav".to_string())]);
    }
}
