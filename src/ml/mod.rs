//! Waveform classifier: architecture, training, checkpoints, and inference.
//!
//! Training runs on an autodiff backend chosen by [`backend::resolve_backend`]; the trained
//! network is kept as a [`Classifier`] on the matching inference backend.

pub mod backend;
pub mod checkpoint;
mod classifier;
pub mod cnn;
pub mod metrics;
pub mod predict;
pub mod train;

use std::path::PathBuf;

use thiserror::Error;

use crate::audio::AudioError;
use crate::dataset::DatasetError;

pub use checkpoint::{ModelManifest, load_model, save_model};
pub use classifier::Classifier;
pub use cnn::{WaveCnn, WaveCnnConfig};
pub use predict::{EvaluationReport, Prediction, evaluate, predict_dir, write_predictions};
pub use train::{EpochStats, TrainReport, train_model};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("No training examples")]
    EmptyTraining,
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Unsupported manifest version {found} in {path}")]
    ManifestVersion { path: PathBuf, found: u32 },
    #[error("Weights at {path} could not be stored or loaded: {message}")]
    Record { path: PathBuf, message: String },
    #[error("Failed to read tensor output: {0}")]
    Tensor(String),
    #[error("Input holds {found} values, expected {expected}")]
    InputShape { expected: usize, found: usize },
    #[error("Unknown layer `{name}`; available layers: {available}")]
    UnknownLayer { name: String, available: String },
    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}
