//! Labeled audio datasets: label tables, category encoding, slicing, and batching.

mod encoder;
mod labels;
pub mod loader;
pub mod metadata;

use std::path::PathBuf;

use thiserror::Error;

use crate::audio::AudioError;

pub use encoder::CategoryEncoder;
pub use labels::{CATEGORY_COLUMN, FILE_ID_COLUMN, read_labels};
pub use loader::{Batch, Example, LabeledDataset, first_slice, list_audio_files, load_dataset};
pub use metadata::{MetadataRow, build_metadata, write_metadata};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("{path} has no `{column}` column")]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("Need at least 2 categories, found {found}")]
    TooFewCategories { found: usize },
    #[error("Unknown category `{0}`")]
    UnknownCategory(String),
    #[error("Vector is not a one-hot encoding of a known category")]
    NotOneHot,
    #[error("No label for `{file_id}` in {labels}")]
    MissingLabel { file_id: String, labels: PathBuf },
    #[error("No audio files found in {0}")]
    NoAudio(PathBuf),
    #[error(transparent)]
    Audio(#[from] AudioError),
}
