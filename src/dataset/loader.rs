//! Directory loader turning labeled audio files into fixed-length training examples.

use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::audio::{DecodeOptions, decode_audio, is_supported_audio};
use crate::config::DataSettings;

use super::{CategoryEncoder, DatasetError, read_labels};

/// One decoded clip with its class.
#[derive(Debug, Clone)]
pub struct Example {
    /// File name used as the label key.
    pub file_id: String,
    /// Channel-major `[channels, slice_len]` samples.
    pub audio: Vec<f32>,
    pub class_index: usize,
}

/// A batch in the layout the network consumes.
#[derive(Debug, Clone)]
pub struct Batch {
    pub file_ids: Vec<String>,
    /// Flat `[len, channels, slice_len]`.
    pub audio: Vec<f32>,
    pub class_indices: Vec<usize>,
    /// Flat `[len, num_classes]` one-hot rows.
    pub targets: Vec<f32>,
    pub channels: usize,
    pub slice_len: usize,
    pub num_classes: usize,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.file_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file_ids.is_empty()
    }
}

/// Decoded examples plus the encoder that maps their categories.
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    pub examples: Vec<Example>,
    pub encoder: CategoryEncoder,
    pub channels: usize,
    pub slice_len: usize,
}

impl LabeledDataset {
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Split into batches, optionally shuffled with a seeded RNG. The last batch may be short.
    pub fn batches(&self, batch_size: usize, shuffle: bool, seed: u64) -> Vec<Batch> {
        let mut order: Vec<usize> = (0..self.examples.len()).collect();
        if shuffle {
            let mut rng = StdRng::seed_from_u64(seed);
            order.shuffle(&mut rng);
        }
        order
            .chunks(batch_size.max(1))
            .map(|chunk| self.collect_batch(chunk))
            .collect()
    }

    fn collect_batch(&self, indices: &[usize]) -> Batch {
        let num_classes = self.encoder.len();
        let frame = self.channels * self.slice_len;
        let mut batch = Batch {
            file_ids: Vec::with_capacity(indices.len()),
            audio: Vec::with_capacity(indices.len() * frame),
            class_indices: Vec::with_capacity(indices.len()),
            targets: vec![0.0; indices.len() * num_classes],
            channels: self.channels,
            slice_len: self.slice_len,
            num_classes,
        };
        for (row, &index) in indices.iter().enumerate() {
            let example = &self.examples[index];
            batch.file_ids.push(example.file_id.clone());
            batch.audio.extend_from_slice(&example.audio);
            batch.class_indices.push(example.class_index);
            batch.targets[row * num_classes + example.class_index] = 1.0;
        }
        batch
    }

    /// Deterministically move roughly `fraction` of the examples into a validation set.
    ///
    /// Membership is decided by hashing the file id, so it is stable across runs.
    pub fn split_validation(self, fraction: f32) -> (LabeledDataset, LabeledDataset) {
        let fraction = fraction.clamp(0.0, 1.0);
        let mut train = Vec::new();
        let mut validation = Vec::new();
        for example in self.examples {
            if fraction > 0.0 && split_u01(&example.file_id) < fraction {
                validation.push(example);
            } else {
                train.push(example);
            }
        }
        if fraction > 0.0 && validation.is_empty() && train.len() > 1 {
            if let Some(example) = train.pop() {
                validation.push(example);
            }
        }
        let make = |examples| LabeledDataset {
            examples,
            encoder: self.encoder.clone(),
            channels: self.channels,
            slice_len: self.slice_len,
        };
        (make(train), make(validation))
    }
}

fn split_u01(value: &str) -> f32 {
    let hash = blake3::hash(value.as_bytes());
    let bytes = hash.as_bytes();
    let raw = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    raw as f32 / u32::MAX as f32
}

/// Supported audio files directly inside `dir`, sorted by path.
pub fn list_audio_files(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let io_err = |source| DatasetError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && is_supported_audio(&path) {
            files.push(path);
        } else {
            debug!("Skipping non-audio entry {}", path.display());
        }
    }
    files.sort();
    Ok(files)
}

/// The first `slice_len` frames of interleaved audio, zero-padded at the end and laid out
/// channel-major.
pub fn first_slice(samples: &[f32], channels: usize, slice_len: usize) -> Vec<f32> {
    let channels = channels.max(1);
    let mut out = vec![0.0; channels * slice_len];
    for (frame_index, frame) in samples.chunks_exact(channels).take(slice_len).enumerate() {
        for (channel, &sample) in frame.iter().enumerate() {
            out[channel * slice_len + frame_index] = sample;
        }
    }
    out
}

fn file_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Decode every audio file in `dir` and attach its category from `labels_csv`.
pub fn load_dataset(
    dir: &Path,
    labels_csv: &Path,
    data: &DataSettings,
) -> Result<LabeledDataset, DatasetError> {
    let labels = read_labels(labels_csv)?;
    let encoder = CategoryEncoder::new(labels.values().cloned())?;
    let files = list_audio_files(dir)?;
    if files.is_empty() {
        return Err(DatasetError::NoAudio(dir.to_path_buf()));
    }
    let options = DecodeOptions::from(data);
    let channels = data.num_channels as usize;
    let mut examples = Vec::with_capacity(files.len());
    for path in &files {
        let file_id = file_id(path);
        let category = labels
            .get(&file_id)
            .ok_or_else(|| DatasetError::MissingLabel {
                file_id: file_id.clone(),
                labels: labels_csv.to_path_buf(),
            })?;
        let clip = decode_audio(path, &options)?;
        examples.push(Example {
            audio: first_slice(&clip.samples, channels, data.slice_len),
            class_index: encoder.index_of(category)?,
            file_id,
        });
    }
    info!(
        "Loaded {} examples from {} ({} categories)",
        examples.len(),
        dir.display(),
        encoder.len()
    );
    Ok(LabeledDataset {
        examples,
        encoder,
        channels,
        slice_len: data.slice_len,
    })
}
