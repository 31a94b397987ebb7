//! Model directories: `model.mpk` weights plus a `manifest.json` sidecar.

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{BackendChoice, DataSettings};

use super::backend::{CpuDevice, resolve_backend, wgpu_device};
use super::classifier::{Classifier, ClassifierInner};
use super::cnn::{WaveCnn, WaveCnnConfig};
use super::ModelError;

pub const MANIFEST_FORMAT_VERSION: u32 = 1;
pub const MANIFEST_FILE: &str = "manifest.json";
/// Recorder file stem; the recorder appends `.mpk`.
pub const WEIGHTS_STEM: &str = "model";

/// Everything needed to rebuild a classifier besides its weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub format_version: u32,
    /// Categories in encoder order; index `i` is output unit `i`.
    pub categories: Vec<String>,
    pub architecture: WaveCnnConfig,
    /// Decoding and slicing used in training; inference repeats it.
    pub data: DataSettings,
    pub epochs: usize,
    pub final_loss: Option<f32>,
}

type WeightsRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Write weights and manifest into `dir`, creating it if needed.
pub fn save_model(classifier: &Classifier, dir: &Path) -> Result<(), ModelError> {
    std::fs::create_dir_all(dir).map_err(|source| ModelError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let weights = dir.join(WEIGHTS_STEM);
    match &classifier.inner {
        ClassifierInner::Cpu { model, .. } => save_weights(model, &weights)?,
        ClassifierInner::Wgpu { model, .. } => save_weights(model, &weights)?,
    }
    let manifest_path = dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&classifier.manifest).map_err(|source| {
        ModelError::Manifest {
            path: manifest_path.clone(),
            source,
        }
    })?;
    std::fs::write(&manifest_path, json).map_err(|source| ModelError::Io {
        path: manifest_path.clone(),
        source,
    })?;
    info!("Saved model to {}", dir.display());
    Ok(())
}

/// Rebuild the architecture described by `dir/manifest.json` and load its weights.
pub fn load_model(dir: &Path, backend: BackendChoice) -> Result<Classifier, ModelError> {
    let manifest = read_manifest(&dir.join(MANIFEST_FILE))?;
    let weights = dir.join(WEIGHTS_STEM);
    let inner = match resolve_backend(backend) {
        BackendChoice::Cpu => {
            let device = CpuDevice::default();
            let model = load_weights(&manifest.architecture, &weights, &device)?;
            ClassifierInner::Cpu { model, device }
        }
        BackendChoice::Wgpu => {
            let device = wgpu_device();
            let model = load_weights(&manifest.architecture, &weights, &device)?;
            ClassifierInner::Wgpu { model, device }
        }
    };
    info!(
        "Loaded model from {} ({} categories)",
        dir.display(),
        manifest.categories.len()
    );
    Ok(Classifier { inner, manifest })
}

pub fn read_manifest(path: &Path) -> Result<ModelManifest, ModelError> {
    let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let manifest: ModelManifest =
        serde_json::from_str(&text).map_err(|source| ModelError::Manifest {
            path: path.to_path_buf(),
            source,
        })?;
    if manifest.format_version != MANIFEST_FORMAT_VERSION {
        return Err(ModelError::ManifestVersion {
            path: path.to_path_buf(),
            found: manifest.format_version,
        });
    }
    Ok(manifest)
}

fn save_weights<B: Backend>(model: &WaveCnn<B>, path: &Path) -> Result<(), ModelError> {
    model
        .clone()
        .save_file(path.to_path_buf(), &WeightsRecorder::new())
        .map_err(|err| record_error(path, err))
}

fn load_weights<B: Backend>(
    config: &WaveCnnConfig,
    path: &Path,
    device: &B::Device,
) -> Result<WaveCnn<B>, ModelError> {
    config
        .init::<B>(device)
        .load_file(path.to_path_buf(), &WeightsRecorder::new(), device)
        .map_err(|err| record_error(path, err))
}

fn record_error(path: &Path, err: impl std::fmt::Debug) -> ModelError {
    ModelError::Record {
        path: PathBuf::from(path),
        message: format!("{err:?}"),
    }
}
