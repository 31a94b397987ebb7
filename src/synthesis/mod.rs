//! Klatt-style cascade formant synthesis of sampled VCV parameter tables.

mod klatt;
mod plan;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::audio::{AudioError, normalize_peak_in_place, write_wav};
use crate::config::SynthesisSettings;
use crate::dataset::{DatasetError, MetadataRow, write_metadata};
use crate::sampling::{SamplingError, read_params_table};

pub use klatt::{CASCADE_FORMANTS, Frame, Resonator, Synthesizer};
pub use plan::VcvPlan;

/// Metadata table written next to the synthesized files.
pub const METADATA_FILE: &str = "metadata.csv";

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Cannot read stop and vowel from token name `{0}`")]
    BadName(String),
    #[error("{name}: unknown stop `{stop}`")]
    UnknownStop { name: String, stop: String },
    #[error(transparent)]
    Sampling(#[from] SamplingError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("Failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Render one planned token, peak-normalised to `settings.peak`.
pub fn synthesize(plan: &VcvPlan, settings: &SynthesisSettings, seed: u64) -> Vec<f32> {
    let frames = plan.frames(settings.frame_seconds);
    let mut samples =
        Synthesizer::new(settings.sample_rate, seed).render(&frames, settings.frame_seconds);
    normalize_peak_in_place(&mut samples);
    for sample in &mut samples {
        *sample *= settings.peak;
    }
    samples
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisReport {
    pub written: Vec<PathBuf>,
    pub metadata: PathBuf,
}

/// Write `<Name>.wav` for every row of a parameter table, plus a `FileID,Category` table.
pub fn synthesize_table(
    params_csv: &Path,
    out_dir: &Path,
    settings: &SynthesisSettings,
) -> Result<SynthesisReport, SynthesisError> {
    let rows = read_params_table(params_csv)?;
    std::fs::create_dir_all(out_dir).map_err(|source| SynthesisError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;
    let mut written = Vec::with_capacity(rows.len());
    let mut metadata = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let plan = VcvPlan::from_params(row, settings)?;
        let samples = synthesize(&plan, settings, settings.seed.wrapping_add(index as u64));
        let file_id = format!("{}.wav", row.name);
        let path = out_dir.join(&file_id);
        write_wav(&path, &samples, settings.sample_rate)?;
        debug!("Wrote {} ({:.3} s)", path.display(), plan.duration());
        metadata.push(MetadataRow {
            file_id,
            category: plan.voicing.category().to_string(),
        });
        written.push(path);
    }
    let metadata_path = out_dir.join(METADATA_FILE);
    write_metadata(&metadata_path, &metadata)?;
    info!("Synthesized {} tokens into {}", written.len(), out_dir.display());
    Ok(SynthesisReport {
        written,
        metadata: metadata_path,
    })
}
