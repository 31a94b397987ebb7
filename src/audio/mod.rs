//! Audio decoding into `f32` sample vectors and WAV output.
//!
//! Two decode paths exist: a plain WAV reader for standard 16-bit PCM or 32-bit float files
//! (no resampling), and a general path that probes any supported container and resamples to
//! the requested rate.

mod channels;
mod decode;
mod resample;
mod wav;

use std::path::PathBuf;

use thiserror::Error;

pub use channels::{conform_channels, normalize_peak_in_place};
pub use decode::{
    DecodeOptions, DecodedClip, SUPPORTED_EXTENSIONS, decode_audio, is_supported_audio,
};
pub use resample::resample_linear;
pub use wav::write_wav;

/// Errors raised while decoding or writing audio.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("WAV read failed for {path}: {source}")]
    Wav {
        path: PathBuf,
        source: hound::Error,
    },
    #[error("Decode failed for {path}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("{path} is {bits}-bit {format}; the fast WAV path reads 16-bit PCM or 32-bit float")]
    UnsupportedWavFormat {
        path: PathBuf,
        bits: u16,
        format: &'static str,
    },
    #[error("{path} is sampled at {found} Hz; the fast WAV path cannot resample to {requested} Hz")]
    ResampleUnsupported {
        path: PathBuf,
        found: u32,
        requested: u32,
    },
    #[error("Cannot convert {found} channels to {requested}")]
    ChannelMismatch { found: u16, requested: u16 },
    #[error("{path} decoded to zero samples")]
    Empty { path: PathBuf },
    #[error("WAV write failed for {path}: {source}")]
    Write {
        path: PathBuf,
        source: hound::Error,
    },
}
