//! Library exports for the command-line tool, benchmarks and tests.
/// Per-user application directories.
pub mod app_dirs;
/// Tracing subscriber setup.
pub mod logging;
/// Persisted TOML settings.
pub mod config;
/// Audio decoding, resampling and WAV output.
pub mod audio;
/// Labeled clip loading, batching and label tables.
pub mod dataset;
/// Waveform CNN classifier, training and inference.
pub mod ml;
/// Cosine distances between hidden-layer activations.
pub mod discrimination;
/// Praat TextGrid reader.
pub mod textgrid;
/// Pitch and formant point measurements.
pub mod acoustics;
/// VCV token measurement.
pub mod vcv;
/// Synthetic parameter sampling.
pub mod sampling;
/// Formant synthesis of parameter tables.
pub mod synthesis;
/// Distribution summaries of parameter tables.
pub mod summary;
