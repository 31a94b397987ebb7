use std::fs::File;
use std::path::Path;

use symphonia::core::{
    audio::SampleBuffer, codecs::DecoderOptions, errors::Error, formats::FormatOptions,
    io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};
use tracing::debug;

use super::channels::{conform_channels, normalize_peak_in_place};
use super::resample::resample_linear;
use super::AudioError;

/// File extensions the general decode path accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "wave", "aif", "aiff", "flac", "mp3"];

/// True when the path carries one of [`SUPPORTED_EXTENSIONS`].
pub fn is_supported_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// How a file should be turned into samples.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodeOptions {
    /// Target rate; `None` keeps the file's own rate.
    pub sample_rate: Option<u32>,
    pub num_channels: u16,
    pub normalize: bool,
    /// Read WAV directly with no resampling support.
    pub fast_wav: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            sample_rate: Some(16_000),
            num_channels: 1,
            normalize: true,
            fast_wav: false,
        }
    }
}

impl From<&crate::config::DataSettings> for DecodeOptions {
    fn from(data: &crate::config::DataSettings) -> Self {
        Self {
            sample_rate: Some(data.sample_rate),
            num_channels: data.num_channels,
            normalize: data.normalize,
            fast_wav: data.fast_wav,
        }
    }
}

/// Interleaved samples after channel conversion, resampling, and normalization.
#[derive(Clone, Debug)]
pub struct DecodedClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedClip {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_seconds(&self) -> f32 {
        self.frames() as f32 / self.sample_rate.max(1) as f32
    }
}

/// Decode a file according to `options`.
pub fn decode_audio(path: &Path, options: &DecodeOptions) -> Result<DecodedClip, AudioError> {
    let (samples, file_rate, file_channels) = if options.fast_wav {
        read_wav_fast(path, options.sample_rate)?
    } else {
        decode_with_symphonia(path)?
    };
    if samples.is_empty() {
        return Err(AudioError::Empty {
            path: path.to_path_buf(),
        });
    }
    let target_rate = options.sample_rate.unwrap_or(file_rate).max(1);
    let resampled = if target_rate != file_rate {
        debug!(
            "Resampling {} from {file_rate} Hz to {target_rate} Hz",
            path.display()
        );
        resample_linear(&samples, file_channels, file_rate, target_rate)
    } else {
        samples
    };
    let mut samples = conform_channels(resampled, file_channels, options.num_channels)?;
    if options.normalize {
        normalize_peak_in_place(&mut samples);
    }
    Ok(DecodedClip {
        samples,
        sample_rate: target_rate,
        channels: options.num_channels,
    })
}

fn read_wav_fast(
    path: &Path,
    requested_rate: Option<u32>,
) -> Result<(Vec<f32>, u32, u16), AudioError> {
    let reader = hound::WavReader::open(path).map_err(|source| AudioError::Wav {
        path: path.to_path_buf(),
        source,
    })?;
    let spec = reader.spec();
    if let Some(requested) = requested_rate.filter(|rate| *rate != spec.sample_rate) {
        return Err(AudioError::ResampleUnsupported {
            path: path.to_path_buf(),
            found: spec.sample_rate,
            requested,
        });
    }
    let wav_err = |source| AudioError::Wav {
        path: path.to_path_buf(),
        source,
    };
    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|sample| sample.map(|value| value as f32 / 32_768.0))
            .collect::<Result<Vec<_>, _>>()
            .map_err(wav_err)?,
        (hound::SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(wav_err)?,
        (format, bits) => {
            return Err(AudioError::UnsupportedWavFormat {
                path: path.to_path_buf(),
                bits,
                format: match format {
                    hound::SampleFormat::Int => "integer PCM",
                    hound::SampleFormat::Float => "float",
                },
            });
        }
    };
    Ok((samples, spec.sample_rate.max(1), spec.channels.max(1)))
}

fn decode_with_symphonia(path: &Path) -> Result<(Vec<f32>, u32, u16), AudioError> {
    let decode_err = |message: String| AudioError::Decode {
        path: path.to_path_buf(),
        message,
    };
    let file = File::open(path).map_err(|source| AudioError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| decode_err(format!("probe failed: {err}")))?;
    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| decode_err("no default track".to_string()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| decode_err("missing sample rate".to_string()))?;
    let channels = codec_params
        .channels
        .ok_or_else(|| decode_err("missing channel count".to_string()))?
        .count() as u16;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|err| decode_err(format!("no decoder: {err}")))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(_)) => break,
            Err(err) => return Err(decode_err(format!("packet read failed: {err}"))),
        };
        if packet.track_id() != track_id {
            continue;
        }
        let audio_buf = match decoder.decode(&packet) {
            Ok(audio_buf) => audio_buf,
            Err(Error::DecodeError(_)) => continue,
            Err(err) => return Err(decode_err(format!("decode failed: {err}"))),
        };
        let spec = *audio_buf.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(audio_buf.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(audio_buf);
        samples.extend_from_slice(sample_buf.samples());
    }
    Ok((samples, sample_rate.max(1), channels.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use tempfile::TempDir;

    fn write_fixture(
        path: &Path,
        channels: u16,
        sample_rate: u32,
        bits: u16,
        format: SampleFormat,
        frames: usize,
        value: f32,
    ) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: bits,
            sample_format: format,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for _ in 0..frames * channels as usize {
            match (format, bits) {
                (SampleFormat::Float, _) => writer.write_sample(value).unwrap(),
                (SampleFormat::Int, 16) => writer
                    .write_sample((value * i16::MAX as f32) as i16)
                    .unwrap(),
                (SampleFormat::Int, _) => {
                    writer.write_sample((value * 8_000_000.0) as i32).unwrap()
                }
            }
        }
        writer.finalize().unwrap();
    }

    fn options(rate: u32, channels: u16, fast: bool) -> DecodeOptions {
        DecodeOptions {
            sample_rate: Some(rate),
            num_channels: channels,
            normalize: false,
            fast_wav: fast,
        }
    }

    #[test]
    fn fast_path_scales_pcm16() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pcm.wav");
        write_fixture(&path, 1, 16_000, 16, SampleFormat::Int, 100, 0.5);
        let clip = decode_audio(&path, &options(16_000, 1, true)).unwrap();
        assert_eq!(clip.samples.len(), 100);
        assert!((clip.samples[0] - 16_383.0 / 32_768.0).abs() < 1e-6);
    }

    #[test]
    fn fast_path_refuses_to_resample() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rate.wav");
        write_fixture(&path, 1, 22_050, 16, SampleFormat::Int, 100, 0.1);
        let err = decode_audio(&path, &options(16_000, 1, true)).unwrap_err();
        assert!(matches!(
            err,
            AudioError::ResampleUnsupported {
                found: 22_050,
                requested: 16_000,
                ..
            }
        ));
    }

    #[test]
    fn fast_path_rejects_24_bit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deep.wav");
        write_fixture(&path, 1, 16_000, 24, SampleFormat::Int, 10, 0.1);
        let err = decode_audio(&path, &options(16_000, 1, true)).unwrap_err();
        assert!(matches!(err, AudioError::UnsupportedWavFormat { bits: 24, .. }));
    }

    #[test]
    fn general_path_resamples_and_downmixes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stereo.wav");
        write_fixture(&path, 2, 32_000, 32, SampleFormat::Float, 3_200, 0.25);
        let mut opts = options(16_000, 1, false);
        opts.normalize = true;
        let clip = decode_audio(&path, &opts).unwrap();
        assert_eq!(clip.channels, 1);
        assert_eq!(clip.sample_rate, 16_000);
        assert_eq!(clip.frames(), 1_600);
        assert!(clip.samples.iter().all(|v| (v - 1.0).abs() < 1e-5));
    }

    #[test]
    fn empty_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.wav");
        write_fixture(&path, 1, 16_000, 16, SampleFormat::Int, 0, 0.0);
        let err = decode_audio(&path, &options(16_000, 1, true)).unwrap_err();
        assert!(matches!(err, AudioError::Empty { .. }));
    }

    #[test]
    fn supported_extensions_are_case_insensitive() {
        assert!(is_supported_audio(Path::new("a/b/token.WAV")));
        assert!(is_supported_audio(Path::new("x.flac")));
        assert!(!is_supported_audio(Path::new("x.TextGrid")));
        assert!(!is_supported_audio(Path::new("noext")));
    }
}
