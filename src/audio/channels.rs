use super::AudioError;

/// Convert interleaved samples from `found` to `requested` channels.
///
/// Mono output averages every channel; mono input is duplicated for stereo output.
pub fn conform_channels(
    samples: Vec<f32>,
    found: u16,
    requested: u16,
) -> Result<Vec<f32>, AudioError> {
    let found = found.max(1);
    if found == requested {
        return Ok(samples);
    }
    match (found, requested) {
        (_, 1) => Ok(downmix_to_mono(&samples, found)),
        (1, 2) => Ok(samples.iter().flat_map(|&sample| [sample, sample]).collect()),
        _ => Err(AudioError::ChannelMismatch { found, requested }),
    }
}

fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels as usize;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().copied().map(sanitize_sample).sum::<f32>() / channels as f32)
        .collect()
}

fn sanitize_sample(sample: f32) -> f32 {
    if sample.is_finite() { sample } else { 0.0 }
}

/// Scale samples so the absolute peak becomes 1.0. Silent input is left untouched.
pub fn normalize_peak_in_place(samples: &mut [f32]) {
    let peak = samples
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .map(f32::abs)
        .fold(0.0_f32, f32::max);
    if peak <= 0.0 {
        return;
    }
    let gain = 1.0 / peak;
    for sample in samples {
        *sample = if sample.is_finite() { *sample * gain } else { 0.0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_is_averaged_to_mono() {
        let mono = conform_channels(vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2, 1).unwrap();
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn mono_is_duplicated_to_stereo() {
        let stereo = conform_channels(vec![0.25, -0.5], 1, 2).unwrap();
        assert_eq!(stereo, vec![0.25, 0.25, -0.5, -0.5]);
    }

    #[test]
    fn unsupported_channel_conversion_is_rejected() {
        let err = conform_channels(vec![0.0; 12], 3, 2).unwrap_err();
        assert!(matches!(
            err,
            AudioError::ChannelMismatch {
                found: 3,
                requested: 2
            }
        ));
    }

    #[test]
    fn peak_normalization_scales_to_unit_and_skips_silence() {
        let mut samples = vec![0.1, -0.4, 0.2];
        normalize_peak_in_place(&mut samples);
        assert!((samples[1] + 1.0).abs() < 1e-6);
        assert!((samples[0] - 0.25).abs() < 1e-6);

        let mut silent = vec![0.0; 4];
        normalize_peak_in_place(&mut silent);
        assert!(silent.iter().all(|v| *v == 0.0));
    }
}
