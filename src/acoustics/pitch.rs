use std::f64::consts::PI;

use super::sample_or_zero;

/// Penalty favouring shorter periods among comparable autocorrelation peaks.
const OCTAVE_COST: f64 = 0.01;

/// Autocorrelation pitch search range and voicing decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchSettings {
    pub floor: f32,
    pub ceiling: f32,
    /// Minimum normalized autocorrelation for a voiced frame.
    pub voicing_threshold: f32,
    /// Frames whose local peak is below this share of the global peak are silent.
    pub silence_threshold: f32,
}

impl Default for PitchSettings {
    fn default() -> Self {
        Self {
            floor: 75.0,
            ceiling: 600.0,
            voicing_threshold: 0.45,
            silence_threshold: 0.03,
        }
    }
}

/// Fundamental frequency at `time` seconds, or `None` when the frame is silent, unvoiced,
/// or outside the signal.
///
/// The analysis window spans three periods of the pitch floor. Its Hann-weighted
/// autocorrelation is normalized by the window's own autocorrelation and the best lag is
/// refined by parabolic interpolation.
pub fn pitch_at(samples: &[f32], rate: u32, time: f64, settings: &PitchSettings) -> Option<f32> {
    let rate_f = rate.max(1) as f64;
    let duration = samples.len() as f64 / rate_f;
    if samples.is_empty() || !(0.0..=duration).contains(&time) {
        return None;
    }
    let floor = settings.floor.max(1.0) as f64;
    let ceiling = (settings.ceiling as f64).max(floor + 1.0);
    let window_len = ((3.0 / floor) * rate_f).round() as usize;
    if window_len < 4 {
        return None;
    }
    let start = (time * rate_f).round() as isize - (window_len / 2) as isize;
    let mut frame: Vec<f64> = (0..window_len)
        .map(|i| sample_or_zero(samples, start + i as isize))
        .collect();

    let global_peak = samples
        .iter()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, |m, &v| m.max(v.abs() as f64));
    let local_peak = frame.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if global_peak <= 0.0 || local_peak / global_peak < settings.silence_threshold as f64 {
        return None;
    }

    let mean = frame.iter().sum::<f64>() / window_len as f64;
    let window = hann(window_len);
    for (value, w) in frame.iter_mut().zip(&window) {
        *value = (*value - mean) * w;
    }

    let min_lag = ((rate_f / ceiling).floor() as usize).max(2);
    let max_lag = ((rate_f / floor).ceil() as usize).min(window_len - 2);
    if min_lag + 1 >= max_lag {
        return None;
    }
    let energy = autocorrelation(&frame, 0);
    let window_energy = autocorrelation(&window, 0);
    if energy <= 0.0 || window_energy <= 0.0 {
        return None;
    }
    let normalized: Vec<f64> = (min_lag - 1..=max_lag + 1)
        .map(|lag| {
            let rw = autocorrelation(&window, lag) / window_energy;
            if rw <= 1e-6 {
                0.0
            } else {
                autocorrelation(&frame, lag) / energy / rw
            }
        })
        .collect();

    let mut best: Option<(f64, f64, f64)> = None;
    for i in 1..normalized.len() - 1 {
        let (left, mid, right) = (normalized[i - 1], normalized[i], normalized[i + 1]);
        if mid < left || mid < right {
            continue;
        }
        let denom = left - 2.0 * mid + right;
        let shift = if denom.abs() > 1e-12 {
            (0.5 * (left - right) / denom).clamp(-0.5, 0.5)
        } else {
            0.0
        };
        let lag = (min_lag - 1 + i) as f64 + shift;
        let peak = mid - 0.25 * (left - right) * shift;
        let strength = peak - OCTAVE_COST * (floor * lag / rate_f).log2();
        if best.is_none_or(|(_, _, best_strength)| strength > best_strength) {
            best = Some((lag, peak, strength));
        }
    }
    let (lag, peak, _) = best?;
    if peak < settings.voicing_threshold as f64 {
        return None;
    }
    let f0 = rate_f / lag;
    (floor..=ceiling).contains(&f0).then_some(f0 as f32)
}

fn hann(len: usize) -> Vec<f64> {
    let denom = (len - 1).max(1) as f64;
    (0..len)
        .map(|n| 0.5 * (1.0 - (2.0 * PI * n as f64 / denom).cos()))
        .collect()
}

fn autocorrelation(frame: &[f64], lag: usize) -> f64 {
    frame
        .iter()
        .zip(frame.iter().skip(lag))
        .map(|(a, b)| a * b)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acoustics::test_signals::synthetic_vowel;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    const RATE: u32 = 16_000;

    fn tone(f0: f64, seconds: f64) -> Vec<f32> {
        (0..(seconds * RATE as f64) as usize)
            .map(|n| {
                let t = n as f64 / RATE as f64;
                (0.5 * (2.0 * PI * f0 * t).sin() + 0.25 * (4.0 * PI * f0 * t).sin()) as f32
            })
            .collect()
    }

    #[test]
    fn harmonic_tone_pitch_is_found() {
        let signal = tone(150.0, 0.5);
        let f0 = pitch_at(&signal, RATE, 0.25, &PitchSettings::default()).unwrap();
        assert!((f0 - 150.0).abs() < 1.5, "got {f0}");
    }

    #[test]
    fn synthetic_vowel_pitch_is_found() {
        let signal = synthetic_vowel(RATE, 0.4, 120.0, &[(700.0, 80.0), (1200.0, 90.0)]);
        let f0 = pitch_at(&signal, RATE, 0.2, &PitchSettings::default()).unwrap();
        assert!((f0 - 120.0).abs() < 2.0, "got {f0}");
    }

    #[test]
    fn silence_and_noise_are_unvoiced() {
        let silent = vec![0.0_f32; 8_000];
        assert_eq!(pitch_at(&silent, RATE, 0.25, &PitchSettings::default()), None);

        let mut rng = StdRng::seed_from_u64(3);
        let noise: Vec<f32> = (0..8_000).map(|_| rng.random_range(-0.5..0.5)).collect();
        assert_eq!(pitch_at(&noise, RATE, 0.25, &PitchSettings::default()), None);
    }

    #[test]
    fn quiet_frame_next_to_loud_one_is_silent() {
        let mut signal = tone(200.0, 0.5);
        for sample in &mut signal[..4_000] {
            *sample *= 0.001;
        }
        assert_eq!(pitch_at(&signal, RATE, 0.1, &PitchSettings::default()), None);
        assert!(pitch_at(&signal, RATE, 0.4, &PitchSettings::default()).is_some());
    }

    #[test]
    fn time_outside_signal_is_none() {
        let signal = tone(150.0, 0.2);
        assert_eq!(pitch_at(&signal, RATE, 0.5, &PitchSettings::default()), None);
    }
}
