use std::f64::consts::PI;

use super::lpc::{burg, prediction_roots};
use super::sample_or_zero;

/// Zero crossings on each side of the interpolation kernel.
const SINC_HALF_WIDTH: f64 = 12.0;
/// Minimum distance of a formant from 0 Hz and from the analysis ceiling.
const EDGE_MARGIN_HZ: f64 = 50.0;

/// Burg formant analysis settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FormantSettings {
    pub max_formants: usize,
    /// Ceiling of the analysis band; the signal is resampled to twice this rate.
    pub max_formant_hz: f32,
    /// Effective window length in seconds; the Gaussian window spans twice this.
    pub window: f32,
    /// Pre-emphasis corner frequency in Hz.
    pub pre_emphasis_from: f32,
}

impl Default for FormantSettings {
    fn default() -> Self {
        Self {
            max_formants: 5,
            max_formant_hz: 5_500.0,
            window: 0.025,
            pre_emphasis_from: 50.0,
        }
    }
}

/// Formant frequencies and bandwidths in ascending frequency order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Formants {
    pub frequencies: Vec<f32>,
    pub bandwidths: Vec<f32>,
}

impl Formants {
    /// Frequency of formant `number` (1-based).
    pub fn get(&self, number: usize) -> Option<f32> {
        number
            .checked_sub(1)
            .and_then(|index| self.frequencies.get(index))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

/// Formants of the frame centred on `time` seconds.
pub fn formants_at(samples: &[f32], rate: u32, time: f64, settings: &FormantSettings) -> Formants {
    let rate_f = rate.max(1) as f64;
    let duration = samples.len() as f64 / rate_f;
    if samples.is_empty() || !(0.0..=duration).contains(&time) {
        return Formants::default();
    }
    let max_formant = (settings.max_formant_hz as f64).min(rate_f / 2.0);
    let analysis_rate = 2.0 * max_formant;
    let window_seconds = 2.0 * settings.window.max(0.001) as f64;
    let frame_len = (window_seconds * analysis_rate).round() as usize;
    let order = 2 * settings.max_formants.max(1);
    if frame_len <= order + 1 {
        return Formants::default();
    }

    // One extra sample in front feeds the pre-emphasis filter.
    let start = time - window_seconds / 2.0 - 1.0 / analysis_rate;
    let mut frame = resample_segment(samples, rate_f, start, frame_len + 1, analysis_rate);
    let alpha = (-2.0 * PI * settings.pre_emphasis_from as f64 / analysis_rate).exp();
    for i in (1..frame.len()).rev() {
        frame[i] -= alpha * frame[i - 1];
    }
    frame.remove(0);
    for (value, w) in frame.iter_mut().zip(gaussian_window(frame_len)) {
        *value *= w;
    }

    let Some(coeffs) = burg(&frame, order) else {
        return Formants::default();
    };
    let mut found: Vec<(f64, f64)> = prediction_roots(&coeffs)
        .into_iter()
        .filter(|root| root.im > 0.0)
        .map(|root| {
            let frequency = root.arg() * analysis_rate / (2.0 * PI);
            let bandwidth = -root.norm().max(1e-12).ln() * analysis_rate / PI;
            (frequency, bandwidth)
        })
        .filter(|(frequency, _)| {
            *frequency >= EDGE_MARGIN_HZ && *frequency <= max_formant - EDGE_MARGIN_HZ
        })
        .collect();
    found.sort_by(|a, b| a.0.total_cmp(&b.0));
    found.truncate(settings.max_formants);
    Formants {
        frequencies: found.iter().map(|(f, _)| *f as f32).collect(),
        bandwidths: found.iter().map(|(_, b)| *b as f32).collect(),
    }
}

/// `count` samples at `new_rate` starting at `start` seconds, by windowed-sinc interpolation
/// with an anti-aliasing cutoff when downsampling.
fn resample_segment(
    samples: &[f32],
    rate: f64,
    start: f64,
    count: usize,
    new_rate: f64,
) -> Vec<f64> {
    let scale = (new_rate / rate).min(1.0);
    let reach = SINC_HALF_WIDTH / scale;
    (0..count)
        .map(|n| {
            let position = (start + n as f64 / new_rate) * rate;
            let first = (position - reach).ceil() as isize;
            let last = (position + reach).floor() as isize;
            (first..=last)
                .map(|k| {
                    let x = position - k as f64;
                    let taper = 0.5 + 0.5 * (PI * x / reach).cos();
                    sample_or_zero(samples, k) * scale * sinc(scale * x) * taper
                })
                .sum()
        })
        .collect()
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

fn gaussian_window(len: usize) -> impl Iterator<Item = f64> {
    let edge = (-12.0_f64).exp();
    let denom = len.max(1) as f64;
    (0..len).map(move |n| {
        let x = (n as f64 + 0.5) / denom - 0.5;
        ((-48.0 * x * x).exp() - edge) / (1.0 - edge)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acoustics::test_signals::synthetic_vowel;

    const RATE: u32 = 16_000;

    #[test]
    fn synthetic_vowel_formants_are_recovered() {
        let targets = [
            (700.0, 60.0),
            (1_220.0, 70.0),
            (2_600.0, 110.0),
            (3_300.0, 150.0),
            (4_500.0, 200.0),
        ];
        let signal = synthetic_vowel(RATE, 0.5, 100.0, &targets);
        let formants = formants_at(&signal, RATE, 0.25, &FormantSettings::default());
        let f1 = formants.get(1).unwrap();
        let f2 = formants.get(2).unwrap();
        assert!((f1 - 700.0).abs() < 100.0, "F1 {f1} in {formants:?}");
        assert!((f2 - 1_220.0).abs() < 150.0, "F2 {f2} in {formants:?}");
        assert!(formants.frequencies.windows(2).all(|w| w[0] <= w[1]));
        assert!(formants.len() <= 5);
    }

    #[test]
    fn silence_has_no_formants() {
        let formants = formants_at(&vec![0.0; 8_000], RATE, 0.25, &FormantSettings::default());
        assert!(formants.is_empty());
        assert_eq!(formants.get(1), None);
        assert_eq!(formants.get(0), None);
    }

    #[test]
    fn resampling_preserves_a_low_tone() {
        let tone: Vec<f32> = (0..1_600)
            .map(|n| (2.0 * PI * 200.0 * n as f64 / RATE as f64).sin() as f32)
            .collect();
        let out = resample_segment(&tone, RATE as f64, 0.03, 100, 11_000.0);
        for (n, value) in out.iter().enumerate() {
            let t = 0.03 + n as f64 / 11_000.0;
            assert!((value - (2.0 * PI * 200.0 * t).sin()).abs() < 0.02);
        }
    }
}
