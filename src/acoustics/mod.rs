//! Point measurements of fundamental frequency and formants on mono signals.

mod formants;
mod lpc;
mod pitch;

pub use formants::{FormantSettings, Formants, formants_at};
pub use pitch::{PitchSettings, pitch_at};

use crate::config::MeasurementSettings;

impl From<&MeasurementSettings> for PitchSettings {
    fn from(settings: &MeasurementSettings) -> Self {
        Self {
            floor: settings.pitch_floor,
            ceiling: settings.pitch_ceiling,
            voicing_threshold: settings.voicing_threshold,
            silence_threshold: settings.silence_threshold,
        }
    }
}

impl From<&MeasurementSettings> for FormantSettings {
    fn from(settings: &MeasurementSettings) -> Self {
        Self {
            max_formants: settings.max_formants,
            max_formant_hz: settings.max_formant_hz,
            window: settings.formant_window,
            pre_emphasis_from: settings.pre_emphasis_from,
        }
    }
}

/// Sample at a fractional index, zero outside the signal.
fn sample_or_zero(samples: &[f32], index: isize) -> f64 {
    if index < 0 {
        return 0.0;
    }
    samples.get(index as usize).map_or(0.0, |&v| v as f64)
}

#[cfg(test)]
pub(crate) mod test_signals {
    use std::f64::consts::PI;

    /// Impulse train at `f0` through a cascade of two-pole resonators.
    pub(crate) fn synthetic_vowel(
        rate: u32,
        seconds: f64,
        f0: f64,
        formants: &[(f64, f64)],
    ) -> Vec<f32> {
        let n = (seconds * rate as f64) as usize;
        let period = rate as f64 / f0;
        let mut signal: Vec<f64> = (0..n)
            .map(|i| {
                let phase = i as f64 % period;
                if phase < 1.0 { 1.0 } else { 0.0 }
            })
            .collect();
        let t = 1.0 / rate as f64;
        for &(freq, bw) in formants {
            let c = -(-2.0 * PI * bw * t).exp();
            let b = 2.0 * (-PI * bw * t).exp() * (2.0 * PI * freq * t).cos();
            let a = 1.0 - b - c;
            let (mut y1, mut y2) = (0.0, 0.0);
            for x in signal.iter_mut() {
                let y = a * *x + b * y1 + c * y2;
                y2 = y1;
                y1 = y;
                *x = y;
            }
        }
        let peak = signal.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(1e-12);
        signal.iter().map(|v| (v / peak * 0.8) as f32).collect()
    }
}
