use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Number of cascade formant resonators.
pub const CASCADE_FORMANTS: usize = 5;
/// Levels at or below this are treated as silence.
const SILENT_DB: f32 = -70.0;
/// Bandwidth of the glottal low-pass resonator.
const GLOTTAL_BANDWIDTH_HZ: f64 = 100.0;

/// One control frame. Levels are in dB, where 0 dB is a unit-amplitude source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub f0: f32,
    /// Voicing level.
    pub av: f32,
    /// Aspiration noise level.
    pub ah: f32,
    /// Burst (frication) noise level.
    pub af: f32,
    /// `(frequency, bandwidth)` of F1..F5 in Hz.
    pub formants: [(f32, f32); CASCADE_FORMANTS],
}

impl Frame {
    pub fn silent(formants: [(f32, f32); CASCADE_FORMANTS]) -> Self {
        Self {
            f0: 100.0,
            av: SILENT_DB,
            ah: SILENT_DB,
            af: SILENT_DB,
            formants,
        }
    }

    /// Linear interpolation, `t` in `[0, 1]`.
    pub fn lerp(&self, other: &Frame, t: f32) -> Frame {
        let mix = |a: f32, b: f32| a + (b - a) * t;
        let mut formants = self.formants;
        for (out, (a, b)) in formants
            .iter_mut()
            .zip(self.formants.iter().zip(other.formants.iter()))
        {
            *out = (mix(a.0, b.0), mix(a.1, b.1));
        }
        Frame {
            f0: mix(self.f0, other.f0),
            av: mix(self.av, other.av),
            ah: mix(self.ah, other.ah),
            af: mix(self.af, other.af),
            formants,
        }
    }
}

fn db_to_amp(db: f32) -> f64 {
    if db <= SILENT_DB {
        0.0
    } else {
        10f64.powf(db as f64 / 20.0)
    }
}

/// Second-order digital resonator with unity gain at DC.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Resonator {
    a: f64,
    b: f64,
    c: f64,
    y1: f64,
    y2: f64,
}

impl Resonator {
    pub fn set(&mut self, frequency: f64, bandwidth: f64, rate: f64) {
        let t = 1.0 / rate;
        self.c = -(-2.0 * PI * bandwidth * t).exp();
        self.b = 2.0 * (-PI * bandwidth * t).exp() * (2.0 * PI * frequency * t).cos();
        self.a = 1.0 - self.b - self.c;
    }

    pub fn process(&mut self, x: f64) -> f64 {
        let y = self.a * x + self.b * self.y1 + self.c * self.y2;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// Cascade synthesizer state carried across frames.
pub struct Synthesizer {
    rate: f64,
    glottal: Resonator,
    cascade: [Resonator; CASCADE_FORMANTS],
    phase: f64,
    rng: StdRng,
}

impl Synthesizer {
    pub fn new(rate: u32, seed: u64) -> Self {
        let rate = rate.max(1) as f64;
        let mut glottal = Resonator::default();
        glottal.set(0.0, GLOTTAL_BANDWIDTH_HZ, rate);
        Self {
            rate,
            glottal,
            cascade: [Resonator::default(); CASCADE_FORMANTS],
            phase: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Render `frames` spaced `frame_seconds` apart, interpolating parameters per sample.
    pub fn render(&mut self, frames: &[Frame], frame_seconds: f32) -> Vec<f32> {
        let frame_len = ((frame_seconds as f64 * self.rate).round() as usize).max(1);
        let mut out = Vec::with_capacity(frames.len() * frame_len);
        let nyquist = self.rate / 2.0;
        for (index, frame) in frames.iter().enumerate() {
            let next = frames.get(index + 1).unwrap_or(frame);
            for n in 0..frame_len {
                let current = frame.lerp(next, n as f32 / frame_len as f32);
                for (resonator, &(frequency, bandwidth)) in
                    self.cascade.iter_mut().zip(current.formants.iter())
                {
                    let frequency = (frequency as f64).clamp(0.0, nyquist * 0.95);
                    resonator.set(frequency, (bandwidth as f64).max(1.0), self.rate);
                }
                let source = self.source_sample(&current);
                out.push(
                    self.cascade
                        .iter_mut()
                        .fold(source, |signal, resonator| resonator.process(signal))
                        as f32,
                );
            }
        }
        out
    }

    fn source_sample(&mut self, frame: &Frame) -> f64 {
        let f0 = (frame.f0 as f64).max(1.0);
        self.phase += f0 / self.rate;
        // One pulse per period; the low-pass resonator shapes it into a glottal flow.
        let pulse = if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
            self.rate / f0
        } else {
            0.0
        };
        let voiced = self.glottal.process(pulse * db_to_amp(frame.av));
        let noise_amp = db_to_amp(frame.ah) + db_to_amp(frame.af);
        let noise = if noise_amp > 0.0 {
            self.rng.random_range(-1.0..1.0) * noise_amp
        } else {
            0.0
        };
        voiced + noise
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORMANTS: [(f32, f32); CASCADE_FORMANTS] = [
        (700.0, 60.0),
        (1_200.0, 80.0),
        (2_600.0, 120.0),
        (3_300.0, 200.0),
        (4_500.0, 250.0),
    ];

    #[test]
    fn resonator_has_unity_dc_gain() {
        let mut resonator = Resonator::default();
        resonator.set(500.0, 100.0, 16_000.0);
        let mut y = 0.0;
        for _ in 0..4_000 {
            y = resonator.process(1.0);
        }
        assert!((y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn silent_frames_render_silence() {
        let frames = vec![Frame::silent(FORMANTS); 4];
        let out = Synthesizer::new(16_000, 1).render(&frames, 0.005);
        assert_eq!(out.len(), 4 * 80);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn voiced_frames_are_periodic_and_finite() {
        let frame = Frame {
            f0: 100.0,
            av: 0.0,
            ..Frame::silent(FORMANTS)
        };
        let out = Synthesizer::new(16_000, 1).render(&vec![frame; 40], 0.005);
        assert!(out.iter().all(|v| v.is_finite()));
        assert!(out.iter().any(|v| v.abs() > 1e-3));
        let pitch = crate::acoustics::pitch_at(
            &out,
            16_000,
            0.1,
            &crate::acoustics::PitchSettings::default(),
        )
        .unwrap();
        assert!((pitch - 100.0).abs() < 3.0, "pitch {pitch}");
    }

    #[test]
    fn noise_is_reproducible_per_seed() {
        let frame = Frame {
            ah: 0.0,
            ..Frame::silent(FORMANTS)
        };
        let a = Synthesizer::new(16_000, 3).render(&[frame; 2], 0.005);
        let b = Synthesizer::new(16_000, 3).render(&[frame; 2], 0.005);
        let c = Synthesizer::new(16_000, 4).render(&[frame; 2], 0.005);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn frames_interpolate_linearly() {
        let a = Frame::silent(FORMANTS);
        let b = Frame {
            f0: 200.0,
            av: 0.0,
            ..a
        };
        let mid = a.lerp(&b, 0.5);
        assert_eq!(mid.f0, 150.0);
        assert_eq!(mid.av, -35.0);
        assert_eq!(mid.formants, FORMANTS);
    }
}
