use tracing::warn;

use crate::config::SynthesisSettings;
use crate::sampling::{KlattParams, SampleName};
use crate::vcv::StopVoicing;

use super::SynthesisError;
use super::klatt::{CASCADE_FORMANTS, Frame};

/// Modal voicing level in dB.
const VOICING_DB: f32 = 60.0;
const ASPIRATION_DB: f32 = 50.0;
const BURST_DB: f32 = 56.0;
/// Share of the distance from the locus to the vowel target covered at the vowel edge.
const LOCUS_PULL: f32 = 0.5;
const F4: (f32, f32) = (3_300.0, 250.0);
const F5: (f32, f32) = (3_750.0, 200.0);
/// Bandwidths for F1..F3.
const BANDWIDTHS: [f32; 3] = [60.0, 90.0, 150.0];

/// Steady-state F2 and F3 of a vowel label.
fn vowel_targets(label: &str) -> Option<(f32, f32)> {
    let targets = match label.to_ascii_lowercase().as_str() {
        "iy" | "ii" | "ee" => (2_290.0, 3_010.0),
        "ih" => (1_990.0, 2_550.0),
        "eh" | "ey" => (1_840.0, 2_480.0),
        "ae" => (1_720.0, 2_410.0),
        "aa" | "ah" => (1_090.0, 2_440.0),
        "ao" | "oo" | "ow" => (840.0, 2_410.0),
        "uh" => (1_020.0, 2_240.0),
        "uw" | "uu" => (870.0, 2_240.0),
        "er" => (1_350.0, 1_690.0),
        _ => return None,
    };
    Some(targets)
}

/// Neutral vowel used when a label is not in the table.
const NEUTRAL_TARGETS: (f32, f32) = (1_500.0, 2_500.0);

/// F2 and F3 loci of a stop label by place of articulation.
fn stop_loci(label: &str) -> Option<(f32, f32)> {
    match label.to_ascii_lowercase().as_str() {
        "b" | "p" => Some((800.0, 2_200.0)),
        "d" | "t" => Some((1_800.0, 2_700.0)),
        "g" | "k" => Some((2_000.0, 2_100.0)),
        _ => None,
    }
}

/// Keyframed parameter tracks for one V-C-V token.
#[derive(Debug, Clone, PartialEq)]
pub struct VcvPlan {
    pub name: String,
    pub voicing: StopVoicing,
    keyframes: Vec<(f64, Frame)>,
}

impl VcvPlan {
    pub fn from_params(
        row: &KlattParams,
        settings: &SynthesisSettings,
    ) -> Result<Self, SynthesisError> {
        let parts = SampleName::parse(&row.name)
            .ok_or_else(|| SynthesisError::BadName(row.name.clone()))?;
        let (f2_locus, f3_locus) =
            stop_loci(parts.stop).ok_or_else(|| SynthesisError::UnknownStop {
                name: row.name.clone(),
                stop: parts.stop.to_string(),
            })?;
        let (f2, f3) = vowel_targets(parts.vowel).unwrap_or_else(|| {
            warn!(
                "{}: no formant targets for vowel `{}`; using a neutral vowel",
                row.name, parts.vowel
            );
            NEUTRAL_TARGETS
        });
        let voicing = StopVoicing::of_label(parts.stop);

        let edge = |target: f32, locus: f32| locus + LOCUS_PULL * (target - locus);
        let formants = |f1: f32, f2: f32, f3: f32| -> [(f32, f32); CASCADE_FORMANTS] {
            [
                (f1, BANDWIDTHS[0]),
                (f2, BANDWIDTHS[1]),
                (f3, BANDWIDTHS[2]),
                F4,
                F5,
            ]
        };
        let steady = Frame {
            f0: row.f0_steady,
            av: VOICING_DB,
            ..Frame::silent(formants(row.f1_steady, f2, f3))
        };
        let transition = Frame {
            f0: row.f0_offset,
            av: VOICING_DB,
            ..Frame::silent(formants(row.f1_offset, edge(f2, f2_locus), edge(f3, f3_locus)))
        };
        let closed = Frame::silent(transition.formants);
        let voice_bar = Frame {
            av: VOICING_DB + settings.voice_bar_db,
            ..transition
        };
        let burst = Frame {
            af: BURST_DB,
            ..closed
        };
        let aspiration = Frame {
            ah: ASPIRATION_DB,
            ..closed
        };

        let steady_len = settings.vowel_steady_seconds.max(0.0) as f64;
        let transition_len = settings.transition_seconds.max(0.0) as f64;
        let closure_len = row.closure_dur.max(0.0) as f64;
        let voicing_len = (row.closure_voicing_dur.max(0.0) as f64).min(closure_len);
        let burst_len = settings.burst_seconds.max(0.0) as f64;
        let aspiration_len = match voicing {
            StopVoicing::Voiceless => settings.aspiration_voiceless_seconds,
            _ => settings.aspiration_voiced_seconds,
        }
        .max(0.0) as f64;

        let mut plan = PlanBuilder::default();
        plan.hold(steady, steady_len);
        plan.ramp(transition, transition_len);
        if voicing_len > 0.0 {
            plan.hold(voice_bar, voicing_len);
        }
        plan.hold(closed, closure_len - voicing_len);
        plan.hold(burst, burst_len);
        plan.hold(aspiration, aspiration_len);
        plan.hold(transition, 0.0);
        plan.ramp(steady, transition_len);
        plan.hold(steady, steady_len);

        Ok(Self {
            name: row.name.clone(),
            voicing,
            keyframes: plan.keyframes,
        })
    }

    pub fn duration(&self) -> f64 {
        self.keyframes.last().map_or(0.0, |(time, _)| *time)
    }

    /// Control frames every `frame_seconds`, covering the whole token.
    pub fn frames(&self, frame_seconds: f32) -> Vec<Frame> {
        let step = frame_seconds.max(1e-4) as f64;
        let count = (self.duration() / step).ceil() as usize + 1;
        (0..count).filter_map(|k| self.frame_at(k as f64 * step)).collect()
    }

    fn frame_at(&self, time: f64) -> Option<Frame> {
        let after = self.keyframes.iter().position(|(t, _)| *t > time);
        match after {
            Some(0) => self.keyframes.first().map(|(_, frame)| *frame),
            Some(index) => {
                let (t0, a) = self.keyframes[index - 1];
                let (t1, b) = self.keyframes[index];
                Some(a.lerp(&b, ((time - t0) / (t1 - t0)) as f32))
            }
            None => self.keyframes.last().map(|(_, frame)| *frame),
        }
    }
}

/// Piecewise-linear keyframes; `hold` starts a new segment, `ramp` interpolates from the
/// previous one.
#[derive(Default)]
struct PlanBuilder {
    keyframes: Vec<(f64, Frame)>,
    time: f64,
}

impl PlanBuilder {
    fn hold(&mut self, frame: Frame, seconds: f64) {
        self.keyframes.push((self.time, frame));
        self.time += seconds.max(0.0);
        self.keyframes.push((self.time, frame));
    }

    fn ramp(&mut self, frame: Frame, seconds: f64) {
        self.time += seconds.max(0.0);
        self.keyframes.push((self.time, frame));
    }
}
