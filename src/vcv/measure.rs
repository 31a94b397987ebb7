use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::acoustics::{FormantSettings, Formants, PitchSettings, formants_at, pitch_at};
use crate::audio::{DecodeOptions, SUPPORTED_EXTENSIONS, decode_audio};
use crate::config::MeasurementSettings;
use crate::textgrid::{Interval, TextGrid, Tier};

use super::{Measure, MeasureError, Position, Stop, StopVoicing, VcvToken, Vowel};

/// Boundary tolerance when matching vowel intervals to the closure.
const BOUNDARY_EPSILON: f64 = 1e-4;

/// Measured tokens grouped by the voicing of their stop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VcvDistributions {
    pub voiced: Vec<VcvToken>,
    pub voiceless: Vec<VcvToken>,
    pub unclassified: Vec<VcvToken>,
}

impl VcvDistributions {
    pub fn push(&mut self, token: VcvToken) {
        match token.stop.voicing() {
            StopVoicing::Voiced => self.voiced.push(token),
            StopVoicing::Voiceless => self.voiceless.push(token),
            StopVoicing::Unclassified => self.unclassified.push(token),
        }
    }

    pub fn len(&self) -> usize {
        self.voiced.len() + self.voiceless.len() + self.unclassified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all(&self) -> impl Iterator<Item = &VcvToken> {
        self.voiced
            .iter()
            .chain(&self.voiceless)
            .chain(&self.unclassified)
    }
}

struct Signal {
    samples: Vec<f32>,
    rate: u32,
    pitch: PitchSettings,
    formants: FormantSettings,
}

impl Signal {
    fn pitch_at(&self, time: f64) -> Option<f32> {
        pitch_at(&self.samples, self.rate, time, &self.pitch)
    }

    fn formants_at(&self, time: f64) -> Formants {
        formants_at(&self.samples, self.rate, time, &self.formants)
    }
}

/// Formant analyses at a fixed list of attempt times, each run at most once.
struct FormantAttempts<'a> {
    signal: &'a Signal,
    times: &'a [f64],
    analyses: Vec<Option<Formants>>,
}

impl<'a> FormantAttempts<'a> {
    fn new(signal: &'a Signal, times: &'a [f64]) -> Self {
        Self {
            signal,
            times,
            analyses: std::iter::repeat_with(|| None).take(times.len()).collect(),
        }
    }

    fn at(&mut self, attempt: usize) -> &Formants {
        let signal = self.signal;
        let time = self.times[attempt];
        self.analyses[attempt].get_or_insert_with(|| signal.formants_at(time))
    }

    fn computed(&self) -> usize {
        self.analyses.iter().filter(|analysis| analysis.is_some()).count()
    }
}

/// Measure one annotated VCV recording.
///
/// The vowel label is the first two characters of the TextGrid file stem and the stop label
/// its fourth character. The speaker is the name of the containing directory.
pub fn read_measurements(
    textgrid: &Path,
    audio: &Path,
    settings: &MeasurementSettings,
) -> Result<VcvToken, MeasureError> {
    let grid = TextGrid::read(textgrid)?;
    let stem = textgrid
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| MeasureError::BadName(textgrid.to_path_buf()))?;
    let chars: Vec<char> = stem.chars().collect();
    if chars.len() < 4 {
        return Err(MeasureError::BadName(textgrid.to_path_buf()));
    }
    let vowel_label: String = chars[..2].iter().collect();
    let stop_label = chars[3].to_string();
    let speaker = textgrid
        .parent()
        .and_then(|dir| dir.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let tier = |name: &str| {
        grid.tier(name).ok_or_else(|| MeasureError::MissingTier {
            path: textgrid.to_path_buf(),
            tier: name.to_string(),
        })
    };
    let voicing_tier = tier(&settings.voicing_tier)?;
    let closure_tier = tier(&settings.closure_tier)?;
    let vowel_tier = tier(&settings.vowel_tier)?;

    let closure = closure_tier
        .labeled_intervals()
        .next()
        .ok_or_else(|| MeasureError::MissingInterval {
            path: textgrid.to_path_buf(),
            what: "no labeled closure interval",
        })?;
    let voicing_dur = voiced_overlap(voicing_tier, closure);
    let vowel1 = vowel_tier
        .labeled_intervals()
        .filter(|interval| interval.xmax <= closure.xmin + BOUNDARY_EPSILON)
        .last()
        .ok_or_else(|| MeasureError::MissingInterval {
            path: textgrid.to_path_buf(),
            what: "no labeled vowel before the closure",
        })?;
    let vowel2 = vowel_tier
        .labeled_intervals()
        .find(|interval| interval.xmin >= closure.xmax - BOUNDARY_EPSILON)
        .ok_or_else(|| MeasureError::MissingInterval {
            path: textgrid.to_path_buf(),
            what: "no labeled vowel after the closure",
        })?;

    let clip = decode_audio(
        audio,
        &DecodeOptions {
            sample_rate: None,
            num_channels: 1,
            normalize: false,
            fast_wav: false,
        },
    )?;
    let signal = Signal {
        samples: clip.samples,
        rate: clip.sample_rate,
        pitch: PitchSettings::from(settings),
        formants: FormantSettings::from(settings),
    };
    let name = stem.to_string();
    let vowel1 = measure_vowel(
        &signal,
        vowel1,
        &vowel_label,
        VowelSide::BeforeStop,
        settings,
        &name,
    );
    let vowel2 = measure_vowel(
        &signal,
        vowel2,
        &vowel_label,
        VowelSide::AfterStop,
        settings,
        &name,
    );
    Ok(VcvToken {
        name,
        speaker,
        stop: Stop {
            label: stop_label,
            voicing_dur: Some(voicing_dur as f32),
            closure_dur: Some(closure.duration() as f32),
        },
        vowel1,
        vowel2,
    })
}

fn voiced_overlap(voicing: &Tier, closure: &Interval) -> f64 {
    voicing
        .labeled_intervals()
        .map(|interval| {
            (interval.xmax.min(closure.xmax) - interval.xmin.max(closure.xmin)).max(0.0)
        })
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VowelSide {
    BeforeStop,
    AfterStop,
}

fn measure_vowel(
    signal: &Signal,
    interval: &Interval,
    label: &str,
    side: VowelSide,
    settings: &MeasurementSettings,
    name: &str,
) -> Vowel {
    let mut vowel = Vowel::new(label);
    for position in Position::ALL {
        let times = attempt_times(interval, side, position, settings);
        let mut formants = FormantAttempts::new(signal, &times);
        for measure in Measure::ALL {
            let value = (0..times.len()).find_map(|attempt| match measure.formant_number() {
                None => signal.pitch_at(times[attempt]),
                Some(number) => formants.at(attempt).get(number),
            });
            if value.is_none() {
                debug!("{name}: {measure:?} {position:?} undefined after {} tries", times.len());
            }
            vowel.set(measure, position, value);
        }
    }
    vowel
}

/// Measurement times: the nominal point followed by retry offsets inside the interval.
///
/// Transitions step away from the closure into the vowel; steady positions alternate around
/// the midpoint.
fn attempt_times(
    interval: &Interval,
    side: VowelSide,
    position: Position,
    settings: &MeasurementSettings,
) -> Vec<f64> {
    let step = settings.retry_step.max(0.0) as f64;
    let retries = if step > 0.0 { settings.max_retries } else { 0 };
    let inside = |time: f64| time >= interval.xmin && time <= interval.xmax;
    let mut times = Vec::with_capacity(retries + 1);
    match position {
        Position::Steady => {
            let mid = interval.midpoint();
            times.push(mid);
            for k in 1..=retries {
                let offset = step * k.div_ceil(2) as f64;
                times.push(if k % 2 == 1 { mid + offset } else { mid - offset });
            }
        }
        Position::Transition => {
            let (edge, direction) = match side {
                VowelSide::BeforeStop => (interval.xmax, -1.0),
                VowelSide::AfterStop => (interval.xmin, 1.0),
            };
            for k in 0..=retries {
                times.push(edge + direction * step * k as f64);
            }
        }
    }
    times.retain(|&time| inside(time));
    times
}

fn audio_sibling(textgrid: &Path) -> Option<PathBuf> {
    SUPPORTED_EXTENSIONS
        .iter()
        .flat_map(|ext| [ext.to_string(), ext.to_ascii_uppercase()])
        .map(|ext| textgrid.with_extension(ext))
        .find(|candidate| candidate.is_file())
}

/// Measure every `*.TextGrid` in `dir` that has an audio file with the same stem.
///
/// Files that cannot be measured are logged and skipped.
pub fn measure_directory(
    dir: &Path,
    settings: &MeasurementSettings,
) -> Result<VcvDistributions, MeasureError> {
    let io_err = |source| MeasureError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut grids = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_grid = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("textgrid"));
        if is_grid && path.is_file() {
            grids.push(path);
        }
    }
    grids.sort();

    let mut distributions = VcvDistributions::default();
    for grid in grids {
        let Some(audio) = audio_sibling(&grid) else {
            warn!("No audio next to {}; skipping", grid.display());
            continue;
        };
        match read_measurements(&grid, &audio, settings) {
            Ok(token) => distributions.push(token),
            Err(err) => warn!("Skipping {}: {err}", grid.display()),
        }
    }
    info!(
        "Measured {} tokens in {} ({} voiced, {} voiceless)",
        distributions.len(),
        dir.display(),
        distributions.voiced.len(),
        distributions.voiceless.len()
    );
    Ok(distributions)
}
