//! Random VCV synthesis parameters drawn from measured token distributions.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{NoiseKind, SamplingSettings};
use crate::dataset::{DatasetError, MetadataRow, write_metadata};
use crate::vcv::{Measure, Position, StopVoicing, VcvDistributions, VcvToken};

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("No token defines {parameter}")]
    EmptyPool { parameter: &'static str },
    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// One row of the Klatt parameter table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KlattParams {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ClosureVoicingDur")]
    pub closure_voicing_dur: f32,
    #[serde(rename = "ClosureDur")]
    pub closure_dur: f32,
    #[serde(rename = "F1offset")]
    pub f1_offset: f32,
    #[serde(rename = "F1steady")]
    pub f1_steady: f32,
    #[serde(rename = "f0offset")]
    pub f0_offset: f32,
    #[serde(rename = "f0steady")]
    pub f0_steady: f32,
}

/// Parts of a generated token name `<prefix>_<speaker>_<stop>_<vowel>_<index>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleName<'a> {
    pub prefix: &'a str,
    pub speaker: &'a str,
    pub stop: &'a str,
    pub vowel: &'a str,
    pub index: &'a str,
}

impl<'a> SampleName<'a> {
    /// Split from the right so prefixes may themselves contain underscores.
    pub fn parse(name: &'a str) -> Option<Self> {
        let mut parts = name.rsplitn(5, '_');
        let index = parts.next()?;
        let vowel = parts.next()?;
        let stop = parts.next()?;
        let speaker = parts.next()?;
        let prefix = parts.next()?;
        Some(Self {
            prefix,
            speaker,
            stop,
            vowel,
            index,
        })
    }
}

/// Sampled values before naming.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampledValues {
    pub closure_voicing_dur: f32,
    pub closure_dur: f32,
    pub f0_steady: f32,
    pub f0_offset: f32,
    pub f1_steady: f32,
    pub f1_offset: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampledToken {
    pub params: KlattParams,
    pub category: StopVoicing,
}

fn noise<R: Rng + ?Sized>(rng: &mut R, kind: NoiseKind, margin: f32) -> f32 {
    let margin = margin.abs();
    if margin == 0.0 {
        return 0.0;
    }
    match kind {
        NoiseKind::Uniform => rng.random_range(-margin..=margin),
        NoiseKind::Gaussian => Normal::new(0.0, margin).map_or(0.0, |normal| normal.sample(rng)),
    }
}

fn pool(tokens: &[VcvToken], pick: impl Fn(&VcvToken) -> Option<f32>) -> Vec<f32> {
    tokens
        .iter()
        .filter_map(pick)
        .filter(|v| v.is_finite())
        .collect()
}

fn draw<R: Rng + ?Sized>(
    rng: &mut R,
    values: &[f32],
    parameter: &'static str,
) -> Result<f32, SamplingError> {
    values
        .choose(rng)
        .copied()
        .ok_or(SamplingError::EmptyPool { parameter })
}

/// Draw a `(steady, transition)` pair for one vowel measure.
fn draw_vowel_pair<R: Rng + ?Sized>(
    rng: &mut R,
    tokens: &[VcvToken],
    measure: Measure,
    paired: bool,
    names: (&'static str, &'static str),
) -> Result<(f32, f32), SamplingError> {
    let value = |token: &VcvToken, position| token.vowel1.get(measure, position);
    if paired {
        let both: Vec<(f32, f32)> = tokens
            .iter()
            .filter_map(|token| {
                Some((
                    value(token, Position::Steady)?,
                    value(token, Position::Transition)?,
                ))
            })
            .collect();
        return both
            .choose(rng)
            .copied()
            .ok_or(SamplingError::EmptyPool { parameter: names.0 });
    }
    let steady = pool(tokens, |token| value(token, Position::Steady));
    let transition = pool(tokens, |token| value(token, Position::Transition));
    Ok((draw(rng, &steady, names.0)?, draw(rng, &transition, names.1)?))
}

/// Draw one parameter set: every value comes from a randomly chosen token plus noise.
pub fn generate_sample_vcv<R: Rng + ?Sized>(
    tokens: &[VcvToken],
    settings: &SamplingSettings,
    rng: &mut R,
) -> Result<SampledValues, SamplingError> {
    let voicing_pool = pool(tokens, |token| token.stop.voicing_dur);
    let closure_pool = pool(tokens, |token| token.stop.closure_dur.filter(|dur| *dur > 0.0));
    let kind = settings.noise;

    let voicing = draw(rng, &voicing_pool, "closure voicing")?
        + noise(rng, kind, settings.closure_voicing_noise);
    let voicing = voicing.max(0.0);

    let mut closure = draw(rng, &closure_pool, "closure duration")?
        + noise(rng, kind, settings.closure_duration_noise);
    if closure <= 0.0 {
        // The pool only holds positive closures, so its minimum is positive too.
        closure = closure_pool.iter().copied().fold(f32::INFINITY, f32::min);
    }
    let voicing = voicing.min(closure);

    let (f0_steady, f0_offset) = draw_vowel_pair(
        rng,
        tokens,
        Measure::F0,
        settings.paired_vowel_draws,
        ("f0 steady", "f0 offset"),
    )?;
    let (f1_steady, f1_offset) = draw_vowel_pair(
        rng,
        tokens,
        Measure::F1,
        settings.paired_vowel_draws,
        ("F1 steady", "F1 offset"),
    )?;
    let f0 = |value: f32, rng: &mut R| {
        (value + noise(rng, kind, settings.f0_noise)).max(settings.min_f0)
    };
    let f1 = |value: f32, rng: &mut R| {
        (value + noise(rng, kind, settings.f1_noise)).max(settings.min_f1)
    };
    Ok(SampledValues {
        closure_voicing_dur: voicing,
        closure_dur: closure,
        f0_steady: f0(f0_steady, &mut *rng),
        f0_offset: f0(f0_offset, &mut *rng),
        f1_steady: f1(f1_steady, &mut *rng),
        f1_offset: f1(f1_offset, &mut *rng),
    })
}

/// Sample `voiced_count` tokens from the voiced distribution and `voiceless_count` from the
/// voiceless one, naming them after a randomly chosen source token.
pub fn sample_batch(
    distributions: &VcvDistributions,
    settings: &SamplingSettings,
) -> Result<Vec<SampledToken>, SamplingError> {
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut out = Vec::with_capacity(settings.voiced_count + settings.voiceless_count);
    let groups = [
        (StopVoicing::Voiced, &distributions.voiced, settings.voiced_count),
        (StopVoicing::Voiceless, &distributions.voiceless, settings.voiceless_count),
    ];
    for (category, tokens, count) in groups {
        for _ in 0..count {
            let identity = tokens.choose(&mut rng).ok_or(SamplingError::EmptyPool {
                parameter: match category {
                    StopVoicing::Voiced => "voiced tokens",
                    _ => "voiceless tokens",
                },
            })?;
            let values = generate_sample_vcv(tokens, settings, &mut rng)?;
            let name = format!(
                "{}_{}_{}_{}_{}",
                settings.name_prefix,
                settings.speaker,
                identity.stop.label,
                identity.vowel1.label,
                out.len()
            );
            out.push(SampledToken {
                params: KlattParams {
                    name,
                    closure_voicing_dur: values.closure_voicing_dur,
                    closure_dur: values.closure_dur,
                    f1_offset: values.f1_offset,
                    f1_steady: values.f1_steady,
                    f0_offset: values.f0_offset,
                    f0_steady: values.f0_steady,
                },
                category,
            });
        }
    }
    info!("Sampled {} parameter sets", out.len());
    Ok(out)
}

pub fn write_params_table(path: &Path, rows: &[KlattParams]) -> Result<(), SamplingError> {
    let csv_err = |source| SamplingError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer
        .flush()
        .map_err(|source| csv_err(csv::Error::from(source)))
}

pub fn read_params_table(path: &Path) -> Result<Vec<KlattParams>, SamplingError> {
    let csv_err = |source| SamplingError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;
    reader
        .deserialize()
        .collect::<Result<Vec<KlattParams>, _>>()
        .map_err(csv_err)
}

/// Write the `FileID,Category` table for sampled tokens.
pub fn write_sample_metadata(path: &Path, tokens: &[SampledToken]) -> Result<(), SamplingError> {
    let rows: Vec<MetadataRow> = tokens
        .iter()
        .map(|token| MetadataRow {
            file_id: format!("{}.wav", token.params.name),
            category: token.category.category().to_string(),
        })
        .collect();
    write_metadata(path, &rows)?;
    Ok(())
}
