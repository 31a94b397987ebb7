//! Histogram and moment tables for sampled parameter distributions.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::sampling::{KlattParams, SampleName, SamplingError, read_params_table};
use crate::vcv::StopVoicing;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error(transparent)]
    Sampling(#[from] SamplingError),
    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

/// Equal-width histogram over the finite values of a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub min: f32,
    pub max: f32,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// A degenerate range gets one bin holding everything; no values give no bins.
    pub fn new(values: &[f32], bins: usize) -> Self {
        let finite: Vec<f32> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let Some(stats) = Stats::of(&finite) else {
            return Self {
                min: 0.0,
                max: 0.0,
                counts: Vec::new(),
            };
        };
        let (min, max) = (stats.min, stats.max);
        if bins <= 1 || max <= min {
            return Self {
                min,
                max,
                counts: vec![finite.len()],
            };
        }
        let width = (max - min) / bins as f32;
        let mut counts = vec![0; bins];
        for value in finite {
            let index = (((value - min) / width) as usize).min(bins - 1);
            counts[index] += 1;
        }
        Self { min, max, counts }
    }

    /// `(start, end, count)` per bin.
    pub fn bins(&self) -> impl Iterator<Item = (f32, f32, usize)> + '_ {
        let width = (self.max - self.min) / self.counts.len().max(1) as f32;
        self.counts.iter().enumerate().map(move |(i, &count)| {
            let start = self.min + width * i as f32;
            let end = if i + 1 == self.counts.len() {
                self.max
            } else {
                self.min + width * (i + 1) as f32
            };
            (start, end, count)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub count: usize,
    pub mean: f32,
    /// Population standard deviation.
    pub std: f32,
    pub min: f32,
    pub max: f32,
}

impl Stats {
    pub fn of(values: &[f32]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            count: values.len(),
            mean: mean as f32,
            std: var.sqrt() as f32,
            min: values.iter().copied().fold(f32::INFINITY, f32::min),
            max: values.iter().copied().fold(f32::NEG_INFINITY, f32::max),
        })
    }
}

/// Summarised parameter columns in output order.
pub const MEASURES: [&str; 6] = [
    "ClosureDur",
    "ClosureVoicingDur",
    "f0offset",
    "f0steady",
    "F1offset",
    "F1steady",
];

fn column(row: &KlattParams, measure: &str) -> f32 {
    match measure {
        "ClosureDur" => row.closure_dur,
        "ClosureVoicingDur" => row.closure_voicing_dur,
        "f0offset" => row.f0_offset,
        "f0steady" => row.f0_steady,
        "F1offset" => row.f1_offset,
        "F1steady" => row.f1_steady,
        _ => f32::NAN,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasureSummary {
    pub measure: &'static str,
    pub group: StopVoicing,
    pub histogram: Histogram,
    pub stats: Option<Stats>,
}

/// Group rows by the voicing of the stop in their name and summarise each measure.
pub fn summarize_params(rows: &[KlattParams], bins: usize) -> Vec<MeasureSummary> {
    let mut voiced = Vec::new();
    let mut voiceless = Vec::new();
    for row in rows {
        let Some(name) = SampleName::parse(&row.name) else {
            warn!("Cannot read a stop label from `{}`; skipping", row.name);
            continue;
        };
        match StopVoicing::of_label(name.stop) {
            StopVoicing::Voiced => voiced.push(row),
            StopVoicing::Voiceless => voiceless.push(row),
            StopVoicing::Unclassified => {}
        }
    }
    info!("Summarising {} voiced and {} voiceless rows", voiced.len(), voiceless.len());
    let mut out = Vec::new();
    for measure in MEASURES {
        for (group, members) in [
            (StopVoicing::Voiced, &voiced),
            (StopVoicing::Voiceless, &voiceless),
        ] {
            let values: Vec<f32> = members.iter().map(|row| column(row, measure)).collect();
            out.push(MeasureSummary {
                measure,
                group,
                histogram: Histogram::new(&values, bins),
                stats: Stats::of(&values),
            });
        }
    }
    out
}

pub fn summarize_table(
    params_csv: &Path,
    bins: usize,
) -> Result<Vec<MeasureSummary>, SummaryError> {
    Ok(summarize_params(&read_params_table(params_csv)?, bins))
}

#[derive(Serialize)]
struct HistogramRow<'a> {
    measure: &'a str,
    group: &'a str,
    bin_start: f32,
    bin_end: f32,
    count: usize,
}

#[derive(Serialize)]
struct StatsRow<'a> {
    measure: &'a str,
    group: &'a str,
    count: usize,
    mean: f32,
    std: f32,
    min: f32,
    max: f32,
}

/// Write `measure,group,bin_start,bin_end,count` rows.
pub fn write_histograms(path: &Path, summaries: &[MeasureSummary]) -> Result<(), SummaryError> {
    let csv_err = |source| SummaryError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for summary in summaries {
        for (bin_start, bin_end, count) in summary.histogram.bins() {
            writer
                .serialize(HistogramRow {
                    measure: summary.measure,
                    group: summary.group.category(),
                    bin_start,
                    bin_end,
                    count,
                })
                .map_err(csv_err)?;
        }
    }
    writer
        .flush()
        .map_err(|source| csv_err(csv::Error::from(source)))
}

/// Write `measure,group,count,mean,std,min,max` rows for non-empty groups.
pub fn write_stats(path: &Path, summaries: &[MeasureSummary]) -> Result<(), SummaryError> {
    let csv_err = |source| SummaryError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for summary in summaries {
        let Some(stats) = summary.stats else {
            continue;
        };
        writer
            .serialize(StatsRow {
                measure: summary.measure,
                group: summary.group.category(),
                count: stats.count,
                mean: stats.mean,
                std: stats.std,
                min: stats.min,
                max: stats.max,
            })
            .map_err(csv_err)?;
    }
    writer
        .flush()
        .map_err(|source| csv_err(csv::Error::from(source)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_fall_into_equal_width_bins() {
        let histogram = Histogram::new(&[0.0, 1.0, 2.0, 3.0, 4.0, f32::NAN], 4);
        assert_eq!(histogram.counts, vec![1, 1, 1, 2]);
        let bins: Vec<_> = histogram.bins().collect();
        assert_eq!(bins[0], (0.0, 1.0, 1));
        assert_eq!(bins[3], (3.0, 4.0, 2));
    }

    #[test]
    fn degenerate_range_uses_one_bin() {
        let histogram = Histogram::new(&[2.5, 2.5, 2.5], 10);
        assert_eq!(histogram.counts, vec![3]);
        assert_eq!(histogram.bins().next(), Some((2.5, 2.5, 3)));
        assert!(Histogram::new(&[], 10).counts.is_empty());
    }

    #[test]
    fn stats_are_population_moments() {
        let stats = Stats::of(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.std, 2.0);
        assert_eq!((stats.min, stats.max, stats.count), (2.0, 9.0, 8));
        assert_eq!(Stats::of(&[]), None);
    }

    fn row(name: &str, closure: f32) -> KlattParams {
        KlattParams {
            name: name.into(),
            closure_voicing_dur: 0.01,
            closure_dur: closure,
            f1_offset: 400.0,
            f1_steady: 700.0,
            f0_offset: 110.0,
            f0_steady: 120.0,
        }
    }

    #[test]
    fn rows_are_grouped_by_stop_voicing() {
        let rows = vec![
            row("s_x_b_aa_0", 0.05),
            row("s_x_d_aa_1", 0.07),
            row("s_x_t_aa_2", 0.1),
            row("s_x_z_aa_3", 0.2),
            row("broken", 0.3),
        ];
        let summaries = summarize_params(&rows, 5);
        assert_eq!(summaries.len(), MEASURES.len() * 2);
        let closure_voiced = &summaries[0];
        assert_eq!(closure_voiced.measure, "ClosureDur");
        assert_eq!(closure_voiced.group, StopVoicing::Voiced);
        assert_eq!(closure_voiced.stats.unwrap().count, 2);
        assert_eq!(closure_voiced.histogram.counts.iter().sum::<usize>(), 2);
        let closure_voiceless = &summaries[1];
        assert_eq!(closure_voiceless.stats.unwrap().max, 0.1);
    }

    #[test]
    fn tables_have_expected_headers() {
        let dir = tempfile::TempDir::new().unwrap();
        let summaries = summarize_params(&[row("s_x_b_aa_0", 0.05)], 3);
        let hist = dir.path().join("hist.csv");
        let stats = dir.path().join("stats.csv");
        write_histograms(&hist, &summaries).unwrap();
        write_stats(&stats, &summaries).unwrap();
        let hist = std::fs::read_to_string(hist).unwrap();
        assert!(hist.starts_with(
            "measure,group,bin_start,bin_end,count\nClosureDur,voiced,0.05,0.05,1\n"
        ));
        let stats = std::fs::read_to_string(stats).unwrap();
        assert!(stats.starts_with("measure,group,count,mean,std,min,max\n"));
        assert_eq!(stats.lines().count(), 1 + MEASURES.len());
    }
}
