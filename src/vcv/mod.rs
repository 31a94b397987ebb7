//! Vowel-consonant-vowel token records and their measurement from annotated recordings.

mod measure;
mod tokens_csv;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::audio::AudioError;
use crate::textgrid::TextGridError;

pub use measure::{VcvDistributions, measure_directory, read_measurements};
pub use tokens_csv::{read_tokens_csv, write_tokens_csv};

#[derive(Debug, Error)]
pub enum MeasureError {
    #[error(transparent)]
    TextGrid(#[from] TextGridError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("{path} has no `{tier}` tier")]
    MissingTier { path: PathBuf, tier: String },
    #[error("{path}: {what}")]
    MissingInterval { path: PathBuf, what: &'static str },
    #[error("Cannot read vowel and stop labels from file name {0}")]
    BadName(PathBuf),
    #[error("Failed to list {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("{path} is missing column `{column}`")]
    MissingColumn { path: PathBuf, column: String },
    #[error("{path}: invalid number `{value}` in column `{column}`")]
    BadNumber {
        path: PathBuf,
        column: String,
        value: String,
    },
}

/// Laryngeal class of a stop label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StopVoicing {
    Voiced,
    Voiceless,
    Unclassified,
}

impl StopVoicing {
    pub fn of_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "b" | "d" | "g" => StopVoicing::Voiced,
            "p" | "t" | "k" => StopVoicing::Voiceless,
            _ => StopVoicing::Unclassified,
        }
    }

    /// Category name written to metadata tables.
    pub fn category(self) -> &'static str {
        match self {
            StopVoicing::Voiced => "voiced",
            StopVoicing::Voiceless => "voiceless",
            StopVoicing::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for StopVoicing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.category())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub label: String,
    /// Seconds of voicing inside the closure.
    pub voicing_dur: Option<f32>,
    pub closure_dur: Option<f32>,
}

impl Stop {
    pub fn voicing(&self) -> StopVoicing {
        StopVoicing::of_label(&self.label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Measure {
    F0,
    F1,
    F2,
    F3,
    F4,
    F5,
}

impl Measure {
    pub const ALL: [Measure; 6] = [
        Measure::F0,
        Measure::F1,
        Measure::F2,
        Measure::F3,
        Measure::F4,
        Measure::F5,
    ];

    /// Formant number, or `None` for f0.
    pub fn formant_number(self) -> Option<usize> {
        match self {
            Measure::F0 => None,
            other => Some(other as usize),
        }
    }

    pub fn column_prefix(self) -> &'static str {
        match self {
            Measure::F0 => "f0",
            Measure::F1 => "F1",
            Measure::F2 => "F2",
            Measure::F3 => "F3",
            Measure::F4 => "F4",
            Measure::F5 => "F5",
        }
    }
}

/// Where in a vowel a measurement is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Position {
    /// Interval midpoint.
    Steady,
    /// Boundary shared with the stop closure.
    Transition,
}

impl Position {
    pub const ALL: [Position; 2] = [Position::Steady, Position::Transition];
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vowel {
    pub label: String,
    measurements: [[Option<f32>; 2]; 6],
}

impl Vowel {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            measurements: [[None; 2]; 6],
        }
    }

    pub fn get(&self, measure: Measure, position: Position) -> Option<f32> {
        self.measurements[measure as usize][position as usize]
    }

    pub fn set(&mut self, measure: Measure, position: Position, value: Option<f32>) {
        self.measurements[measure as usize][position as usize] = value.filter(|v| v.is_finite());
    }

    pub fn with(mut self, measure: Measure, position: Position, value: f32) -> Self {
        self.set(measure, position, Some(value));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VcvToken {
    pub name: String,
    pub speaker: String,
    pub stop: Stop,
    pub vowel1: Vowel,
    pub vowel2: Vowel,
}
