//! Flat CSV form of measured tokens; an empty cell is an undefined measurement.

use std::collections::HashMap;
use std::path::Path;

use super::{Measure, MeasureError, Position, Stop, VcvToken, Vowel};

const REQUIRED: [&str; 5] = ["Name", "Stop", "Vowel", "ClosureVoicingDur", "ClosureDur"];

fn vowel_column(second: bool, measure: Measure, position: Position) -> String {
    let prefix = measure.column_prefix();
    match (second, position) {
        (false, Position::Steady) => format!("{prefix}steady"),
        (false, Position::Transition) => format!("{prefix}offset"),
        (true, Position::Steady) => format!("V2{prefix}steady"),
        (true, Position::Transition) => format!("V2{prefix}onset"),
    }
}

fn vowel_columns(second: bool) -> impl Iterator<Item = (Measure, Position, String)> {
    Measure::ALL.into_iter().flat_map(move |measure| {
        Position::ALL
            .into_iter()
            .map(move |position| (measure, position, vowel_column(second, measure, position)))
    })
}

fn header() -> Vec<String> {
    let mut columns: Vec<String> = [
        "Name",
        "Speaker",
        "Stop",
        "Vowel",
        "ClosureVoicingDur",
        "ClosureDur",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();
    columns.extend(vowel_columns(false).map(|(_, _, name)| name));
    columns.extend(vowel_columns(true).map(|(_, _, name)| name));
    columns
}

fn cell(value: Option<f32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn write_tokens_csv<'a>(
    path: &Path,
    tokens: impl IntoIterator<Item = &'a VcvToken>,
) -> Result<(), MeasureError> {
    let csv_err = |source| MeasureError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(header()).map_err(csv_err)?;
    for token in tokens {
        let mut record = vec![
            token.name.clone(),
            token.speaker.clone(),
            token.stop.label.clone(),
            token.vowel1.label.clone(),
            cell(token.stop.voicing_dur),
            cell(token.stop.closure_dur),
        ];
        record.extend(vowel_columns(false).map(|(m, p, _)| cell(token.vowel1.get(m, p))));
        record.extend(vowel_columns(true).map(|(m, p, _)| cell(token.vowel2.get(m, p))));
        writer.write_record(&record).map_err(csv_err)?;
    }
    writer
        .flush()
        .map_err(|source| csv_err(csv::Error::from(source)))
}

pub fn read_tokens_csv(path: &Path) -> Result<Vec<VcvToken>, MeasureError> {
    let csv_err = |source| MeasureError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;
    let columns: HashMap<String, usize> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .enumerate()
        .map(|(index, name)| (name.to_string(), index))
        .collect();
    for required in REQUIRED {
        if !columns.contains_key(required) {
            return Err(MeasureError::MissingColumn {
                path: path.to_path_buf(),
                column: required.to_string(),
            });
        }
    }

    let mut tokens = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let text = |column: &str| {
            columns
                .get(column)
                .and_then(|&index| record.get(index))
                .unwrap_or_default()
                .to_string()
        };
        let number = |column: &str| -> Result<Option<f32>, MeasureError> {
            let raw = text(column);
            if raw.is_empty() {
                return Ok(None);
            }
            raw.parse::<f32>()
                .map(Some)
                .map_err(|_| MeasureError::BadNumber {
                    path: path.to_path_buf(),
                    column: column.to_string(),
                    value: raw.clone(),
                })
        };
        let label = text("Vowel");
        let mut vowel1 = Vowel::new(label.clone());
        for (measure, position, column) in vowel_columns(false) {
            vowel1.set(measure, position, number(&column)?);
        }
        let mut vowel2 = Vowel::new(label);
        for (measure, position, column) in vowel_columns(true) {
            vowel2.set(measure, position, number(&column)?);
        }
        tokens.push(VcvToken {
            name: text("Name"),
            speaker: text("Speaker"),
            stop: Stop {
                label: text("Stop"),
                voicing_dur: number("ClosureVoicingDur")?,
                closure_dur: number("ClosureDur")?,
            },
            vowel1,
            vowel2,
        });
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn undefined_measurements_survive_a_write_and_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.csv");
        let token = VcvToken {
            name: "aa_b_01".into(),
            speaker: "s1".into(),
            stop: Stop {
                label: "b".into(),
                voicing_dur: Some(0.04),
                closure_dur: Some(0.09),
            },
            vowel1: Vowel::new("aa")
                .with(Measure::F0, Position::Steady, 120.0)
                .with(Measure::F1, Position::Transition, 540.5),
            vowel2: Vowel::new("aa").with(Measure::F2, Position::Transition, 1_500.0),
        };
        write_tokens_csv(&path, [&token]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(
            "Name,Speaker,Stop,Vowel,ClosureVoicingDur,ClosureDur,\
             f0steady,f0offset,F1steady,F1offset"
        ));
        let read = read_tokens_csv(&path).unwrap();
        assert_eq!(read, vec![token]);
    }

    #[test]
    fn minimal_tables_need_only_the_stop_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("min.csv");
        std::fs::write(
            &path,
            "Name,Stop,Vowel,ClosureVoicingDur,ClosureDur,f0steady\nx,p,ii,0.01,0.1,\ny,b,ii,,,\n",
        )
        .unwrap();
        let tokens = read_tokens_csv(&path).unwrap();
        assert_eq!(tokens[0].stop.label, "p");
        assert_eq!(tokens[0].stop.closure_dur, Some(0.1));
        assert_eq!(tokens[1].stop.voicing_dur, None);
        assert_eq!(tokens[1].stop.closure_dur, None);
        assert_eq!(tokens[0].speaker, "");
        assert_eq!(tokens[0].vowel1.get(Measure::F0, Position::Steady), None);
    }

    #[test]
    fn bad_numbers_name_the_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(
            &path,
            "Name,Stop,Vowel,ClosureVoicingDur,ClosureDur\nx,p,ii,abc,0.1\n",
        )
        .unwrap();
        let err = read_tokens_csv(&path).unwrap_err();
        assert!(matches!(
            err,
            MeasureError::BadNumber { ref column, .. } if column == "ClosureVoicingDur"
        ));
    }

    #[test]
    fn missing_required_column_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "Name,Stop,Vowel\nx,p,ii\n").unwrap();
        assert!(matches!(
            read_tokens_csv(&path),
            Err(MeasureError::MissingColumn { .. })
        ));
    }
}
