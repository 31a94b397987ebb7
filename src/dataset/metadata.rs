//! Placeholder label tables derived from file names.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;

use super::{DatasetError, labels::CATEGORY_COLUMN, labels::FILE_ID_COLUMN};

/// One `FileID,Category` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataRow {
    #[serde(rename = "FileID")]
    pub file_id: String,
    #[serde(rename = "Category")]
    pub category: String,
}

/// Build rows for every file in `dir`: the token is the file name up to its first `.`, and
/// the token's last character is its category.
pub fn build_metadata(dir: &Path) -> Result<Vec<MetadataRow>, DatasetError> {
    let io_err = |source| DatasetError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut tokens = BTreeSet::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let token = name.split('.').next().unwrap_or_default();
        if !token.is_empty() {
            tokens.insert(token.to_string());
        }
    }
    Ok(tokens
        .into_iter()
        .filter_map(|token| {
            let category = token.chars().last()?.to_string();
            Some(MetadataRow {
                file_id: format!("{token}.wav"),
                category,
            })
        })
        .collect())
}

/// Write rows sorted by file id.
pub fn write_metadata(path: &Path, rows: &[MetadataRow]) -> Result<(), DatasetError> {
    let csv_err = |source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| DatasetError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let mut sorted: Vec<&MetadataRow> = rows.iter().collect();
    sorted.sort_by(|a, b| a.file_id.cmp(&b.file_id));
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    if sorted.is_empty() {
        writer
            .write_record([FILE_ID_COLUMN, CATEGORY_COLUMN])
            .map_err(csv_err)?;
    }
    for row in sorted {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::read_labels;
    use tempfile::TempDir;

    #[test]
    fn tokens_come_from_file_names() {
        let dir = TempDir::new().unwrap();
        for name in ["aba_b.wav", "aba_b.TextGrid", "apa_p.wav", "notes"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.dir")).unwrap();
        let rows = build_metadata(dir.path()).unwrap();
        assert_eq!(
            rows,
            vec![
                MetadataRow {
                    file_id: "aba_b.wav".into(),
                    category: "b".into()
                },
                MetadataRow {
                    file_id: "apa_p.wav".into(),
                    category: "p".into()
                },
                MetadataRow {
                    file_id: "notes.wav".into(),
                    category: "s".into()
                },
            ]
        );
    }

    #[test]
    fn written_table_reads_back_as_labels() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meta").join("gold.csv");
        let rows = vec![
            MetadataRow {
                file_id: "z.wav".into(),
                category: "voiceless".into(),
            },
            MetadataRow {
                file_id: "a.wav".into(),
                category: "voiced".into(),
            },
        ];
        write_metadata(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("FileID,Category\na.wav,voiced\n"));
        let labels = read_labels(&path).unwrap();
        assert_eq!(labels["z.wav"], "voiceless");
    }
}
