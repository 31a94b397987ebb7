use std::collections::BTreeMap;
use std::path::Path;

use super::DatasetError;

pub const FILE_ID_COLUMN: &str = "FileID";
pub const CATEGORY_COLUMN: &str = "Category";

/// Read a `FileID,Category` table into a map keyed by file id.
///
/// Columns are located by header name, so their order and any extra columns do not matter.
/// A repeated file id keeps its last category.
pub fn read_labels(path: &Path) -> Result<BTreeMap<String, String>, DatasetError> {
    let csv_err = |source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| DatasetError::MissingColumn {
                path: path.to_path_buf(),
                column: name,
            })
    };
    let file_col = column(FILE_ID_COLUMN)?;
    let category_col = column(CATEGORY_COLUMN)?;

    let mut labels = BTreeMap::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let (Some(file_id), Some(category)) = (record.get(file_col), record.get(category_col))
        else {
            continue;
        };
        if file_id.is_empty() {
            continue;
        }
        labels.insert(file_id.to_string(), category.to_string());
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn columns_are_found_by_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gold.csv");
        std::fs::write(
            &path,
            "Speaker,Category,FileID\ns1,voiced,aba.wav\ns2, voiceless ,apa.wav\n",
        )
        .unwrap();
        let labels = read_labels(&path).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["aba.wav"], "voiced");
        assert_eq!(labels["apa.wav"], "voiceless");
    }

    #[test]
    fn missing_category_column_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gold.csv");
        std::fs::write(&path, "FileID,Label\naba.wav,voiced\n").unwrap();
        let err = read_labels(&path).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::MissingColumn {
                column: "Category",
                ..
            }
        ));
    }
}
