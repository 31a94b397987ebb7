use std::path::Path;

use tracing::{info, warn};

use crate::audio::{DecodeOptions, decode_audio};
use crate::dataset::{first_slice, list_audio_files, read_labels};

use super::classifier::Classifier;
use super::metrics::{ConfusionMatrix, PerClassStats, accuracy, argmax, precision_recall_by_class};
use super::ModelError;

/// Predicted category of one file.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub file_id: String,
    pub category: String,
    /// Softmax output in category order.
    pub probabilities: Vec<f32>,
}

/// Classify every audio file in `dir`, decoding them the way the model was trained.
pub fn predict_dir(classifier: &Classifier, dir: &Path) -> Result<Vec<Prediction>, ModelError> {
    let files = list_audio_files(dir)?;
    let data = &classifier.manifest.data;
    let options = DecodeOptions::from(data);
    let channels = classifier.manifest.architecture.input_channels;
    let slice_len = classifier.manifest.architecture.slice_len;
    let mut predictions = Vec::with_capacity(files.len());
    for chunk in files.chunks(data.batch_size.max(1)) {
        let mut audio = Vec::with_capacity(chunk.len() * channels * slice_len);
        for path in chunk {
            let clip = decode_audio(path, &options)?;
            audio.extend(first_slice(&clip.samples, channels, slice_len));
        }
        let rows = classifier.probabilities(&audio, chunk.len())?;
        for (path, probabilities) in chunk.iter().zip(rows) {
            let file_id = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let category = argmax(&probabilities)
                .and_then(|index| classifier.categories().get(index))
                .cloned()
                .unwrap_or_default();
            predictions.push(Prediction {
                file_id,
                category,
                probabilities,
            });
        }
    }
    info!("Predicted {} files in {}", predictions.len(), dir.display());
    Ok(predictions)
}

/// Accuracy and per-class statistics against a label table.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub confusion: ConfusionMatrix,
    pub accuracy: f32,
    pub per_class: Vec<PerClassStats>,
    /// Predictions whose file id or label was not found in the table.
    pub unmatched: usize,
}

pub fn evaluate(
    classifier: &Classifier,
    predictions: &[Prediction],
    labels_csv: &Path,
) -> Result<EvaluationReport, ModelError> {
    let labels = read_labels(labels_csv)?;
    let categories = classifier.categories();
    let index_of = |name: &str| categories.iter().position(|c| c == name);
    let mut confusion = ConfusionMatrix::new(categories.len());
    let mut unmatched = 0;
    for prediction in predictions {
        let truth = labels.get(&prediction.file_id).and_then(|label| index_of(label));
        match (truth, index_of(&prediction.category)) {
            (Some(truth), Some(predicted)) => confusion.add(truth, predicted),
            _ => {
                warn!("No usable label for {}", prediction.file_id);
                unmatched += 1;
            }
        }
    }
    Ok(EvaluationReport {
        accuracy: accuracy(&confusion),
        per_class: precision_recall_by_class(&confusion, categories),
        confusion,
        unmatched,
    })
}

/// Write `FileID,Predicted,<category>...` rows.
pub fn write_predictions(
    path: &Path,
    categories: &[String],
    predictions: &[Prediction],
) -> Result<(), ModelError> {
    let csv_err = |source| ModelError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    let mut header = vec!["FileID".to_string(), "Predicted".to_string()];
    header.extend(categories.iter().cloned());
    writer.write_record(&header).map_err(csv_err)?;
    for prediction in predictions {
        let mut record = vec![prediction.file_id.clone(), prediction.category.clone()];
        record.extend(prediction.probabilities.iter().map(|p| format!("{p:.6}")));
        writer.write_record(&record).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })
}
