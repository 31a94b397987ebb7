mod support;

use std::path::Path;

use support::wav::{tone, write_test_wav};
use tempfile::TempDir;
use wavecnn::config::{AppSettings, BackendChoice};
use wavecnn::dataset::load_dataset;
use wavecnn::discrimination::{distance_table, write_distance_table};
use wavecnn::ml::{evaluate, load_model, predict_dir, save_model, train_model, write_predictions};

const RATE: u32 = 8_000;
const SLICE: usize = 64;

fn settings() -> AppSettings {
    let mut settings = AppSettings::default();
    settings.data.sample_rate = RATE;
    settings.data.slice_len = SLICE;
    settings.data.batch_size = 3;
    settings.model.dim = 2;
    settings.model.num_layers = 2;
    settings.model.kernel_len = 5;
    settings.training.epochs = 2;
    settings.training.backend = BackendChoice::Cpu;
    settings
}

/// Four low tones labeled `voiced` and four high tones labeled `voiceless`.
fn write_corpus(dir: &Path) -> std::path::PathBuf {
    let audio = dir.join("audio");
    let mut labels = String::from("FileID,Category\n");
    for i in 0..8 {
        let (category, frequency) = if i % 2 == 0 {
            ("voiced", 200.0)
        } else {
            ("voiceless", 1_500.0)
        };
        let name = format!("tok{i}.wav");
        // Longer than the slice so the loader has to cut it.
        write_test_wav(&audio.join(&name), &tone(SLICE + 40, RATE, frequency + i as f32), RATE);
        labels.push_str(&format!("{name},{category}\n"));
    }
    std::fs::write(audio.join("notes.txt"), "not audio").unwrap();
    let labels_path = dir.join("labels.csv");
    std::fs::write(&labels_path, labels).unwrap();
    labels_path
}

#[test]
fn train_save_reload_predict_and_evaluate() {
    let dir = TempDir::new().unwrap();
    let labels = write_corpus(dir.path());
    let settings = settings();

    let dataset = load_dataset(&dir.path().join("audio"), &labels, &settings.data).unwrap();
    assert_eq!(dataset.len(), 8);
    let (classifier, report) = train_model(dataset, &settings).unwrap();
    assert_eq!(report.epochs.len(), 2);
    assert_eq!(classifier.categories(), &["voiced", "voiceless"]);

    let model_dir = dir.path().join("model");
    save_model(&classifier, &model_dir).unwrap();
    let reloaded = load_model(&model_dir, BackendChoice::Cpu).unwrap();
    assert_eq!(reloaded.manifest.data.slice_len, SLICE);

    let predictions = predict_dir(&reloaded, &dir.path().join("audio")).unwrap();
    assert_eq!(predictions.len(), 8);
    assert_eq!(predictions[0].file_id, "tok0.wav");
    for prediction in &predictions {
        assert_eq!(prediction.probabilities.len(), 2);
        assert!((prediction.probabilities.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        assert!(reloaded.categories().contains(&prediction.category));
    }
    let original = predict_dir(&classifier, &dir.path().join("audio")).unwrap();
    for (a, b) in original.iter().zip(&predictions) {
        for (pa, pb) in a.probabilities.iter().zip(&b.probabilities) {
            assert!((pa - pb).abs() < 1e-5);
        }
    }

    let evaluation = evaluate(&reloaded, &predictions, &labels).unwrap();
    assert_eq!(evaluation.unmatched, 0);
    assert_eq!(evaluation.confusion.total(), 8);
    assert!((0.0..=1.0).contains(&evaluation.accuracy));
    assert_eq!(evaluation.per_class.len(), 2);

    let out = dir.path().join("predictions.csv");
    write_predictions(&out, reloaded.categories(), &predictions).unwrap();
    let text = std::fs::read_to_string(out).unwrap();
    assert!(text.starts_with("FileID,Predicted,voiced,voiceless\n"));
    assert_eq!(text.lines().count(), 9);
}

#[test]
fn discrimination_compares_hidden_activations() {
    let dir = TempDir::new().unwrap();
    let labels = write_corpus(dir.path());
    let settings = settings();
    let dataset = load_dataset(&dir.path().join("audio"), &labels, &settings.data).unwrap();
    let (classifier, _) = train_model(dataset, &settings).unwrap();

    let pairs = dir.path().join("pairs.csv");
    std::fs::write(
        &pairs,
        "Stimulus1,Stimulus2\naudio/tok0.wav,audio/tok0.wav\naudio/tok0.wav,audio/tok1.wav\n",
    )
    .unwrap();
    let rows = distance_table(&classifier, "softmax", &pairs).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].distance.abs() < 1e-4);
    assert!(rows[1].distance > -1e-4 && rows[1].distance < 2.0 + 1e-4);

    let out = dir.path().join("distances.csv");
    write_distance_table(&out, &rows).unwrap();
    let text = std::fs::read_to_string(out).unwrap();
    assert!(text.starts_with("Stimulus1,Stimulus2,Layer,CosineDistance\n"));

    assert!(distance_table(&classifier, "downconv_9", &pairs).is_err());
}
