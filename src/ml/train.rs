use burn::module::AutodiffModule;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::grad_clipping::GradientClippingConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Int, Tensor, TensorData};
use tracing::{debug, info};

use crate::config::{AppSettings, BackendChoice};
use crate::dataset::LabeledDataset;

use super::backend::{CpuDevice, CpuTrainBackend, WgpuTrainBackend, resolve_backend, wgpu_device};
use super::checkpoint::{MANIFEST_FORMAT_VERSION, ModelManifest};
use super::classifier::{Classifier, ClassifierInner, audio_tensor, tensor_rows};
use super::cnn::{WaveCnn, WaveCnnConfig};
use super::metrics::{ConfusionMatrix, accuracy, argmax};
use super::ModelError;

/// Loss and validation accuracy after one pass over the training set.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochStats {
    pub epoch: usize,
    pub mean_loss: f32,
    pub validation_accuracy: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainReport {
    pub epochs: Vec<EpochStats>,
    pub train_examples: usize,
    pub validation_examples: usize,
}

impl TrainReport {
    pub fn final_loss(&self) -> Option<f32> {
        self.epochs.last().map(|stats| stats.mean_loss)
    }
}

/// Fit a fresh network on `dataset` with the optimizer and architecture from `settings`.
pub fn train_model(
    dataset: LabeledDataset,
    settings: &AppSettings,
) -> Result<(Classifier, TrainReport), ModelError> {
    if dataset.is_empty() {
        return Err(ModelError::EmptyTraining);
    }
    let categories = dataset.encoder.categories().to_vec();
    let config = WaveCnnConfig::new(&settings.model, &settings.data, categories.len());
    let (train, validation) = dataset.split_validation(settings.training.validation_fraction);
    if train.is_empty() {
        return Err(ModelError::EmptyTraining);
    }
    let backend = resolve_backend(settings.training.backend);
    info!(
        "Training on {} examples ({} held out) with {:?} backend",
        train.len(),
        validation.len(),
        backend
    );
    let (inner, report) = match backend {
        BackendChoice::Cpu => {
            let device = CpuDevice::default();
            let (model, report) =
                fit::<CpuTrainBackend>(&train, &validation, &config, settings, &device)?;
            (ClassifierInner::Cpu { model, device }, report)
        }
        BackendChoice::Wgpu => {
            let device = wgpu_device();
            let (model, report) =
                fit::<WgpuTrainBackend>(&train, &validation, &config, settings, &device)?;
            (ClassifierInner::Wgpu { model, device }, report)
        }
    };
    let manifest = ModelManifest {
        format_version: MANIFEST_FORMAT_VERSION,
        categories,
        architecture: config,
        data: settings.data.clone(),
        epochs: report.epochs.len(),
        final_loss: report.final_loss(),
    };
    Ok((Classifier { inner, manifest }, report))
}

fn fit<B: AutodiffBackend>(
    train: &LabeledDataset,
    validation: &LabeledDataset,
    config: &WaveCnnConfig,
    settings: &AppSettings,
    device: &B::Device,
) -> Result<(WaveCnn<B::InnerBackend>, TrainReport), ModelError> {
    let training = &settings.training;
    let data = &settings.data;
    let mut model = config.init::<B>(device);
    let mut optim = AdamConfig::new()
        .with_beta_1(training.beta_1)
        .with_grad_clipping(Some(GradientClippingConfig::Value(training.clip_value)))
        .init();
    let loss_fn = CrossEntropyLossConfig::new().init(device);

    let mut report = TrainReport {
        epochs: Vec::with_capacity(training.epochs),
        train_examples: train.len(),
        validation_examples: validation.len(),
    };
    for epoch in 0..training.epochs {
        let mut loss_sum = 0.0_f64;
        let mut seen = 0usize;
        let seed = data.seed.wrapping_add(epoch as u64);
        for batch in train.batches(data.batch_size, data.shuffle, seed) {
            let input = audio_tensor::<B>(
                &batch.audio,
                batch.len(),
                batch.channels,
                batch.slice_len,
                device,
            );
            let indices: Vec<i64> = batch.class_indices.iter().map(|&c| c as i64).collect();
            let targets =
                Tensor::<B, 1, Int>::from_data(TensorData::new(indices, [batch.len()]), device);
            let logits = model.forward(input);
            let loss = loss_fn.forward(logits, targets);
            let loss_value: f32 = loss.clone().into_scalar().elem();
            loss_sum += loss_value as f64 * batch.len() as f64;
            seen += batch.len();
            debug!("epoch {} batch loss {loss_value:.5}", epoch + 1);

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(training.learning_rate, model, grads);
        }
        let mean_loss = if seen == 0 {
            0.0
        } else {
            (loss_sum / seen as f64) as f32
        };
        let validation_accuracy = if validation.is_empty() {
            None
        } else {
            let cm = confusion_for(&model.valid(), validation, data.batch_size, device)?;
            Some(accuracy(&cm))
        };
        match validation_accuracy {
            Some(acc) => info!(
                "epoch {}/{}: loss {mean_loss:.5}, validation accuracy {:.3}",
                epoch + 1,
                training.epochs,
                acc
            ),
            None => info!("epoch {}/{}: loss {mean_loss:.5}", epoch + 1, training.epochs),
        }
        report.epochs.push(EpochStats {
            epoch: epoch + 1,
            mean_loss,
            validation_accuracy,
        });
    }
    Ok((model.valid(), report))
}

fn confusion_for<B: Backend>(
    model: &WaveCnn<B>,
    dataset: &LabeledDataset,
    batch_size: usize,
    device: &B::Device,
) -> Result<ConfusionMatrix, ModelError> {
    let mut cm = ConfusionMatrix::new(dataset.encoder.len());
    for batch in dataset.batches(batch_size, false, 0) {
        let input = audio_tensor::<B>(
            &batch.audio,
            batch.len(),
            batch.channels,
            batch.slice_len,
            device,
        );
        let rows = tensor_rows(model.probabilities(input))?;
        for (truth, row) in batch.class_indices.iter().zip(rows) {
            if let Some(predicted) = argmax(&row) {
                cm.add(*truth, predicted);
            }
        }
    }
    Ok(cm)
}
