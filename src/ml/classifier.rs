use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

use super::backend::{CpuBackend, CpuDevice, GpuDevice, WgpuBackend};
use super::checkpoint::ModelManifest;
use super::cnn::WaveCnn;
use super::ModelError;

pub(crate) enum ClassifierInner {
    Cpu {
        model: WaveCnn<CpuBackend>,
        device: CpuDevice,
    },
    Wgpu {
        model: WaveCnn<WgpuBackend>,
        device: GpuDevice,
    },
}

/// A trained network on its inference backend, plus the manifest describing it.
pub struct Classifier {
    pub(crate) inner: ClassifierInner,
    pub manifest: ModelManifest,
}

impl Classifier {
    pub fn categories(&self) -> &[String] {
        &self.manifest.categories
    }

    fn example_len(&self) -> usize {
        self.manifest.architecture.input_channels * self.manifest.architecture.slice_len
    }

    /// Class probabilities for `batch` channel-major examples laid end to end.
    pub fn probabilities(&self, audio: &[f32], batch: usize) -> Result<Vec<Vec<f32>>, ModelError> {
        self.check_input(audio, batch)?;
        let (channels, slice_len) = self.input_shape();
        match &self.inner {
            ClassifierInner::Cpu { model, device } => {
                let input = audio_tensor::<CpuBackend>(audio, batch, channels, slice_len, device);
                tensor_rows(model.probabilities(input))
            }
            ClassifierInner::Wgpu { model, device } => {
                let input = audio_tensor::<WgpuBackend>(audio, batch, channels, slice_len, device);
                tensor_rows(model.probabilities(input))
            }
        }
    }

    /// Per-layer activations for every example, keyed by layer name.
    pub fn activations(
        &self,
        audio: &[f32],
        batch: usize,
    ) -> Result<Vec<(String, Vec<Vec<f32>>)>, ModelError> {
        self.check_input(audio, batch)?;
        let (channels, slice_len) = self.input_shape();
        match &self.inner {
            ClassifierInner::Cpu { model, device } => {
                let input = audio_tensor::<CpuBackend>(audio, batch, channels, slice_len, device);
                activation_rows(model, input)
            }
            ClassifierInner::Wgpu { model, device } => {
                let input = audio_tensor::<WgpuBackend>(audio, batch, channels, slice_len, device);
                activation_rows(model, input)
            }
        }
    }

    fn input_shape(&self) -> (usize, usize) {
        let arch = &self.manifest.architecture;
        (arch.input_channels, arch.slice_len)
    }

    fn check_input(&self, audio: &[f32], batch: usize) -> Result<(), ModelError> {
        let expected = self.example_len() * batch;
        if audio.len() != expected || batch == 0 {
            return Err(ModelError::InputShape {
                expected,
                found: audio.len(),
            });
        }
        Ok(())
    }
}

fn activation_rows<B: Backend>(
    model: &WaveCnn<B>,
    input: Tensor<B, 3>,
) -> Result<Vec<(String, Vec<Vec<f32>>)>, ModelError> {
    model
        .forward_activations(input)
        .into_iter()
        .map(|(name, tensor)| Ok((name, tensor_rows(tensor)?)))
        .collect()
}

pub(crate) fn audio_tensor<B: Backend>(
    audio: &[f32],
    batch: usize,
    channels: usize,
    slice_len: usize,
    device: &B::Device,
) -> Tensor<B, 3> {
    let data = TensorData::new(audio.to_vec(), [batch, channels, slice_len]);
    Tensor::<B, 3>::from_data(data, device)
}

pub(crate) fn tensor_rows<B: Backend>(tensor: Tensor<B, 2>) -> Result<Vec<Vec<f32>>, ModelError> {
    let [rows, cols] = tensor.dims();
    let flat = tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|err| ModelError::Tensor(format!("{err:?}")))?;
    if flat.len() != rows * cols {
        return Err(ModelError::Tensor(format!(
            "expected {} values, got {}",
            rows * cols,
            flat.len()
        )));
    }
    Ok(flat.chunks(cols.max(1)).map(<[f32]>::to_vec).collect())
}
