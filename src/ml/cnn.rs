//! WaveGAN-discriminator style 1-D convolutional classifier.

use burn::module::Module;
use burn::nn::conv::{Conv1d, Conv1dConfig};
use burn::nn::{BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig1d};
use burn::tensor::activation::{leaky_relu, softmax};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::config::{DataSettings, ModelSettings};

const LEAKY_SLOPE: f64 = 0.2;

pub const FLATTEN_LAYER: &str = "flatten";
pub const DENSE_LAYER: &str = "dense";
pub const SOFTMAX_LAYER: &str = "softmax";

/// Architecture of [`WaveCnn`]; stored in the checkpoint manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveCnnConfig {
    pub kernel_len: usize,
    pub dim: usize,
    pub use_batchnorm: bool,
    pub num_layers: usize,
    pub stride: usize,
    pub input_channels: usize,
    pub slice_len: usize,
    pub num_classes: usize,
}

impl WaveCnnConfig {
    pub fn new(model: &ModelSettings, data: &DataSettings, num_classes: usize) -> Self {
        Self {
            kernel_len: model.kernel_len.max(1),
            dim: model.dim.max(1),
            use_batchnorm: model.use_batchnorm,
            num_layers: model.num_layers.max(1),
            stride: model.stride.max(1),
            input_channels: data.num_channels.max(1) as usize,
            slice_len: data.slice_len.max(1),
            num_classes,
        }
    }

    fn padding(&self) -> usize {
        (self.kernel_len - 1) / 2
    }

    /// Filters produced by down-convolution `layer`.
    pub fn filters(&self, layer: usize) -> usize {
        self.dim << layer
    }

    /// `(channels, length)` after every down-convolution.
    pub fn layer_shapes(&self) -> Vec<(usize, usize)> {
        let mut len = self.slice_len;
        (0..self.num_layers)
            .map(|layer| {
                len = (len + 2 * self.padding()).saturating_sub(self.kernel_len) / self.stride + 1;
                (self.filters(layer), len)
            })
            .collect()
    }

    pub fn flattened_len(&self) -> usize {
        self.layer_shapes()
            .last()
            .map(|(channels, len)| channels * len)
            .unwrap_or(self.input_channels * self.slice_len)
    }

    /// Names accepted by [`WaveCnn::forward_activations`], in network order.
    pub fn layer_names(&self) -> Vec<String> {
        let mut names: Vec<String> = (0..self.num_layers)
            .map(|layer| format!("downconv_{layer}"))
            .collect();
        names.extend([FLATTEN_LAYER, DENSE_LAYER, SOFTMAX_LAYER].map(String::from));
        names
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> WaveCnn<B> {
        let mut in_channels = self.input_channels;
        let blocks = (0..self.num_layers)
            .map(|layer| {
                let out_channels = self.filters(layer);
                let conv = Conv1dConfig::new(in_channels, out_channels, self.kernel_len)
                    .with_stride(self.stride)
                    .with_padding(PaddingConfig1d::Explicit(self.padding()))
                    .init(device);
                let norm = self
                    .use_batchnorm
                    .then(|| BatchNormConfig::new(out_channels).init(device));
                in_channels = out_channels;
                DownConvBlock { conv, norm }
            })
            .collect();
        WaveCnn {
            blocks,
            dense: LinearConfig::new(self.flattened_len(), self.num_classes).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct DownConvBlock<B: Backend> {
    conv: Conv1d<B>,
    norm: Option<BatchNorm<B>>,
}

impl<B: Backend> DownConvBlock<B> {
    fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = self.conv.forward(input);
        let x = match &self.norm {
            Some(norm) => norm.forward(x),
            None => x,
        };
        leaky_relu(x, LEAKY_SLOPE)
    }
}

/// Down-convolutions, flatten, one dense layer.
#[derive(Module, Debug)]
pub struct WaveCnn<B: Backend> {
    blocks: Vec<DownConvBlock<B>>,
    dense: Linear<B>,
}

impl<B: Backend> WaveCnn<B> {
    /// Logits for `[batch, channels, slice_len]` input.
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 2> {
        let x = self
            .blocks
            .iter()
            .fold(input, |x, block| block.forward(x));
        self.dense.forward(x.flatten(1, 2))
    }

    pub fn probabilities(&self, input: Tensor<B, 3>) -> Tensor<B, 2> {
        softmax(self.forward(input), 1)
    }

    /// Every named layer output, each flattened to `[batch, features]`.
    pub fn forward_activations(&self, input: Tensor<B, 3>) -> Vec<(String, Tensor<B, 2>)> {
        let mut activations = Vec::with_capacity(self.blocks.len() + 3);
        let mut x = input;
        for (layer, block) in self.blocks.iter().enumerate() {
            x = block.forward(x);
            activations.push((format!("downconv_{layer}"), x.clone().flatten(1, 2)));
        }
        let flat: Tensor<B, 2> = x.flatten(1, 2);
        activations.push((FLATTEN_LAYER.to_string(), flat.clone()));
        let logits = self.dense.forward(flat);
        activations.push((DENSE_LAYER.to_string(), logits.clone()));
        activations.push((SOFTMAX_LAYER.to_string(), softmax(logits, 1)));
        activations
    }
}
