use serde::{Deserialize, Serialize};

/// All persisted toolkit settings, one table per pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub training: TrainingSettings,
    #[serde(default)]
    pub measurement: MeasurementSettings,
    #[serde(default)]
    pub sampling: SamplingSettings,
    #[serde(default)]
    pub synthesis: SynthesisSettings,
}

impl AppSettings {
    /// Clamp values that would make downstream stages meaningless.
    pub fn normalized(mut self) -> Self {
        self.data.sample_rate = self.data.sample_rate.max(1);
        self.data.num_channels = self.data.num_channels.clamp(1, 2);
        self.data.slice_len = self.data.slice_len.max(1);
        self.data.batch_size = self.data.batch_size.max(1);
        self.model.kernel_len = self.model.kernel_len.max(1);
        self.model.dim = self.model.dim.max(1);
        self.model.num_layers = self.model.num_layers.max(1);
        self.model.stride = self.model.stride.max(1);
        self.training.validation_fraction = self.training.validation_fraction.clamp(0.0, 0.9);
        if !(self.training.learning_rate.is_finite() && self.training.learning_rate > 0.0) {
            self.training.learning_rate = TrainingSettings::default().learning_rate;
        }
        if self.measurement.pitch_ceiling <= self.measurement.pitch_floor {
            let defaults = MeasurementSettings::default();
            self.measurement.pitch_floor = defaults.pitch_floor;
            self.measurement.pitch_ceiling = defaults.pitch_ceiling;
        }
        self.measurement.max_formants = self.measurement.max_formants.clamp(1, 8);
        self.synthesis.sample_rate = self.synthesis.sample_rate.max(8_000);
        self.synthesis.frame_seconds = self.synthesis.frame_seconds.max(0.001);
        self.synthesis.peak = self.synthesis.peak.clamp(0.05, 1.0);
        self
    }
}

/// Audio decoding and batching preferences used for training and inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Decode rate in samples per second.
    pub sample_rate: u32,
    /// Channels fed to the network (1 = mono average, 2 = stereo).
    pub num_channels: u16,
    /// Samples per example; longer clips are cut, shorter clips are zero-padded.
    pub slice_len: usize,
    /// Peak-normalize each decoded clip.
    pub normalize: bool,
    /// Decode with the plain WAV reader only (16-bit PCM or 32-bit float, no resampling).
    pub fast_wav: bool,
    pub batch_size: usize,
    pub shuffle: bool,
    pub seed: u64,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            num_channels: 1,
            slice_len: 16_384,
            normalize: true,
            fast_wav: false,
            batch_size: 64,
            shuffle: true,
            seed: 1,
        }
    }
}

/// Architecture hyper-parameters for the waveform classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub kernel_len: usize,
    /// Filters in the first convolution; doubled at every following layer.
    pub dim: usize,
    pub use_batchnorm: bool,
    pub num_layers: usize,
    pub stride: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            kernel_len: 25,
            dim: 64,
            use_batchnorm: true,
            num_layers: 5,
            stride: 4,
        }
    }
}

/// Compute backend used for training and inference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    #[default]
    Cpu,
    Wgpu,
}

/// Optimizer and schedule settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    pub epochs: usize,
    pub learning_rate: f64,
    pub beta_1: f32,
    /// Gradients are clipped element-wise to `[-clip_value, clip_value]`.
    pub clip_value: f32,
    /// Share of files held out for validation (0 disables validation).
    pub validation_fraction: f32,
    pub backend: BackendChoice,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            epochs: 10,
            learning_rate: 2e-4,
            beta_1: 0.5,
            clip_value: 0.01,
            validation_fraction: 0.0,
            backend: BackendChoice::Cpu,
        }
    }
}

/// Pitch, formant and TextGrid conventions for VCV measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementSettings {
    pub pitch_floor: f32,
    pub pitch_ceiling: f32,
    pub voicing_threshold: f32,
    pub silence_threshold: f32,
    pub max_formants: usize,
    pub max_formant_hz: f32,
    pub formant_window: f32,
    pub pre_emphasis_from: f32,
    /// Offset step in seconds used when a measurement is undefined.
    pub retry_step: f32,
    pub max_retries: usize,
    pub voicing_tier: String,
    pub closure_tier: String,
    pub vowel_tier: String,
}

impl Default for MeasurementSettings {
    fn default() -> Self {
        Self {
            pitch_floor: 75.0,
            pitch_ceiling: 600.0,
            voicing_threshold: 0.45,
            silence_threshold: 0.03,
            max_formants: 5,
            max_formant_hz: 5_500.0,
            formant_window: 0.025,
            pre_emphasis_from: 50.0,
            retry_step: 0.005,
            max_retries: 10,
            voicing_tier: "voicing".to_string(),
            closure_tier: "closure".to_string(),
            vowel_tier: "vowel".to_string(),
        }
    }
}

/// Shape of the perturbation added to sampled parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseKind {
    /// Uniform in `[-margin, margin]`.
    #[default]
    Uniform,
    /// Normal with standard deviation `margin`.
    Gaussian,
}

/// Noise margins and naming for synthetic parameter sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingSettings {
    pub closure_voicing_noise: f32,
    pub closure_duration_noise: f32,
    pub f1_noise: f32,
    pub f0_noise: f32,
    pub noise: NoiseKind,
    /// Draw steady and transition values of a measure from the same token.
    pub paired_vowel_draws: bool,
    pub min_f0: f32,
    pub min_f1: f32,
    pub voiced_count: usize,
    pub voiceless_count: usize,
    pub name_prefix: String,
    pub speaker: String,
    pub seed: u64,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            closure_voicing_noise: 0.02,
            closure_duration_noise: 0.02,
            f1_noise: 50.0,
            f0_noise: 30.0,
            noise: NoiseKind::Uniform,
            paired_vowel_draws: false,
            min_f0: 50.0,
            min_f1: 150.0,
            voiced_count: 500,
            voiceless_count: 500,
            name_prefix: "sampled".to_string(),
            speaker: "synth".to_string(),
            seed: 1,
        }
    }
}

/// Timing and level settings for VCV formant synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    pub sample_rate: u32,
    pub frame_seconds: f32,
    pub vowel_steady_seconds: f32,
    pub transition_seconds: f32,
    pub burst_seconds: f32,
    pub aspiration_voiced_seconds: f32,
    pub aspiration_voiceless_seconds: f32,
    /// Voice bar level relative to modal voicing, in dB.
    pub voice_bar_db: f32,
    /// Output peak after normalization.
    pub peak: f32,
    pub seed: u64,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            frame_seconds: 0.005,
            vowel_steady_seconds: 0.2,
            transition_seconds: 0.05,
            burst_seconds: 0.008,
            aspiration_voiced_seconds: 0.01,
            aspiration_voiceless_seconds: 0.05,
            voice_bar_db: -20.0,
            peak: 0.9,
            seed: 7,
        }
    }
}
