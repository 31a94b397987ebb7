use std::env;
use std::sync::OnceLock;

use burn::backend::Autodiff;
use burn::backend::ndarray::{NdArray, NdArrayDevice};
#[cfg(target_os = "macos")]
use burn::backend::wgpu::{self, WgpuDevice, graphics::Metal};
#[cfg(not(target_os = "macos"))]
use burn::backend::wgpu::{self, WgpuDevice, graphics::Vulkan};
use tracing::warn;

use crate::config::BackendChoice;

/// Environment variable overriding the configured backend (`cpu` or `wgpu`).
pub const BACKEND_ENV: &str = "WAVECNN_BACKEND";

pub type CpuBackend = NdArray;
pub type CpuDevice = NdArrayDevice;
pub type WgpuBackend = wgpu::Wgpu;
pub type GpuDevice = WgpuDevice;

pub type CpuTrainBackend = Autodiff<CpuBackend>;
pub type WgpuTrainBackend = Autodiff<WgpuBackend>;

static WGPU_INIT: OnceLock<()> = OnceLock::new();

/// Resolve the backend, letting [`BACKEND_ENV`] win over the configured choice.
pub fn resolve_backend(configured: BackendChoice) -> BackendChoice {
    let requested = env::var(BACKEND_ENV)
        .ok()
        .map(|value| value.trim().to_ascii_lowercase());
    match requested.as_deref() {
        None | Some("") => configured,
        Some("cpu") | Some("ndarray") => BackendChoice::Cpu,
        Some("wgpu") | Some("vulkan") | Some("metal") | Some("gpu") => BackendChoice::Wgpu,
        Some(other) => {
            warn!("Unknown backend '{other}', using {configured:?}.");
            configured
        }
    }
}

pub(crate) fn wgpu_device() -> GpuDevice {
    let device = WgpuDevice::default();
    WGPU_INIT.get_or_init(|| {
        #[cfg(target_os = "macos")]
        wgpu::init_setup::<Metal>(&device, Default::default());
        #[cfg(not(target_os = "macos"))]
        wgpu::init_setup::<Vulkan>(&device, Default::default());
    });
    device
}
