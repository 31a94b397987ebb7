//! Persisted settings for every pipeline stage, stored as TOML.

mod errors;
mod io;
mod types;

pub use errors::ConfigError;
pub use io::{CONFIG_FILE_NAME, config_path, load, load_from_path, save_to_path};
pub use types::{
    AppSettings, BackendChoice, DataSettings, MeasurementSettings, ModelSettings, NoiseKind,
    SamplingSettings, SynthesisSettings, TrainingSettings,
};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[training]\nepochs = 3\n").unwrap();
        let settings = load_from_path(&path).unwrap();
        assert_eq!(settings.training.epochs, 3);
        assert_eq!(settings.training.beta_1, 0.5);
        assert_eq!(settings.data, DataSettings::default());
        assert_eq!(settings.model.kernel_len, 25);
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let mut settings = AppSettings::default();
        settings.sampling.noise = NoiseKind::Gaussian;
        settings.data.slice_len = 4_096;
        settings.training.backend = BackendChoice::Wgpu;
        save_to_path(&settings, &path).unwrap();
        let loaded = load_from_path(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn normalization_repairs_invalid_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(
            &path,
            "[data]\nbatch_size = 0\nnum_channels = 6\n\
             [measurement]\npitch_floor = 500.0\npitch_ceiling = 100.0\n",
        )
        .unwrap();
        let settings = load_from_path(&path).unwrap();
        assert_eq!(settings.data.batch_size, 1);
        assert_eq!(settings.data.num_channels, 2);
        assert_eq!(settings.measurement.pitch_floor, 75.0);
        assert_eq!(settings.measurement.pitch_ceiling, 600.0);
    }

    #[test]
    fn invalid_toml_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[data\n").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }
}
