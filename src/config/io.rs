use std::path::{Path, PathBuf};

use tracing::debug;

use crate::app_dirs;

use super::{AppSettings, ConfigError};

/// Default filename used to store the toolkit configuration.
pub const CONFIG_FILE_NAME: &str = "wavecnn.toml";

/// Resolve the default configuration file path inside the app root.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

/// Load settings from an explicit path, or from the default location.
///
/// An explicit path must exist. The default location falls back to defaults when absent.
pub fn load(explicit: Option<&Path>) -> Result<AppSettings, ConfigError> {
    match explicit {
        Some(path) => load_from_path(path),
        None => {
            let path = config_path()?;
            if path.exists() {
                load_from_path(&path)
            } else {
                debug!("No config at {}; using defaults", path.display());
                Ok(AppSettings::default())
            }
        }
    }
}

/// Parse a TOML settings file and normalize its values.
pub fn load_from_path(path: &Path) -> Result<AppSettings, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: AppSettings = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(settings.normalized())
}

/// Save settings to a specific path, creating parent directories as needed.
pub fn save_to_path(settings: &AppSettings, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = toml::to_string_pretty(settings).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, data).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
