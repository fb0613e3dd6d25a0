/// Configuration loader
use super::schema::Config;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LicenseError, LicenseResult};

/// Load configuration
///
/// An explicit path must exist. Without one, `<executable>.config` next to
/// the binary is used when present (e.g. "kc-licensor.config"), otherwise
/// the defaults.
pub fn load_config(explicit: Option<&Path>) -> LicenseResult<Config> {
    if let Some(path) = explicit {
        return load_from(path);
    }

    match adjacent_config_path() {
        Some(path) if path.is_file() => load_from(&path),
        _ => {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Read, parse and validate a config file
pub fn load_from(path: &Path) -> LicenseResult<Config> {
    // Read config file
    let config_content = fs::read_to_string(path).map_err(|e| {
        LicenseError::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    // Parse JSON config
    let config: Config = serde_json::from_str(&config_content)
        .map_err(|e| LicenseError::Config(format!("Failed to parse config: {}", e)))?;

    // Validate config
    config.validate()?;

    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// `<executable>.config`, if the executable path is known
pub fn adjacent_config_path() -> Option<PathBuf> {
    let exe_path = std::env::current_exe().ok()?;
    Some(PathBuf::from(format!("{}.config", exe_path.display())))
}
