//! YAML configuration loading for training runs.
//!
//! Loads [`TrainSettings`] from a YAML file on disk. Every field is optional
//! in the file; omitted fields keep their defaults.

use lungrisk_core::TrainSettings;
use std::path::Path;

/// Load [`TrainSettings`] from a YAML file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the YAML is invalid, or the
/// resulting settings fail validation.
pub fn load_settings(path: &Path) -> anyhow::Result<TrainSettings> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
    let settings: TrainSettings = serde_yaml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config YAML: {}", e))?;
    settings.validate()?;
    Ok(settings)
}
