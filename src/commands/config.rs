use std::path::PathBuf;

use crate::error::OcrError;
use crate::services::config::ConfigManager;

/// Effective configuration as pretty JSON
pub fn show_config(manager: &ConfigManager) -> Result<String, OcrError> {
    let config = manager.load()?;
    Ok(serde_json::to_string_pretty(&config)?)
}

/// Write the current (or default) configuration to disk and return its path
pub fn init_config(manager: &ConfigManager) -> Result<PathBuf, OcrError> {
    let config = manager.load()?;
    manager.save(&config)?;
    Ok(manager.config_file_path().clone())
}
