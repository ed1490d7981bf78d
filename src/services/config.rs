use crate::error::OcrError;
use crate::models::config::OcrConfig;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "ocr-dispatch";
const CONFIG_FILE: &str = "config.json";

/// Configuration manager for persisted OCR settings
pub struct ConfigManager {
    config_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager for the platform config directory (`<config_dir>/ocr-dispatch/config.json`).
    ///
    /// Nothing is created on disk until [`save`](Self::save).
    pub fn new() -> Result<Self, OcrError> {
        let config_dir = dirs::config_dir().ok_or(OcrError::NoConfigDir)?.join(APP_DIR);
        let config_path = config_dir.join(CONFIG_FILE);

        Ok(Self {
            config_dir,
            config_path,
        })
    }

    /// Manager for an explicit config file
    pub fn at(path: impl AsRef<Path>) -> Self {
        let config_path = path.as_ref().to_path_buf();
        let config_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            config_dir,
            config_path,
        }
    }

    /// Save configuration to disk
    pub fn save(&self, config: &OcrConfig) -> Result<(), OcrError> {
        fs::create_dir_all(&self.config_dir).map_err(|source| OcrError::ConfigIo {
            path: self.config_dir.clone(),
            source,
        })?;

        // Pretty print for human editing
        let json = serde_json::to_string_pretty(config)?;

        fs::write(&self.config_path, json).map_err(|source| OcrError::ConfigIo {
            path: self.config_path.clone(),
            source,
        })
    }

    /// Load configuration from disk
    ///
    /// If config file doesn't exist, returns default configuration
    pub fn load(&self) -> Result<OcrConfig, OcrError> {
        if !self.config_exists() {
            return Ok(OcrConfig::default());
        }

        let content = fs::read_to_string(&self.config_path).map_err(|source| OcrError::ConfigIo {
            path: self.config_path.clone(),
            source,
        })?;

        Ok(serde_json::from_str(&content)?)
    }

    /// Get the config file path
    pub fn config_file_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Check if config file exists
    pub fn config_exists(&self) -> bool {
        self.config_path.exists()
    }
}
