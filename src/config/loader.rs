//! Configuration Loader
//!
//! Finds and parses the scheduler configuration from conventional locations.

use crate::config::schema::SchedulerConfig;
use crate::error::{KeywheelError, Result};
use std::path::{Path, PathBuf};

/// Loads a [`SchedulerConfig`] from JSON files
#[derive(Debug)]
pub struct ConfigLoader {
    config: SchedulerConfig,
}

impl ConfigLoader {
    /// Load from the first config file found in the default locations
    ///
    /// Also loads a `.env` file from the working directory, if present, so
    /// that environment-based credentials resolve without extra setup.
    pub fn new() -> Result<Self> {
        let _ = dotenvy::dotenv();

        for path in Self::config_paths() {
            if path.exists() {
                return Self::from_path(&path);
            }
        }

        Err(KeywheelError::InvalidConfiguration(
            "no config file found: create keywheel.json or set KEYWHEEL_CONFIG_PATH".to_string(),
        ))
    }

    /// Load from a specific config file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            KeywheelError::InvalidConfiguration(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: SchedulerConfig = serde_json::from_str(&content).map_err(|e| {
            KeywheelError::InvalidConfiguration(format!(
                "failed to parse {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(Self { config })
    }

    /// Candidate config paths, in priority order
    fn config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. Environment variable
        if let Ok(custom_path) = std::env::var("KEYWHEEL_CONFIG_PATH") {
            paths.push(PathBuf::from(custom_path));
        }

        // 2. Current directory
        paths.push(PathBuf::from("keywheel.json"));

        // 3. User config directory
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("keywheel").join("config.json"));
        }

        // 4. Home directory
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".keywheel").join("config.json"));
        }

        paths
    }

    /// Borrow the loaded configuration
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Take ownership of the configuration
    pub fn into_config(self) -> SchedulerConfig {
        self.config
    }
}
