//! Configuration loading utilities
//!
//! Provides helper functions for loading configuration from various sources
//! with proper error handling and validation.

use crate::{Result, config::Settings};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Configuration loader with multiple source support
#[derive(Debug)]
pub struct ConfigLoader {
    /// Default settings
    defaults: Settings,
}

impl ConfigLoader {
    /// Create new configuration loader
    pub fn new() -> Self {
        Self {
            defaults: Settings::default(),
        }
    }

    /// Load configuration with precedence order:
    /// 1. Command line arguments (highest priority, applied by the caller)
    /// 2. Environment variables
    /// 3. Configuration file
    /// 4. Default values (lowest priority)
    pub fn load(&self, config_file: Option<&Path>) -> Result<Settings> {
        let mut settings = self.defaults.clone();

        let path = config_file.map(Path::to_path_buf).or_else(default_config_file);
        if let Some(path) = path {
            if path.exists() {
                info!("Loading configuration from file: {:?}", path);
                settings = Settings::from_file(&path)?;
            } else if config_file.is_some() {
                warn!("Configuration file not found: {:?}, using defaults", path);
            }
        }

        debug!("Applying environment variable overrides");
        settings = settings.merge_with_env()?;

        settings.validate()?;

        debug!("Final configuration: {:?}", settings);

        Ok(settings)
    }

    /// Get default configuration
    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// `config.toml` in the platform config directory, if one can be determined
fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(super::settings::APP_DIR_NAME).join("config.toml"))
}
