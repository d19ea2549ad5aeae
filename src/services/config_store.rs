// sidetabs Config Store
// Loads and saves the shell configuration as a JSON file at the platform config path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::platform;
use crate::types::config::ShellConfig;
use crate::types::errors::ConfigError;

/// Config file name inside the platform config directory.
pub const CONFIG_FILE: &str = "config.json";

/// JSON-file backed configuration.
pub struct ConfigStore {
    config_path: PathBuf,
    config: ShellConfig,
}

impl ConfigStore {
    /// Uses `path_override` when given, otherwise `<config dir>/config.json`.
    pub fn new(path_override: Option<PathBuf>) -> Self {
        let config_path =
            path_override.unwrap_or_else(|| platform::get_config_dir().join(CONFIG_FILE));
        Self {
            config_path,
            config: ShellConfig::default(),
        }
    }

    /// Loads the config file.
    ///
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load(&mut self) -> Result<&ShellConfig, ConfigError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            self.config = ShellConfig::default();
            return Ok(&self.config);
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read config file: {}", e)))?;

        self.config = serde_json::from_str(&content).map_err(|e| {
            ConfigError::Serialization(format!("Failed to parse config file: {}", e))
        })?;
        Ok(&self.config)
    }

    /// Writes the current config, creating parent directories if needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Io(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.config).map_err(|e| {
            ConfigError::Serialization(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(&self.config_path, json)
            .map_err(|e| ConfigError::Io(format!("Failed to write config file: {}", e)))?;
        Ok(())
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ShellConfig {
        &mut self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Loads the config, logging and falling back to defaults on any error.
    pub fn load_or_default(path_override: Option<PathBuf>) -> ShellConfig {
        let mut store = Self::new(path_override);
        match store.load() {
            Ok(config) => config.clone(),
            Err(e) => {
                log::warn!(
                    "ignoring config at {}: {}",
                    store.config_path().display(),
                    e
                );
                ShellConfig::default()
            }
        }
    }
}
