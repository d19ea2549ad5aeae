// sidetabs platform paths
// Resolves the per-user config and data directories via `dirs`.

use std::path::{Path, PathBuf};

/// Directory name used under the platform config/data roots.
pub const APP_DIR: &str = "sidetabs";

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "SIDETABS_DATA_DIR";

/// File name of the tab database inside the data directory.
pub const DATABASE_FILE: &str = "sidetabs.db";

/// Returns the platform-specific configuration directory.
///
/// - **Linux**: `$XDG_CONFIG_HOME/sidetabs` or `~/.config/sidetabs`
/// - **macOS**: `~/Library/Application Support/sidetabs`
/// - **Windows**: `%APPDATA%/sidetabs`
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Returns the platform-specific data directory.
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Data directory to use: `$SIDETABS_DATA_DIR`, then the configured override,
/// then the platform default.
pub fn resolve_data_dir(configured: Option<&Path>) -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    match configured {
        Some(dir) => dir.to_path_buf(),
        None => get_data_dir(),
    }
}

/// Full path of the tab database.
pub fn database_path(configured: Option<&Path>) -> PathBuf {
    resolve_data_dir(configured).join(DATABASE_FILE)
}
