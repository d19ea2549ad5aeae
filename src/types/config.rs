use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::geometry::Layout;

/// Default url for new tabs when the caller gives none.
pub const DEFAULT_URL: &str = "https://www.google.com";

/// User-editable shell configuration. Every field has a default so partial files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub sidebar_width: f64,
    pub top_bar_height: f64,
    pub default_url: String,
    pub window_width: f64,
    pub window_height: f64,
    pub always_on_top: bool,
    /// Overrides the platform data directory for the tab database.
    pub data_dir: Option<PathBuf>,
}

impl ShellConfig {
    pub fn layout(&self) -> Layout {
        Layout {
            sidebar_width: self.sidebar_width,
            top_bar_height: self.top_bar_height,
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        let layout = Layout::default();
        Self {
            sidebar_width: layout.sidebar_width,
            top_bar_height: layout.top_bar_height,
            default_url: DEFAULT_URL.to_string(),
            window_width: 1280.0,
            window_height: 800.0,
            always_on_top: false,
            data_dir: None,
        }
    }
}
