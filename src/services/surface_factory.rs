//! Content surface factory contract.
//!
//! A factory creates one rendering surface per tab and wires the surface's
//! notifications into the [`SurfaceHooks`] supplied with each request.
//! Requests to open a new window from inside a surface never spawn an
//! internal tab; the factory hands them to its [`ExternalOpener`].

use std::sync::Mutex;

use crate::types::errors::SurfaceError;
use crate::types::geometry::Bounds;
use crate::types::surface::{SurfaceHandle, SurfaceId, SurfaceRequest};

/// Trait defining the content surface factory interface.
#[allow(async_fn_in_trait)]
pub trait ContentSurfaceFactory {
    /// Creates a surface positioned at `request.bounds` and starts loading `request.url`.
    async fn create(&self, request: SurfaceRequest) -> Result<SurfaceHandle, SurfaceError>;

    /// Starts loading `url`. Resolves once the load is dispatched, not when it completes.
    async fn navigate(&self, surface: SurfaceId, url: &str) -> Result<(), SurfaceError>;

    fn set_visible(&self, surface: SurfaceId, visible: bool) -> Result<(), SurfaceError>;

    fn set_bounds(&self, surface: SurfaceId, bounds: Bounds) -> Result<(), SurfaceError>;

    /// Releases every native resource behind the handle.
    fn destroy(&self, handle: SurfaceHandle) -> Result<(), SurfaceError>;
}

/// Default handler for links a surface wants to open in a new window.
pub trait ExternalOpener: Send + Sync {
    fn open_external(&self, url: &str) -> Result<(), String>;
}

/// Opens urls in the user's default browser.
pub struct SystemOpener;

impl ExternalOpener for SystemOpener {
    fn open_external(&self, url: &str) -> Result<(), String> {
        open::that(url).map_err(|e| format!("Failed to open URL: {}", e))
    }
}

/// Records urls instead of opening them. Used by headless hosts.
#[derive(Default)]
pub struct RecordingOpener {
    opened: Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl ExternalOpener for RecordingOpener {
    fn open_external(&self, url: &str) -> Result<(), String> {
        log::info!("external open: {}", url);
        self.opened
            .lock()
            .map_err(|e| e.to_string())?
            .push(url.to_string());
        Ok(())
    }
}

/// Only web urls are handed to the external opener.
pub fn is_external_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
