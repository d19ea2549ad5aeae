use thiserror::Error;

use super::surface::SurfaceId;

// === TabError ===

/// Errors returned by tab registry operations.
#[derive(Debug, Error)]
pub enum TabError {
    /// Tab with the given ID is not in the live set.
    #[error("Tab not found: {0}")]
    NotFound(String),
    /// The content surface backing a tab could not be created.
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    /// The registry has been shut down and accepts no further operations.
    #[error("Tab registry is shut down")]
    ShutDown,
}

// === SurfaceError ===

/// Errors reported by a content surface factory.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// The host could not create a surface for the tab.
    #[error("Failed to create surface for tab {tab_id}: {reason}")]
    Create { tab_id: String, reason: String },
    /// The surface could not start loading the url.
    #[error("Failed to load {url}: {reason}")]
    Load { url: String, reason: String },
    /// The handle does not name a live surface (already destroyed or foreign).
    #[error("Unknown surface: {0}")]
    UnknownSurface(SurfaceId),
    /// The rendering host is gone (event loop exited).
    #[error("Surface host unavailable")]
    HostUnavailable,
}

// === StoreError ===

/// Errors from the durable tab store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying SQLite operation failed.
    #[error("Database error: {0}")]
    Database(String),
    /// An operation ran before `initialize()` succeeded.
    #[error("Store not initialized")]
    NotInitialized,
    /// The store worker thread is no longer running.
    #[error("Store worker unavailable")]
    WorkerUnavailable,
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

// === ConfigError ===

/// Errors loading or saving the shell configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}
