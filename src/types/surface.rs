use std::fmt;

use super::geometry::Bounds;

/// Identifies one content surface owned by a factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// Owning handle to a live content surface.
///
/// Not `Clone`: `destroy` consumes the handle, so a surface can be destroyed at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct SurfaceHandle {
    id: SurfaceId,
}

impl SurfaceHandle {
    pub fn new(id: SurfaceId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }
}

/// Load transition reported by a content surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    Started { url: String },
    Finished { url: String },
    Failed { url: String, reason: String },
}

impl LoadEvent {
    pub fn url(&self) -> &str {
        match self {
            LoadEvent::Started { url } | LoadEvent::Finished { url } | LoadEvent::Failed { url, .. } => url,
        }
    }
}

/// Typed callbacks a factory wires into each surface it creates.
///
/// Hooks may be invoked from the rendering host's thread, hence `Send`.
pub struct SurfaceHooks {
    pub on_title_changed: Box<dyn Fn(String) + Send>,
    pub on_load_event: Box<dyn Fn(LoadEvent) + Send>,
}

impl SurfaceHooks {
    /// Hooks that drop every notification.
    pub fn noop() -> Self {
        Self {
            on_title_changed: Box::new(|_| {}),
            on_load_event: Box::new(|_| {}),
        }
    }
}

impl fmt::Debug for SurfaceHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceHooks").finish_non_exhaustive()
    }
}

/// Everything a factory needs to create a surface for one tab.
#[derive(Debug)]
pub struct SurfaceRequest {
    pub tab_id: String,
    pub url: String,
    pub bounds: Bounds,
    pub visible: bool,
    pub hooks: SurfaceHooks,
}
