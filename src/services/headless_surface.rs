//! In-process content surfaces with no native window behind them.
//!
//! Drives the `sidetabs-rpc` binary and the test suite. Surfaces record their
//! url, bounds and visibility; load and title notifications are raised either
//! automatically (`with_auto_complete`) or by the `finish_load`, `fail_load`
//! and `emit_title` helpers.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::services::surface_factory::{
    is_external_url, ContentSurfaceFactory, ExternalOpener, RecordingOpener,
};
use crate::types::errors::SurfaceError;
use crate::types::geometry::Bounds;
use crate::types::surface::{LoadEvent, SurfaceHandle, SurfaceHooks, SurfaceId, SurfaceRequest};
use crate::types::tab::title_from_url;

/// Observable state of one headless surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSnapshot {
    pub id: SurfaceId,
    pub tab_id: String,
    pub url: String,
    pub bounds: Bounds,
    pub visible: bool,
}

struct HeadlessSurface {
    tab_id: String,
    url: String,
    bounds: Bounds,
    visible: bool,
    hooks: SurfaceHooks,
}

impl HeadlessSurface {
    fn snapshot(&self, id: SurfaceId) -> SurfaceSnapshot {
        SurfaceSnapshot {
            id,
            tab_id: self.tab_id.clone(),
            url: self.url.clone(),
            bounds: self.bounds,
            visible: self.visible,
        }
    }

    /// Raises the notifications for a load of the current url.
    fn start_load(&self, auto_complete: bool) {
        (self.hooks.on_load_event)(LoadEvent::Started { url: self.url.clone() });
        if auto_complete {
            (self.hooks.on_title_changed)(title_from_url(&self.url));
            (self.hooks.on_load_event)(LoadEvent::Finished { url: self.url.clone() });
        }
    }
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    surfaces: HashMap<SurfaceId, HeadlessSurface>,
    destroyed: Vec<SurfaceId>,
    fail_next_create: bool,
    yield_on_create: bool,
    creating: usize,
    failing_prefixes: Vec<String>,
    auto_complete: bool,
}

/// Headless [`ContentSurfaceFactory`]. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct HeadlessSurfaceFactory {
    inner: Rc<RefCell<Inner>>,
    opener: Arc<dyn ExternalOpener>,
}

impl HeadlessSurfaceFactory {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner::default())),
            opener: Arc::new(RecordingOpener::new()),
        }
    }

    /// When enabled, every load immediately reports a host-derived title and finishes.
    pub fn with_auto_complete(self, enabled: bool) -> Self {
        self.inner.borrow_mut().auto_complete = enabled;
        self
    }

    pub fn with_opener(mut self, opener: Arc<dyn ExternalOpener>) -> Self {
        self.opener = opener;
        self
    }

    /// The next `create` call fails.
    pub fn fail_next_create(&self) {
        self.inner.borrow_mut().fail_next_create = true;
    }

    /// Every `create` suspends once before building the surface, like a
    /// backend that round-trips through a UI thread.
    pub fn yield_on_create(&self, enabled: bool) {
        self.inner.borrow_mut().yield_on_create = enabled;
    }

    /// Number of `create` calls currently suspended.
    pub fn creates_in_progress(&self) -> usize {
        self.inner.borrow().creating
    }

    /// Navigations to urls starting with `prefix` fail to dispatch.
    pub fn fail_loads_for(&self, prefix: &str) {
        self.inner.borrow_mut().failing_prefixes.push(prefix.to_string());
    }

    pub fn surfaces(&self) -> Vec<SurfaceSnapshot> {
        let inner = self.inner.borrow();
        let mut all: Vec<SurfaceSnapshot> = inner
            .surfaces
            .iter()
            .map(|(id, s)| s.snapshot(*id))
            .collect();
        all.sort_by_key(|s| s.id.0);
        all
    }

    pub fn surface_for_tab(&self, tab_id: &str) -> Option<SurfaceSnapshot> {
        let inner = self.inner.borrow();
        inner
            .surfaces
            .iter()
            .find(|(_, s)| s.tab_id == tab_id)
            .map(|(id, s)| s.snapshot(*id))
    }

    pub fn live_count(&self) -> usize {
        self.inner.borrow().surfaces.len()
    }

    pub fn destroyed_count(&self) -> usize {
        self.inner.borrow().destroyed.len()
    }

    /// Simulates the page reporting a new document title. Returns false if no surface exists.
    pub fn emit_title(&self, tab_id: &str, title: &str) -> bool {
        self.with_tab_surface(tab_id, |s| (s.hooks.on_title_changed)(title.to_string()))
    }

    /// Simulates the current load finishing.
    pub fn finish_load(&self, tab_id: &str) -> bool {
        self.with_tab_surface(tab_id, |s| {
            (s.hooks.on_load_event)(LoadEvent::Finished { url: s.url.clone() })
        })
    }

    /// Simulates the current load failing after it started.
    pub fn fail_load(&self, tab_id: &str, reason: &str) -> bool {
        self.with_tab_surface(tab_id, |s| {
            (s.hooks.on_load_event)(LoadEvent::Failed {
                url: s.url.clone(),
                reason: reason.to_string(),
            })
        })
    }

    /// Simulates the page asking for a new window. Web urls go to the external opener.
    pub fn request_new_window(&self, tab_id: &str, url: &str) -> bool {
        if self.surface_for_tab(tab_id).is_none() || !is_external_url(url) {
            return false;
        }
        match self.opener.open_external(url) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("external open of {} failed: {}", url, e);
                false
            }
        }
    }

    fn with_tab_surface(&self, tab_id: &str, f: impl FnOnce(&HeadlessSurface)) -> bool {
        let inner = self.inner.borrow();
        match inner.surfaces.values().find(|s| s.tab_id == tab_id) {
            Some(surface) => {
                f(surface);
                true
            }
            None => false,
        }
    }
}

impl Default for HeadlessSurfaceFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentSurfaceFactory for HeadlessSurfaceFactory {
    async fn create(&self, request: SurfaceRequest) -> Result<SurfaceHandle, SurfaceError> {
        let suspend = self.inner.borrow().yield_on_create;
        if suspend {
            self.inner.borrow_mut().creating += 1;
            tokio::task::yield_now().await;
            self.inner.borrow_mut().creating -= 1;
        }
        let mut inner = self.inner.borrow_mut();
        if std::mem::take(&mut inner.fail_next_create) {
            return Err(SurfaceError::Create {
                tab_id: request.tab_id,
                reason: "host refused to create surface".to_string(),
            });
        }
        inner.next_id += 1;
        let id = SurfaceId(inner.next_id);
        let surface = HeadlessSurface {
            tab_id: request.tab_id,
            url: request.url,
            bounds: request.bounds,
            visible: request.visible,
            hooks: request.hooks,
        };
        surface.start_load(inner.auto_complete);
        inner.surfaces.insert(id, surface);
        Ok(SurfaceHandle::new(id))
    }

    async fn navigate(&self, surface: SurfaceId, url: &str) -> Result<(), SurfaceError> {
        let mut inner = self.inner.borrow_mut();
        let failing = inner.failing_prefixes.iter().any(|p| url.starts_with(p.as_str()));
        let auto_complete = inner.auto_complete;
        let target = inner
            .surfaces
            .get_mut(&surface)
            .ok_or(SurfaceError::UnknownSurface(surface))?;
        if failing {
            return Err(SurfaceError::Load {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        target.url = url.to_string();
        target.start_load(auto_complete);
        Ok(())
    }

    fn set_visible(&self, surface: SurfaceId, visible: bool) -> Result<(), SurfaceError> {
        let mut inner = self.inner.borrow_mut();
        let target = inner
            .surfaces
            .get_mut(&surface)
            .ok_or(SurfaceError::UnknownSurface(surface))?;
        target.visible = visible;
        Ok(())
    }

    fn set_bounds(&self, surface: SurfaceId, bounds: Bounds) -> Result<(), SurfaceError> {
        let mut inner = self.inner.borrow_mut();
        let target = inner
            .surfaces
            .get_mut(&surface)
            .ok_or(SurfaceError::UnknownSurface(surface))?;
        target.bounds = bounds;
        Ok(())
    }

    fn destroy(&self, handle: SurfaceHandle) -> Result<(), SurfaceError> {
        let mut inner = self.inner.borrow_mut();
        let id = handle.id();
        inner
            .surfaces
            .remove(&id)
            .ok_or(SurfaceError::UnknownSurface(id))?;
        inner.destroyed.push(id);
        Ok(())
    }
}
