//! Geometry Coordinator for sidetabs.
//!
//! Keeps every tab's content surface positioned over the host window's
//! content area. The host client area is inset by the sidebar on the left and
//! the top bar along the top; the remainder belongs to the tab surfaces.

use std::cell::Cell;
use std::rc::Rc;

use crate::managers::persistence_store::PersistenceStore;
use crate::managers::tab_registry::TabRegistry;
use crate::services::surface_factory::ContentSurfaceFactory;
use crate::types::geometry::{Bounds, Layout};

/// Current host bounds plus the fixed layout, shared by the registry (for new
/// surfaces) and the coordinator (for existing ones).
#[derive(Debug)]
pub struct Viewport {
    layout: Layout,
    host: Cell<Bounds>,
}

impl Viewport {
    pub fn new(layout: Layout, host: Bounds) -> Self {
        Self {
            layout,
            host: Cell::new(host),
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn host(&self) -> Bounds {
        self.host.get()
    }

    pub fn set_host(&self, host: Bounds) {
        self.host.set(host);
    }

    /// Bounds every tab surface should occupy right now.
    pub fn surface_bounds(&self) -> Bounds {
        self.layout.surface_bounds(self.host.get())
    }
}

/// Re-applies surface bounds whenever the host window moves or resizes.
pub struct GeometryCoordinator<S, F> {
    registry: Rc<TabRegistry<S, F>>,
    viewport: Rc<Viewport>,
}

impl<S, F> GeometryCoordinator<S, F>
where
    S: PersistenceStore,
    F: ContentSurfaceFactory,
{
    pub fn new(registry: Rc<TabRegistry<S, F>>) -> Self {
        let viewport = registry.viewport();
        Self { registry, viewport }
    }

    /// Host window moved or resized.
    ///
    /// `current` must be the host client bounds queried when the event is
    /// handled, not the value carried by the event. Every live surface is
    /// updated, hidden ones included, so a later switch needs no recompute.
    /// Returns the number of surfaces updated.
    pub fn on_host_changed(&self, current: Bounds) -> usize {
        self.viewport.set_host(current);
        let bounds = self.viewport.surface_bounds();
        let mut applied = 0;
        for surface in self.registry.surface_ids() {
            match self.registry.factory().set_bounds(surface, bounds) {
                Ok(()) => applied += 1,
                Err(e) => log::warn!("could not position {}: {}", surface, e),
            }
        }
        log::debug!(
            "host at {:?}; repositioned {} surfaces to {:?}",
            current,
            applied,
            bounds
        );
        applied
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }
}
