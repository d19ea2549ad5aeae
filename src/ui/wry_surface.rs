//! Native content surfaces backed by `wry` webviews.
//!
//! Webviews must be created and driven on the event-loop thread, so the
//! factory only forwards requests through the [`EventLoopProxy`]; the shell
//! owns the windows and answers creation and navigation over oneshot replies.

use std::cell::Cell;

use tao::event_loop::EventLoopProxy;
use tokio::sync::oneshot;

use crate::services::surface_factory::ContentSurfaceFactory;
use crate::types::errors::SurfaceError;
use crate::types::geometry::Bounds;
use crate::types::surface::{SurfaceHandle, SurfaceId, SurfaceRequest};

pub type SurfaceReply = oneshot::Sender<Result<(), SurfaceError>>;

/// Everything the core asks of the event-loop thread.
#[derive(Debug)]
pub enum ShellEvent {
    CreateSurface {
        id: SurfaceId,
        request: SurfaceRequest,
        reply: SurfaceReply,
    },
    Navigate {
        id: SurfaceId,
        url: String,
        reply: SurfaceReply,
    },
    SetVisible { id: SurfaceId, visible: bool },
    SetBounds { id: SurfaceId, bounds: Bounds },
    Destroy(SurfaceId),
    /// A response or push for the tab strip.
    DeliverToSidebar(String),
    RevealHost,
    /// The core loop has finished; the event loop may exit.
    CoreStopped,
}

/// [`ContentSurfaceFactory`] that creates one borderless window plus webview per tab.
///
/// wry only reports page loads starting and finishing, so these surfaces never
/// raise [`LoadEvent::Failed`](crate::types::surface::LoadEvent::Failed). A tab
/// only reaches the error status when a navigation cannot be dispatched.
pub struct WrySurfaceFactory {
    proxy: EventLoopProxy<ShellEvent>,
    next_id: Cell<u64>,
}

impl WrySurfaceFactory {
    pub fn new(proxy: EventLoopProxy<ShellEvent>) -> Self {
        Self {
            proxy,
            next_id: Cell::new(1),
        }
    }

    fn send(&self, event: ShellEvent) -> Result<(), SurfaceError> {
        self.proxy
            .send_event(event)
            .map_err(|_| SurfaceError::HostUnavailable)
    }
}

impl ContentSurfaceFactory for WrySurfaceFactory {
    async fn create(&self, request: SurfaceRequest) -> Result<SurfaceHandle, SurfaceError> {
        let id = SurfaceId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let (reply, done) = oneshot::channel();
        self.send(ShellEvent::CreateSurface { id, request, reply })?;
        done.await.map_err(|_| SurfaceError::HostUnavailable)??;
        Ok(SurfaceHandle::new(id))
    }

    async fn navigate(&self, surface: SurfaceId, url: &str) -> Result<(), SurfaceError> {
        let (reply, done) = oneshot::channel();
        self.send(ShellEvent::Navigate {
            id: surface,
            url: url.to_string(),
            reply,
        })?;
        done.await.map_err(|_| SurfaceError::HostUnavailable)?
    }

    fn set_visible(&self, surface: SurfaceId, visible: bool) -> Result<(), SurfaceError> {
        self.send(ShellEvent::SetVisible { id: surface, visible })
    }

    fn set_bounds(&self, surface: SurfaceId, bounds: Bounds) -> Result<(), SurfaceError> {
        self.send(ShellEvent::SetBounds { id: surface, bounds })
    }

    fn destroy(&self, handle: SurfaceHandle) -> Result<(), SurfaceError> {
        self.send(ShellEvent::Destroy(handle.id()))
    }
}
