//! App Core for sidetabs.
//!
//! Wires the tab registry, geometry coordinator and event bridge together and
//! drives the application lifecycle: startup, the core loop, shutdown.

use std::cell::RefCell;
use std::rc::Rc;

use tokio::sync::mpsc;

use crate::event_bridge::EventBridge;
use crate::managers::geometry_coordinator::{GeometryCoordinator, Viewport};
use crate::managers::persistence_store::PersistenceStore;
use crate::managers::tab_registry::{SurfaceNotices, TabRegistry};
use crate::services::surface_factory::ContentSurfaceFactory;
use crate::types::config::ShellConfig;
use crate::types::errors::TabError;
use crate::types::geometry::Bounds;

/// Signals from the host window to the core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoreSignal {
    /// Host moved or resized; carries the client bounds queried when the event was handled.
    HostGeometry(Bounds),
    Shutdown,
}

/// The window hosting the tab strip and the tab surfaces.
pub trait HostWindow {
    /// Makes the host visible. Called once, after startup has finished.
    fn reveal(&self);
}

/// Central application struct holding the core components.
pub struct App<S, F> {
    pub registry: Rc<TabRegistry<S, F>>,
    pub geometry: GeometryCoordinator<S, F>,
    pub bridge: Rc<EventBridge<S, F>>,
    notices: RefCell<Option<SurfaceNotices>>,
}

impl<S, F> App<S, F>
where
    S: PersistenceStore + 'static,
    F: ContentSurfaceFactory + 'static,
{
    /// Creates the core. `host` is the initial host client area; responses and
    /// pushes for the UI are sent on `outbound`.
    pub fn new(
        store: S,
        factory: F,
        config: &ShellConfig,
        host: Bounds,
        outbound: mpsc::UnboundedSender<String>,
    ) -> Self {
        let viewport = Rc::new(Viewport::new(config.layout(), host));
        let (registry, notices) =
            TabRegistry::new(store, factory, viewport, config.default_url.clone());
        let registry = Rc::new(registry);
        let geometry = GeometryCoordinator::new(registry.clone());
        let bridge = Rc::new(EventBridge::new(registry.clone(), outbound));

        Self {
            registry,
            geometry,
            bridge,
            notices: RefCell::new(Some(notices)),
        }
    }

    /// Startup sequence: open the store, rehydrate persisted tabs, create a
    /// default tab if nothing was restored, then reveal the host.
    ///
    /// Returns the number of live tabs once the host is revealed.
    pub async fn startup(&self, host: &impl HostWindow) -> Result<usize, TabError> {
        if let Err(e) = self.registry.store().initialize().await {
            self.registry.diagnostics().record_store_failure("initialize", &e);
        }
        self.registry.hold_presentation();

        let restored = self.registry.initialize().await?;
        if restored == 0 {
            self.registry.create_tab(None).await?;
        }

        let count = self.registry.tab_count();
        log::info!("startup complete with {} tabs", count);
        host.reveal();
        self.registry.present();
        Ok(count)
    }

    /// Applies every surface notice queued so far. Returns how many were handled.
    pub async fn drain_notices(&self) -> usize {
        let Some(mut notices) = self.notices.borrow_mut().take() else {
            return 0;
        };
        let mut handled = 0;
        while let Ok(notice) = notices.try_recv() {
            self.registry.handle_surface_notice(notice).await;
            handled += 1;
        }
        *self.notices.borrow_mut() = Some(notices);
        handled
    }

    /// Core loop: serves the bridge, applies surface notices and handles host
    /// signals. Ends once the inbound channel closes or a shutdown signal
    /// arrives; either way every accepted request is answered first. A closed
    /// signal channel only stops signal handling. Must run inside a `LocalSet`.
    pub async fn run(
        &self,
        inbound: mpsc::UnboundedReceiver<String>,
        mut signals: mpsc::UnboundedReceiver<CoreSignal>,
    ) {
        let bridge = self.bridge.clone();
        let mut bridge_task = tokio::task::spawn_local(async move { bridge.run(inbound).await });

        let notices = self.notices.borrow_mut().take();
        let pump_task = notices.map(|mut notices| {
            let registry = self.registry.clone();
            tokio::task::spawn_local(async move {
                while let Some(notice) = notices.recv().await {
                    registry.handle_surface_notice(notice).await;
                }
            })
        });

        let mut listening = true;
        loop {
            tokio::select! {
                result = &mut bridge_task => {
                    if let Err(e) = result {
                        log::error!("event bridge task failed: {}", e);
                    }
                    break;
                }
                signal = signals.recv(), if listening => match signal {
                    Some(CoreSignal::HostGeometry(bounds)) => {
                        self.geometry.on_host_changed(bounds);
                    }
                    Some(CoreSignal::Shutdown) => {
                        log::info!("shutdown requested");
                        self.bridge.stop();
                    }
                    None => listening = false,
                },
            }
        }

        if let Some(task) = pump_task {
            task.abort();
        }
        self.shutdown();
    }

    /// Shutdown sequence: release every surface. Tab records stay on disk.
    pub fn shutdown(&self) -> usize {
        self.registry.shutdown()
    }
}
