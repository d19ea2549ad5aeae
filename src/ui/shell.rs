//! Desktop shell using `wry` + `tao`.
//!
//! Architecture:
//! - The tao event loop runs on the main thread and owns every native window:
//!   the host window (tab strip and top bar rendered by one webview) and one
//!   borderless window per tab surface, kept over the host's content area.
//! - The tab core (registry, store, bridge) runs on its own thread inside a
//!   current-thread runtime and reaches the windows through [`ShellEvent`]s.
//! - IPC from the tab strip → core via `window.ipc.postMessage()`; responses
//!   and pushes come back through `window.__tabs_receive(...)`.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use tao::dpi::{LogicalPosition, LogicalSize};
use tao::event::{Event, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder, EventLoopProxy, EventLoopWindowTarget};
use tao::window::{Window, WindowBuilder};
use tokio::sync::mpsc;
use wry::{PageLoadEvent, WebView, WebViewBuilder};

use crate::app::{App, CoreSignal, HostWindow};
use crate::managers::persistence_store::SqliteTabStore;
use crate::platform;
use crate::services::config_store::ConfigStore;
use crate::services::surface_factory::{is_external_url, ExternalOpener, SystemOpener};
use crate::types::config::ShellConfig;
use crate::types::errors::SurfaceError;
use crate::types::geometry::Bounds;
use crate::types::surface::{LoadEvent, SurfaceId, SurfaceRequest};
use crate::ui::wry_surface::{ShellEvent, WrySurfaceFactory};

const SIDEBAR_HTML: &str = include_str!("../../resources/ui/sidebar.html");

/// A tab surface: its own window plus the webview inside it.
struct Surface {
    window: Window,
    webview: WebView,
}

/// Reveals the host through the event loop once the core has started.
struct ProxyHost {
    proxy: EventLoopProxy<ShellEvent>,
}

impl HostWindow for ProxyHost {
    fn reveal(&self) {
        let _ = self.proxy.send_event(ShellEvent::RevealHost);
    }
}

/// Host client area in logical coordinates, queried now.
fn host_bounds(window: &Window) -> Bounds {
    let scale = window.scale_factor();
    let size: LogicalSize<f64> = window.inner_size().to_logical(scale);
    let position: LogicalPosition<f64> = window
        .inner_position()
        .map(|p| p.to_logical(scale))
        .unwrap_or(LogicalPosition::new(0.0, 0.0));
    Bounds::new(position.x, position.y, size.width, size.height)
}

#[cfg(target_os = "linux")]
fn attach_webview(builder: WebViewBuilder, window: &Window) -> Result<WebView, String> {
    use tao::platform::unix::WindowExtUnix;
    use wry::WebViewBuilderExtUnix;
    let vbox = window.default_vbox().ok_or("window has no GTK container")?;
    builder.build_gtk(vbox).map_err(|e| e.to_string())
}

#[cfg(not(target_os = "linux"))]
fn attach_webview(builder: WebViewBuilder, window: &Window) -> Result<WebView, String> {
    builder.build(window).map_err(|e| e.to_string())
}

fn create_surface(
    target: &EventLoopWindowTarget<ShellEvent>,
    request: SurfaceRequest,
    opener: Arc<dyn ExternalOpener>,
    always_on_top: bool,
) -> Result<Surface, SurfaceError> {
    let SurfaceRequest {
        tab_id,
        url,
        bounds,
        visible,
        hooks,
    } = request;
    let create_error = |reason: String| SurfaceError::Create {
        tab_id: tab_id.clone(),
        reason,
    };

    let window = WindowBuilder::new()
        .with_title(&tab_id)
        .with_decorations(false)
        .with_visible(visible)
        .with_always_on_top(always_on_top)
        .with_position(LogicalPosition::new(bounds.x, bounds.y))
        .with_inner_size(LogicalSize::new(bounds.width, bounds.height))
        .build(target)
        .map_err(|e| create_error(e.to_string()))?;

    let on_title_changed = hooks.on_title_changed;
    let on_load_event = hooks.on_load_event;
    let builder = WebViewBuilder::new()
        .with_url(&url)
        .with_document_title_changed_handler(move |title| on_title_changed(title))
        .with_on_page_load_handler(move |event, url| match event {
            PageLoadEvent::Started => on_load_event(LoadEvent::Started { url }),
            PageLoadEvent::Finished => on_load_event(LoadEvent::Finished { url }),
        })
        .with_new_window_req_handler(move |url, _features| {
            if is_external_url(&url) {
                if let Err(e) = opener.open_external(&url) {
                    log::warn!("could not open {} externally: {}", url, e);
                }
            }
            wry::NewWindowResponse::Deny
        })
        .with_devtools(cfg!(debug_assertions));

    let webview = attach_webview(builder, &window).map_err(create_error)?;
    Ok(Surface { window, webview })
}

/// Core thread: store, registry and bridge on a current-thread runtime.
fn run_core(
    config: ShellConfig,
    proxy: EventLoopProxy<ShellEvent>,
    host: Bounds,
    inbound: mpsc::UnboundedReceiver<String>,
    signals: mpsc::UnboundedReceiver<CoreSignal>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("could not start core runtime: {}", e);
            let _ = proxy.send_event(ShellEvent::CoreStopped);
            return;
        }
    };
    let local = tokio::task::LocalSet::new();
    let db_path = platform::database_path(config.data_dir.as_deref());
    log::info!("using tab database at {}", db_path.display());

    local.block_on(&runtime, async {
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let forward = proxy.clone();
        tokio::task::spawn_local(async move {
            while let Some(message) = outbound_rx.recv().await {
                if forward.send_event(ShellEvent::DeliverToSidebar(message)).is_err() {
                    break;
                }
            }
        });

        let store = SqliteTabStore::open(db_path);
        let factory = WrySurfaceFactory::new(proxy.clone());
        let app = App::new(store, factory, &config, host, outbound_tx);

        match app.startup(&ProxyHost { proxy: proxy.clone() }).await {
            Ok(_) => app.run(inbound, signals).await,
            Err(e) => log::error!("startup failed: {}", e),
        }
    });

    let _ = proxy.send_event(ShellEvent::CoreStopped);
}

// ─── Main entry point ───

pub fn run() {
    let config = ConfigStore::load_or_default(None);
    let opener: Arc<dyn ExternalOpener> = Arc::new(SystemOpener);

    let event_loop: EventLoop<ShellEvent> = EventLoopBuilder::with_user_event().build();
    let proxy = event_loop.create_proxy();

    let window = WindowBuilder::new()
        .with_title("sidetabs")
        .with_visible(false)
        .with_always_on_top(config.always_on_top)
        .with_inner_size(LogicalSize::new(config.window_width, config.window_height))
        .build(&event_loop)
        .expect("Failed to create window");

    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();
    let (signal_tx, signal_rx) = mpsc::unbounded_channel::<CoreSignal>();

    let builder = WebViewBuilder::new()
        .with_html(SIDEBAR_HTML)
        .with_ipc_handler(move |msg: wry::http::Request<String>| {
            let _ = inbound_tx.send(msg.body().clone());
        })
        .with_new_window_req_handler(|_url, _features| wry::NewWindowResponse::Deny)
        .with_devtools(cfg!(debug_assertions));
    let sidebar = attach_webview(builder, &window).expect("Failed to create WebView");

    let core_config = config.clone();
    let core_proxy = proxy.clone();
    let initial = host_bounds(&window);
    thread::Builder::new()
        .name("sidetabs-core".into())
        .spawn(move || run_core(core_config, core_proxy, initial, inbound_rx, signal_rx))
        .expect("Failed to start core thread");

    let host_id = window.id();
    let mut surfaces: HashMap<SurfaceId, Surface> = HashMap::new();

    event_loop.run(move |event, target, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::WindowEvent { window_id, event, .. } if window_id == host_id => match event {
                WindowEvent::CloseRequested => {
                    if signal_tx.send(CoreSignal::Shutdown).is_err() {
                        *control_flow = ControlFlow::Exit;
                    }
                }
                WindowEvent::Moved(_) | WindowEvent::Resized(_) => {
                    // The event payload can lag behind; query the window instead.
                    let _ = signal_tx.send(CoreSignal::HostGeometry(host_bounds(&window)));
                }
                _ => {}
            },

            Event::UserEvent(shell_event) => match shell_event {
                ShellEvent::CreateSurface { id, request, reply } => {
                    let result =
                        create_surface(target, request, opener.clone(), config.always_on_top)
                            .map(|surface| {
                                surfaces.insert(id, surface);
                            });
                    let _ = reply.send(result);
                }
                ShellEvent::Navigate { id, url, reply } => {
                    let result = match surfaces.get(&id) {
                        Some(surface) => surface.webview.load_url(&url).map_err(|e| {
                            SurfaceError::Load {
                                url: url.clone(),
                                reason: e.to_string(),
                            }
                        }),
                        None => Err(SurfaceError::UnknownSurface(id)),
                    };
                    let _ = reply.send(result);
                }
                ShellEvent::SetVisible { id, visible } => {
                    if let Some(surface) = surfaces.get(&id) {
                        surface.window.set_visible(visible);
                    }
                }
                ShellEvent::SetBounds { id, bounds } => {
                    if let Some(surface) = surfaces.get(&id) {
                        surface
                            .window
                            .set_outer_position(LogicalPosition::new(bounds.x, bounds.y));
                        surface
                            .window
                            .set_inner_size(LogicalSize::new(bounds.width, bounds.height));
                    }
                }
                ShellEvent::Destroy(id) => {
                    if surfaces.remove(&id).is_none() {
                        log::warn!("destroy for unknown {}", id);
                    }
                }
                ShellEvent::DeliverToSidebar(message) => {
                    let script = format!(
                        "if(window.__tabs_receive)window.__tabs_receive({})",
                        message
                    );
                    if let Err(e) = sidebar.evaluate_script(&script) {
                        log::warn!("could not deliver to tab strip: {}", e);
                    }
                }
                ShellEvent::RevealHost => {
                    window.set_visible(true);
                    let _ = signal_tx.send(CoreSignal::HostGeometry(host_bounds(&window)));
                }
                ShellEvent::CoreStopped => {
                    surfaces.clear();
                    *control_flow = ControlFlow::Exit;
                }
            },

            _ => {}
        }
    });
}
