//! Event bridge between the tab-strip UI and the tab registry.
//!
//! Protocol: one JSON object per message.
//! Request:  {"id":1, "method":"tabs:create", "params":{"url":"..."}}
//! Response: {"id":1, "result":...} or {"id":1, "error":"..."}
//! Push:     {"event":"tabs:created", "data":{...}}
//!
//! Requests naming the same tab id are handled in arrival order on a per-id
//! lane; requests for different tabs may interleave at the registry's
//! suspension points.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc, Notify};

use crate::managers::persistence_store::PersistenceStore;
use crate::managers::tab_registry::TabRegistry;
use crate::services::surface_factory::ContentSurfaceFactory;
use crate::types::event::RegistryEvent;

/// A parsed request waiting for its turn.
#[derive(Debug, Clone)]
pub struct Request {
    pub id: Value,
    pub method: String,
    pub params: Value,
}

type Lane = mpsc::UnboundedSender<Request>;

/// Count of accepted requests that have not been answered yet.
#[derive(Default)]
struct InFlight {
    count: Cell<usize>,
    idle: Notify,
}

impl InFlight {
    fn start(&self) {
        self.count.set(self.count.get() + 1);
    }

    fn finish(&self) {
        let left = self.count.get().saturating_sub(1);
        self.count.set(left);
        if left == 0 {
            self.idle.notify_waiters();
        }
    }

    async fn idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.count.get() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Dispatch one method call against the registry.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method<S, F>(
    registry: &TabRegistry<S, F>,
    method: &str,
    params: &Value,
) -> Result<Value, String>
where
    S: PersistenceStore,
    F: ContentSurfaceFactory,
{
    match method {
        "tabs:create" => {
            let url = params.get("url").and_then(|v| v.as_str());
            let tab = registry.create_tab(url).await.map_err(|e| e.to_string())?;
            Ok(json!(tab.id))
        }
        "tabs:switch" => {
            let id = tab_id_param(params)?;
            registry.switch_tab(id).await.map_err(|e| e.to_string())?;
            Ok(json!(true))
        }
        "tabs:close" => {
            let id = tab_id_param(params)?;
            registry.close_tab(id).await.map_err(|e| e.to_string())?;
            Ok(json!(true))
        }
        "tabs:navigate" => {
            let id = tab_id_param(params)?;
            let url = params.get("url").and_then(|v| v.as_str()).ok_or("missing url")?;
            registry.navigate_tab(id, url).await.map_err(|e| e.to_string())?;
            Ok(json!(true))
        }
        "tabs:get-all" => Ok(json!({
            "tabs": registry.get_all_tabs(),
            "activeTabId": registry.active_tab_id(),
        })),
        _ => Err(format!("unknown method: {}", method)),
    }
}

fn tab_id_param(params: &Value) -> Result<&str, String> {
    params
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "missing id".to_string())
}

/// Parse one inbound message into a request, or the error response to send back.
pub fn parse_request(line: &str) -> Result<Request, Value> {
    let req: Value = serde_json::from_str(line)
        .map_err(|e| json!({"id": null, "error": format!("parse error: {}", e)}))?;
    let id = req.get("id").cloned().unwrap_or(Value::Null);
    let method = req
        .get("method")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let params = req.get("params").cloned().unwrap_or(json!({}));
    Ok(Request { id, method, params })
}

/// Routes UI requests to the registry and registry events back to the UI.
pub struct EventBridge<S, F> {
    registry: Rc<TabRegistry<S, F>>,
    outbound: mpsc::UnboundedSender<String>,
    lanes: RefCell<HashMap<String, Lane>>,
    events: RefCell<Option<broadcast::Receiver<RegistryEvent>>>,
    in_flight: Rc<InFlight>,
    stop: Notify,
}

impl<S, F> EventBridge<S, F>
where
    S: PersistenceStore + 'static,
    F: ContentSurfaceFactory + 'static,
{
    /// Subscribes to registry events immediately, so events raised before
    /// [`EventBridge::run`] starts are still pushed.
    pub fn new(registry: Rc<TabRegistry<S, F>>, outbound: mpsc::UnboundedSender<String>) -> Self {
        let events = registry.subscribe();
        Self {
            registry,
            outbound,
            lanes: RefCell::new(HashMap::new()),
            events: RefCell::new(Some(events)),
            in_flight: Rc::new(InFlight::default()),
            stop: Notify::new(),
        }
    }

    /// Serves inbound messages and pushes registry events. Once the inbound
    /// channel closes or [`EventBridge::stop`] is called, no further messages
    /// are read; every accepted request is still answered and every event
    /// raised by then is pushed before this returns. Must run inside a `LocalSet`.
    pub async fn run(&self, mut inbound: mpsc::UnboundedReceiver<String>) {
        let events = self.events.borrow_mut().take();
        let Some(mut events) = events else {
            log::warn!("event bridge is already running");
            return;
        };
        let mut reading = true;
        loop {
            tokio::select! {
                line = inbound.recv(), if reading => match line {
                    Some(line) => self.handle_message(&line),
                    None => reading = false,
                },
                _ = self.stop.notified(), if reading => {
                    log::debug!("event bridge stopping");
                    reading = false;
                }
                event = events.recv() => match event {
                    Ok(event) => self.push(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("event bridge dropped {} pushes", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = self.in_flight.idle(), if !reading => break,
            }
        }
        loop {
            match events.try_recv() {
                Ok(event) => self.push(&event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    log::warn!("event bridge dropped {} pushes", skipped);
                }
                Err(_) => break,
            }
        }
        log::debug!("event bridge stopped");
    }

    /// Stops reading inbound messages. Requests already accepted still run.
    pub fn stop(&self) {
        self.stop.notify_one();
    }

    /// Accepts one raw inbound message. Must be called inside a `LocalSet`.
    pub fn handle_message(&self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let request = match parse_request(line) {
            Ok(request) => request,
            Err(response) => {
                self.send(response);
                return;
            }
        };
        log::debug!("request {} {}", request.method, request.id);
        self.in_flight.start();

        let lane = request
            .params
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        match lane {
            Some(tab_id) => self.enqueue(tab_id, request),
            None => {
                let registry = self.registry.clone();
                let outbound = self.outbound.clone();
                let in_flight = self.in_flight.clone();
                tokio::task::spawn_local(async move {
                    respond(&registry, &outbound, request).await;
                    in_flight.finish();
                });
            }
        }
    }

    /// Sends a registry event to the UI. Nobody listening is not an error.
    pub fn push(&self, event: &RegistryEvent) {
        self.send(event.to_message());
    }

    fn send(&self, message: Value) {
        let _ = self.outbound.send(message.to_string());
    }

    /// Appends the request to the tab's lane, starting a lane worker if none is running.
    fn enqueue(&self, tab_id: String, request: Request) {
        let mut lanes = self.lanes.borrow_mut();
        lanes.retain(|_, lane| !lane.is_closed());
        let request = match lanes.get(&tab_id) {
            Some(lane) => match lane.send(request) {
                Ok(()) => return,
                Err(mpsc::error::SendError(request)) => request,
            },
            None => request,
        };

        let (lane, mut queue) = mpsc::unbounded_channel();
        let _ = lane.send(request);
        lanes.insert(tab_id, lane);

        let registry = self.registry.clone();
        let outbound = self.outbound.clone();
        let in_flight = self.in_flight.clone();
        tokio::task::spawn_local(async move {
            // The worker drops its queue once drained; the next request for
            // this id finds the lane closed and starts a new worker.
            while let Ok(request) = queue.try_recv() {
                respond(&registry, &outbound, request).await;
                in_flight.finish();
            }
        });
    }
}

async fn respond<S, F>(
    registry: &TabRegistry<S, F>,
    outbound: &mpsc::UnboundedSender<String>,
    request: Request,
) where
    S: PersistenceStore,
    F: ContentSurfaceFactory,
{
    let result = handle_method(registry, &request.method, &request.params).await;
    let response = match result {
        Ok(val) => json!({"id": request.id, "result": val}),
        Err(err) => {
            log::debug!("request {} failed: {}", request.method, err);
            json!({"id": request.id, "error": err})
        }
    };
    let _ = outbound.send(response.to_string());
}
