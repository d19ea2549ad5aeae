//! Unit tests for the event bridge: request dispatch, error responses,
//! pushes and per-tab ordering.

use std::rc::Rc;

use serde_json::{json, Value};
use sidetabs::event_bridge::{handle_method, parse_request, EventBridge};
use sidetabs::managers::geometry_coordinator::Viewport;
use sidetabs::managers::persistence_store::{PersistenceStore, SqliteTabStore};
use sidetabs::managers::tab_registry::TabRegistry;
use sidetabs::services::headless_surface::HeadlessSurfaceFactory;
use sidetabs::types::config::DEFAULT_URL;
use sidetabs::types::geometry::{Bounds, Layout};
use tokio::sync::mpsc;
use tokio::task::LocalSet;

type Registry = TabRegistry<SqliteTabStore, HeadlessSurfaceFactory>;

struct Harness {
    registry: Rc<Registry>,
    bridge: Rc<EventBridge<SqliteTabStore, HeadlessSurfaceFactory>>,
    outbound: mpsc::UnboundedReceiver<String>,
}

impl Harness {
    /// Sends one raw message and waits for the response carrying `id`.
    async fn call(&mut self, id: u64, method: &str, params: Value) -> Value {
        let line = json!({"id": id, "method": method, "params": params}).to_string();
        self.bridge.handle_message(&line);
        self.response_for(id).await
    }

    async fn response_for(&mut self, id: u64) -> Value {
        loop {
            let line = self.outbound.recv().await.expect("bridge closed");
            let msg: Value = serde_json::from_str(&line).unwrap();
            if msg["id"] == json!(id) {
                return msg;
            }
        }
    }

    async fn next_message(&mut self) -> Value {
        let line = self.outbound.recv().await.expect("bridge closed");
        serde_json::from_str(&line).unwrap()
    }
}

async fn setup() -> Harness {
    let store = SqliteTabStore::open_in_memory();
    store.initialize().await.unwrap();
    let viewport = Rc::new(Viewport::new(
        Layout::default(),
        Bounds::new(0.0, 0.0, 1280.0, 800.0),
    ));
    let (registry, _notices) =
        TabRegistry::new(store, HeadlessSurfaceFactory::new(), viewport, DEFAULT_URL);
    let registry = Rc::new(registry);
    let (tx, outbound) = mpsc::unbounded_channel();
    let bridge = Rc::new(EventBridge::new(registry.clone(), tx));
    Harness {
        registry,
        bridge,
        outbound,
    }
}

// ─── Parsing ───

#[test]
fn test_parse_request_defaults() {
    let req = parse_request(r#"{"id":7,"method":"tabs:get-all"}"#).unwrap();
    assert_eq!(req.id, json!(7));
    assert_eq!(req.method, "tabs:get-all");
    assert_eq!(req.params, json!({}));
}

#[test]
fn test_parse_error_response_has_null_id() {
    let err = parse_request("{not json").unwrap_err();
    assert_eq!(err["id"], Value::Null);
    assert!(err["error"].as_str().unwrap().starts_with("parse error:"));
}

// ─── handle_method ───

#[tokio::test]
async fn test_handle_method_round_trip() {
    LocalSet::new()
        .run_until(async {
            let h = setup().await;
            let id = handle_method(&h.registry, "tabs:create", &json!({"url": "https://a.com"}))
                .await
                .unwrap();
            let id = id.as_str().unwrap().to_string();

            let all = handle_method(&h.registry, "tabs:get-all", &json!({})).await.unwrap();
            assert_eq!(all["activeTabId"], json!(id));
            assert_eq!(all["tabs"][0]["url"], "https://a.com");
            assert_eq!(all["tabs"][0]["title"], "Loading...");
            assert_eq!(all["tabs"][0]["status"], "loading");
            assert!(all["tabs"][0]["createdAt"].is_i64());
            assert!(all["tabs"][0]["lastAccessed"].is_i64());
        })
        .await;
}

#[tokio::test]
async fn test_handle_method_errors() {
    let h = setup().await;
    assert_eq!(
        handle_method(&h.registry, "tabs:switch", &json!({"id": "ghost"})).await,
        Err("Tab not found: ghost".to_string())
    );
    assert_eq!(
        handle_method(&h.registry, "tabs:close", &json!({})).await,
        Err("missing id".to_string())
    );
    assert_eq!(
        handle_method(&h.registry, "tabs:navigate", &json!({"id": "x"})).await,
        Err("missing url".to_string())
    );
    assert_eq!(
        handle_method(&h.registry, "tabs:explode", &json!({})).await,
        Err("unknown method: tabs:explode".to_string())
    );
}

// ─── Messages ───

#[tokio::test]
async fn test_requests_get_correlated_responses() {
    LocalSet::new()
        .run_until(async {
            let mut h = setup().await;

            let created = h.call(1, "tabs:create", json!({"url": "https://a.com"})).await;
            let a = created["result"].as_str().unwrap().to_string();
            let created = h.call(2, "tabs:create", json!({})).await;
            let b = created["result"].as_str().unwrap().to_string();

            assert_eq!(h.call(3, "tabs:switch", json!({"id": b})).await["result"], json!(true));
            assert_eq!(
                h.call(4, "tabs:navigate", json!({"id": a, "url": "b.com"})).await["result"],
                json!(true)
            );
            assert_eq!(h.call(5, "tabs:close", json!({"id": b})).await["result"], json!(true));

            let all = h.call(6, "tabs:get-all", json!({})).await;
            assert_eq!(all["result"]["activeTabId"], json!(a));
            assert_eq!(all["result"]["tabs"].as_array().unwrap().len(), 1);
            assert_eq!(all["result"]["tabs"][0]["url"], "https://b.com");
        })
        .await;
}

#[tokio::test]
async fn test_failed_request_is_rejected_with_message() {
    LocalSet::new()
        .run_until(async {
            let mut h = setup().await;
            let response = h.call(9, "tabs:close", json!({"id": "ghost"})).await;
            assert_eq!(response, json!({"id": 9, "error": "Tab not found: ghost"}));
            assert_eq!(h.registry.tab_count(), 0);
        })
        .await;
}

#[tokio::test]
async fn test_malformed_message_gets_parse_error() {
    LocalSet::new()
        .run_until(async {
            let mut h = setup().await;
            h.bridge.handle_message("{oops");
            let msg = h.next_message().await;
            assert_eq!(msg["id"], Value::Null);
            assert!(msg["error"].as_str().unwrap().starts_with("parse error:"));
        })
        .await;
}

#[tokio::test]
async fn test_same_tab_requests_run_in_arrival_order() {
    LocalSet::new()
        .run_until(async {
            let mut h = setup().await;
            let created = h.call(1, "tabs:create", json!({})).await;
            let a = created["result"].as_str().unwrap().to_string();

            let burst = [
                json!({"id": 10, "method": "tabs:navigate", "params": {"id": a, "url": "https://one.com"}}),
                json!({"id": 11, "method": "tabs:navigate", "params": {"id": a, "url": "https://two.com"}}),
                json!({"id": 12, "method": "tabs:close", "params": {"id": a}}),
                json!({"id": 13, "method": "tabs:navigate", "params": {"id": a, "url": "https://three.com"}}),
            ];
            for msg in &burst {
                h.bridge.handle_message(&msg.to_string());
            }

            let mut order = Vec::new();
            let mut results = Vec::new();
            while order.len() < burst.len() {
                let msg = h.next_message().await;
                order.push(msg["id"].as_u64().unwrap());
                results.push(msg);
            }
            assert_eq!(order, vec![10, 11, 12, 13]);
            assert_eq!(results[2]["result"], json!(true));
            assert_eq!(results[3]["error"], json!(format!("Tab not found: {}", a)));
            assert_eq!(h.registry.tab_count(), 0);
        })
        .await;
}

// ─── Pushes ───

#[tokio::test]
async fn test_run_pushes_registry_events() {
    LocalSet::new()
        .run_until(async {
            let mut h = setup().await;
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
            let bridge = h.bridge.clone();
            tokio::task::spawn_local(async move { bridge.run(inbound_rx).await });

            inbound_tx
                .send(json!({"id": 1, "method": "tabs:create", "params": {"url": "https://a.com"}}).to_string())
                .unwrap();

            let mut pushes = Vec::new();
            let mut response = None;
            while response.is_none() || pushes.len() < 2 {
                let msg = h.next_message().await;
                if msg.get("event").is_some() {
                    pushes.push(msg);
                } else {
                    response = Some(msg);
                }
            }

            let id = response.unwrap()["result"].as_str().unwrap().to_string();
            assert_eq!(
                pushes[0],
                json!({"event": "tabs:created", "data": {"id": id, "url": "https://a.com", "title": "Loading..."}})
            );
            assert_eq!(
                pushes[1],
                json!({"event": "tabs:switched", "data": {"activeTabId": id}})
            );
        })
        .await;
}

#[tokio::test]
async fn test_events_before_run_are_still_pushed() {
    LocalSet::new()
        .run_until(async {
            let mut h = setup().await;
            let tab = h.registry.create_tab(None).await.unwrap();
            h.registry.close_tab(&tab.id).await.unwrap();

            let (_inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();
            let bridge = h.bridge.clone();
            tokio::task::spawn_local(async move { bridge.run(inbound_rx).await });

            let channels: Vec<String> = [
                h.next_message().await,
                h.next_message().await,
                h.next_message().await,
            ]
            .iter()
            .map(|m| m["event"].as_str().unwrap().to_string())
            .collect();
            assert_eq!(channels, vec!["tabs:created", "tabs:switched", "tabs:closed"]);
        })
        .await;
}
