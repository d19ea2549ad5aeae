//! sidetabs RPC Server — the tab core over stdin/stdout, with headless surfaces.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"tabs:create", "params":{"url":"..."}}
//! Response: {"id":1, "result":...} or {"id":1, "error":"..."}
//! Push:     {"event":"tabs:created", "data":{...}}
//!
//! `{"event":"ready",...}` is printed once persisted tabs are restored.

use std::io::{self, BufRead, Write};
use std::thread;

use serde_json::json;
use tokio::sync::mpsc;

use sidetabs::app::{App, CoreSignal, HostWindow};
use sidetabs::managers::persistence_store::SqliteTabStore;
use sidetabs::platform;
use sidetabs::services::config_store::ConfigStore;
use sidetabs::services::headless_surface::HeadlessSurfaceFactory;
use sidetabs::types::geometry::Bounds;

/// Headless host: "revealing" it announces readiness on stdout.
struct StdoutHost {
    outbound: mpsc::UnboundedSender<String>,
}

impl HostWindow for StdoutHost {
    fn reveal(&self) {
        let ready = json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")});
        let _ = self.outbound.send(ready.to_string());
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = ConfigStore::load_or_default(None);
    let db_path = platform::database_path(config.data_dir.as_deref());
    log::info!("using tab database at {}", db_path.display());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to start runtime");
    let local = tokio::task::LocalSet::new();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();
    // The headless host never moves; the core stops when stdin closes.
    let (_, signal_rx) = mpsc::unbounded_channel::<CoreSignal>();

    // stdout writer; one line per message
    let writer = thread::spawn(move || {
        let stdout = io::stdout();
        while let Some(line) = outbound_rx.blocking_recv() {
            let mut out = stdout.lock();
            if writeln!(out, "{}", line).and_then(|_| out.flush()).is_err() {
                break;
            }
        }
    });

    // stdin reader; end of input closes the inbound channel, and the core
    // answers everything already read before it stops
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => break,
            };
            if line.trim().is_empty() {
                continue;
            }
            if inbound_tx.send(line).is_err() {
                break;
            }
        }
    });

    local.block_on(&runtime, async move {
        let store = SqliteTabStore::open(db_path);
        let factory = HeadlessSurfaceFactory::new().with_auto_complete(true);
        let host_bounds = Bounds::new(0.0, 0.0, config.window_width, config.window_height);
        let app = App::new(store, factory, &config, host_bounds, outbound_tx.clone());

        let host = StdoutHost { outbound: outbound_tx };
        if let Err(e) = app.startup(&host).await {
            log::error!("startup failed: {}", e);
            return;
        }
        app.run(inbound_rx, signal_rx).await;
    });

    // Dropping the local set releases the senders its tasks still hold.
    drop(local);
    let _ = writer.join();
}
