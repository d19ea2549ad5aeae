//! sidetabs — a sidebar multi-tab browsing shell.
//!
//! Entry point: opens the host window with its tab strip and restores the
//! previous session's tabs. When built without the `gui` feature, runs a
//! console demo of the tab core on headless surfaces.

#[cfg(feature = "gui")]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    sidetabs::ui::shell::run();
}

#[cfg(not(feature = "gui"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    println!();
    println!("sidetabs v{} — headless demo", env!("CARGO_PKG_VERSION"));
    println!();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to start runtime");
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, demo());
}

#[cfg(not(feature = "gui"))]
fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

#[cfg(not(feature = "gui"))]
struct ConsoleHost;

#[cfg(not(feature = "gui"))]
impl sidetabs::app::HostWindow for ConsoleHost {
    fn reveal(&self) {
        println!("  ✓ Host revealed");
    }
}

#[cfg(not(feature = "gui"))]
fn print_tabs<S, F>(app: &sidetabs::app::App<S, F>)
where
    S: sidetabs::managers::persistence_store::PersistenceStore + 'static,
    F: sidetabs::services::surface_factory::ContentSurfaceFactory + 'static,
{
    let active = app.registry.active_tab_id();
    for tab in app.registry.get_all_tabs() {
        let marker = if active.as_deref() == Some(tab.id.as_str()) { "▶" } else { " " };
        println!("  {} {:<24} {} [{}]", marker, tab.title, tab.url, tab.status.as_str());
    }
}

#[cfg(not(feature = "gui"))]
async fn demo() {
    use sidetabs::app::App;
    use sidetabs::managers::persistence_store::SqliteTabStore;
    use sidetabs::services::headless_surface::HeadlessSurfaceFactory;
    use sidetabs::types::config::ShellConfig;
    use sidetabs::types::geometry::Bounds;

    let config = ShellConfig::default();
    let store = SqliteTabStore::open_in_memory();
    let factory = HeadlessSurfaceFactory::new().with_auto_complete(true);
    let (outbound, _responses) = tokio::sync::mpsc::unbounded_channel();
    let app = App::new(
        store,
        factory,
        &config,
        Bounds::new(0.0, 0.0, config.window_width, config.window_height),
        outbound,
    );

    section("Startup");
    match app.startup(&ConsoleHost).await {
        Ok(count) => println!("  Live tabs after startup: {}", count),
        Err(e) => {
            println!("  ✗ Startup failed: {}", e);
            return;
        }
    }
    app.drain_notices().await;
    print_tabs(&app);
    println!();

    section("Create / switch / navigate");
    let mut ids = Vec::new();
    for url in ["github.com", "https://docs.rs", "example.org"] {
        match app.registry.create_tab(Some(url)).await {
            Ok(tab) => ids.push(tab.id),
            Err(e) => println!("  ✗ create {}: {}", url, e),
        }
    }
    if let Some(id) = ids.get(1) {
        let _ = app.registry.switch_tab(id).await;
        let _ = app.registry.navigate_tab(id, "crates.io").await;
    }
    app.drain_notices().await;
    print_tabs(&app);
    println!();

    section("Close active tab");
    if let Some(active) = app.registry.active_tab_id() {
        let _ = app.registry.close_tab(&active).await;
    }
    print_tabs(&app);
    println!();

    section("Geometry");
    let updated = app
        .geometry
        .on_host_changed(Bounds::new(100.0, 80.0, 1024.0, 700.0));
    println!(
        "  Repositioned {} surfaces to {:?}",
        updated,
        app.geometry.viewport().surface_bounds()
    );
    println!();

    let released = app.shutdown();
    println!("  ✓ Shut down, released {} surfaces", released);
}
