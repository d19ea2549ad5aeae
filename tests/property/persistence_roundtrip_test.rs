//! Property-based tests for tab persistence round-trip.
//!
//! For any sequence of registry operations against an on-disk store,
//! rehydrating a fresh registry from that file reproduces the live tabs' ids,
//! urls and titles and the active pointer.

use std::path::Path;
use std::rc::Rc;

use proptest::prelude::*;
use sidetabs::managers::geometry_coordinator::Viewport;
use sidetabs::managers::persistence_store::{PersistenceStore, SqliteTabStore};
use sidetabs::managers::tab_registry::TabRegistry;
use sidetabs::services::headless_surface::HeadlessSurfaceFactory;
use sidetabs::types::config::DEFAULT_URL;
use sidetabs::types::geometry::{Bounds, Layout};
use sidetabs::types::tab::TabRecord;

#[derive(Debug, Clone)]
enum Op {
    Create(String),
    Switch(usize),
    Close(usize),
    Navigate(usize, String),
    Title(usize, String),
}

fn arb_url() -> impl Strategy<Value = String> {
    "https://[a-z]{3,12}\\.[a-z]{2,4}/[a-z0-9/_-]{0,20}"
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            3 => arb_url().prop_map(Op::Create),
            1 => (0..10usize).prop_map(Op::Switch),
            1 => (0..10usize).prop_map(Op::Close),
            2 => ((0..10usize), arb_url()).prop_map(|(i, u)| Op::Navigate(i, u)),
            2 => ((0..10usize), "[A-Za-z0-9 äöü]{1,30}").prop_map(|(i, t)| Op::Title(i, t)),
        ],
        1..30,
    )
}

type Registry = TabRegistry<SqliteTabStore, HeadlessSurfaceFactory>;

async fn open(path: &Path) -> Registry {
    let store = SqliteTabStore::open(path);
    store.initialize().await.unwrap();
    let viewport = Rc::new(Viewport::new(Layout::default(), Bounds::new(0.0, 0.0, 1280.0, 800.0)));
    let (registry, _notices) = TabRegistry::new(store, HeadlessSurfaceFactory::new(), viewport, DEFAULT_URL);
    registry
}

fn snapshot(registry: &Registry) -> Vec<(String, String, String)> {
    let mut tabs: Vec<(String, String, String)> = registry
        .get_all_tabs()
        .into_iter()
        .map(|t| (t.id, t.url, t.title))
        .collect();
    tabs.sort();
    tabs
}

// **Property: persisted state reloaded from scratch reproduces the session**
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn registry_state_survives_reload(ops in arb_ops()) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sidetabs.db");
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();

        runtime.block_on(async {
            let (before, active_before) = {
                let registry = open(&path).await;
                for op in &ops {
                    let live: Vec<String> = registry.get_all_tabs().into_iter().map(|t| t.id).collect();
                    let pick = |i: usize| live.get(i % live.len().max(1)).cloned();
                    match op {
                        Op::Create(url) => {
                            registry.create_tab(Some(url)).await.unwrap();
                        }
                        Op::Switch(i) => {
                            if let Some(id) = pick(*i) {
                                registry.switch_tab(&id).await.unwrap();
                            }
                        }
                        Op::Close(i) => {
                            if let Some(id) = pick(*i) {
                                registry.close_tab(&id).await.unwrap();
                            }
                        }
                        Op::Navigate(i, url) => {
                            if let Some(id) = pick(*i) {
                                registry.navigate_tab(&id, url).await.unwrap();
                            }
                        }
                        Op::Title(i, title) => {
                            if let Some(id) = pick(*i) {
                                registry.update_tab_title(&id, title).await;
                            }
                        }
                    }
                }
                (snapshot(&registry), registry.active_tab_id())
            };

            let reloaded = open(&path).await;
            let restored = reloaded.initialize().await.unwrap();
            prop_assert_eq!(restored, before.len());
            prop_assert_eq!(snapshot(&reloaded), before);
            prop_assert_eq!(reloaded.active_tab_id(), active_before);
            Ok(())
        })?;
    }

    #[test]
    fn record_round_trips_through_store(
        id in "[a-f0-9-]{1,36}",
        url in "\\PC{0,80}",
        title in "\\PC{0,80}",
        created_at in any::<i64>(),
        last_accessed in any::<i64>(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let record = TabRecord { id, url, title, created_at, last_accessed };

        runtime.block_on(async {
            let store = SqliteTabStore::open_in_memory();
            store.initialize().await.unwrap();
            store.upsert(&record).await.unwrap();
            store.set_active_pointer(Some(&record.id)).await.unwrap();

            prop_assert_eq!(store.load().await.unwrap(), vec![record.clone()]);
            prop_assert_eq!(store.active_pointer().await.unwrap(), Some(record.id.clone()));
            Ok(())
        })?;
    }
}
