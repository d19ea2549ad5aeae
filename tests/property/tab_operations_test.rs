//! Property-based tests for Tab Registry operations.
//!
//! These tests verify the active-pointer invariants: for any sequence of
//! creates, switches and closes, at most one tab is active, the pointer never
//! names a closed tab, and closing the active tab hands focus to the most
//! recently created survivor.

use std::rc::Rc;

use proptest::prelude::*;
use sidetabs::managers::geometry_coordinator::Viewport;
use sidetabs::managers::persistence_store::{PersistenceStore, SqliteTabStore};
use sidetabs::managers::tab_registry::TabRegistry;
use sidetabs::services::headless_surface::HeadlessSurfaceFactory;
use sidetabs::types::config::DEFAULT_URL;
use sidetabs::types::geometry::{Bounds, Layout};

/// Operations that can be performed on the registry.
#[derive(Debug, Clone)]
enum TabOp {
    Create,
    Switch(usize), // index into the live tabs; may overshoot to hit unknown ids
    Close(usize),
    SwitchUnknown,
}

fn arb_tab_ops() -> impl Strategy<Value = Vec<TabOp>> {
    prop::collection::vec(
        prop_oneof![
            3 => Just(TabOp::Create),
            2 => (0..20usize).prop_map(TabOp::Switch),
            2 => (0..20usize).prop_map(TabOp::Close),
            1 => Just(TabOp::SwitchUnknown),
        ],
        1..40,
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// **Property: single active tab, no dangling pointer**
proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn active_pointer_invariants(ops in arb_tab_ops()) {
        runtime().block_on(async {
            let store = SqliteTabStore::open_in_memory();
            store.initialize().await.unwrap();
            let factory = HeadlessSurfaceFactory::new();
            let viewport = Rc::new(Viewport::new(Layout::default(), Bounds::new(0.0, 0.0, 1280.0, 800.0)));
            let (registry, _notices) = TabRegistry::new(store, factory.clone(), viewport, DEFAULT_URL);

            // creation order, used to predict the replacement after a close
            let mut created: Vec<String> = Vec::new();

            for op in &ops {
                let live: Vec<String> = registry.get_all_tabs().into_iter().map(|t| t.id).collect();
                match op {
                    TabOp::Create => {
                        let was_empty = live.is_empty();
                        let before = registry.active_tab_id();
                        let tab = registry.create_tab(None).await.unwrap();
                        created.push(tab.id.clone());
                        if was_empty {
                            prop_assert_eq!(registry.active_tab_id(), Some(tab.id));
                        } else {
                            prop_assert_eq!(registry.active_tab_id(), before);
                        }
                    }
                    TabOp::Switch(idx) => {
                        if live.is_empty() {
                            continue;
                        }
                        let target = live[idx % live.len()].clone();
                        registry.switch_tab(&target).await.unwrap();
                        prop_assert_eq!(registry.active_tab_id(), Some(target));
                    }
                    TabOp::SwitchUnknown => {
                        let before = registry.active_tab_id();
                        prop_assert!(registry.switch_tab("missing").await.is_err());
                        prop_assert_eq!(registry.active_tab_id(), before);
                    }
                    TabOp::Close(idx) => {
                        if live.is_empty() {
                            continue;
                        }
                        let target = live[idx % live.len()].clone();
                        let was_active = registry.active_tab_id().as_deref() == Some(target.as_str());
                        let before = registry.active_tab_id();
                        registry.close_tab(&target).await.unwrap();

                        let expected = if was_active {
                            created
                                .iter()
                                .rev()
                                .find(|id| *id != &target && live.contains(id))
                                .cloned()
                        } else {
                            before
                        };
                        prop_assert_eq!(registry.active_tab_id(), expected);
                    }
                }

                // Invariants after every step
                let tabs = registry.get_all_tabs();
                let visible = factory.surfaces().iter().filter(|s| s.visible).count();
                prop_assert!(visible <= 1, "more than one visible surface after {:?}", op);
                prop_assert_eq!(factory.live_count(), tabs.len());
                match registry.active_tab_id() {
                    Some(active) => {
                        prop_assert!(tabs.iter().any(|t| t.id == active), "dangling pointer");
                        prop_assert_eq!(visible, 1);
                    }
                    None => prop_assert!(tabs.is_empty(), "tabs exist but none active"),
                }
            }

            // The durable pointer agrees with memory once all writes are applied
            prop_assert_eq!(registry.store().active_pointer().await.unwrap(), registry.active_tab_id());
            Ok(())
        })?;
    }
}
