// sidetabs state managers
// Managers own the shell's stateful core: the tab registry, its durable store, and surface geometry.

pub mod geometry_coordinator;
pub mod persistence_store;
pub mod tab_registry;
