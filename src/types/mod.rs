// sidetabs shared type definitions
// Each submodule defines types used across the registry, store, surfaces and bridge.

pub mod config;
pub mod errors;
pub mod event;
pub mod geometry;
pub mod surface;
pub mod tab;
