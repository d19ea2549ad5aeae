use sidetabs::types::errors::*;
use sidetabs::types::surface::SurfaceId;

// === TabError Tests ===

#[test]
fn tab_error_not_found_display() {
    let err = TabError::NotFound("tab-123".to_string());
    assert_eq!(err.to_string(), "Tab not found: tab-123");
}

#[test]
fn tab_error_shut_down_display() {
    assert_eq!(TabError::ShutDown.to_string(), "Tab registry is shut down");
}

#[test]
fn tab_error_wraps_surface_error_transparently() {
    let err: TabError = SurfaceError::Create {
        tab_id: "t1".to_string(),
        reason: "no display".to_string(),
    }
    .into();
    assert!(matches!(err, TabError::Surface(_)));
    assert_eq!(err.to_string(), "Failed to create surface for tab t1: no display");
}

#[test]
fn tab_error_implements_error_trait() {
    let err: Box<dyn std::error::Error> = Box::new(TabError::NotFound("id".to_string()));
    assert!(err.source().is_none());
}

// === SurfaceError Tests ===

#[test]
fn surface_error_display_variants() {
    assert_eq!(
        SurfaceError::Load {
            url: "https://example.com".to_string(),
            reason: "dns".to_string()
        }
        .to_string(),
        "Failed to load https://example.com: dns"
    );
    assert_eq!(
        SurfaceError::UnknownSurface(SurfaceId(7)).to_string(),
        "Unknown surface: surface-7"
    );
    assert_eq!(SurfaceError::HostUnavailable.to_string(), "Surface host unavailable");
}

// === StoreError Tests ===

#[test]
fn store_error_display_variants() {
    assert_eq!(
        StoreError::Database("disk full".to_string()).to_string(),
        "Database error: disk full"
    );
    assert_eq!(StoreError::NotInitialized.to_string(), "Store not initialized");
    assert_eq!(StoreError::WorkerUnavailable.to_string(), "Store worker unavailable");
}

#[test]
fn store_error_from_rusqlite() {
    let err: StoreError = rusqlite::Error::InvalidQuery.into();
    assert!(matches!(err, StoreError::Database(_)));
    assert!(err.to_string().starts_with("Database error: "));
}

// === ConfigError Tests ===

#[test]
fn config_error_display_variants() {
    assert_eq!(ConfigError::Io("denied".to_string()).to_string(), "I/O error: denied");
    assert_eq!(
        ConfigError::Serialization("bad json".to_string()).to_string(),
        "Serialization error: bad json"
    );
}
