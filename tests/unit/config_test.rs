//! Unit tests for the shell configuration and its JSON file store.

use rstest::rstest;
use sidetabs::services::config_store::ConfigStore;
use sidetabs::types::config::{ShellConfig, DEFAULT_URL};
use sidetabs::types::errors::ConfigError;
use sidetabs::types::tab::normalize_url;

#[test]
fn test_defaults() {
    let config = ShellConfig::default();
    assert_eq!(config.sidebar_width, 240.0);
    assert_eq!(config.top_bar_height, 48.0);
    assert_eq!(config.default_url, DEFAULT_URL);
    assert_eq!(config.default_url, "https://www.google.com");
    assert!(!config.always_on_top);
    assert!(config.data_dir.is_none());
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ConfigStore::new(Some(dir.path().join("config.json")));
    assert_eq!(store.load().unwrap(), &ShellConfig::default());
}

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let mut store = ConfigStore::new(Some(path.clone()));
    store.config_mut().sidebar_width = 300.0;
    store.config_mut().default_url = "https://example.com".to_string();
    store.save().unwrap();

    let mut reloaded = ConfigStore::new(Some(path));
    let config = reloaded.load().unwrap();
    assert_eq!(config.sidebar_width, 300.0);
    assert_eq!(config.default_url, "https://example.com");
    assert_eq!(config.top_bar_height, 48.0);
}

#[test]
fn test_partial_file_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"top_bar_height": 60}"#).unwrap();

    let mut store = ConfigStore::new(Some(path));
    let config = store.load().unwrap();
    assert_eq!(config.top_bar_height, 60.0);
    assert_eq!(config.sidebar_width, 240.0);
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    let mut store = ConfigStore::new(Some(path.clone()));
    assert!(matches!(store.load(), Err(ConfigError::Serialization(_))));
    assert_eq!(ConfigStore::load_or_default(Some(path)), ShellConfig::default());
}

#[test]
fn test_layout_comes_from_config() {
    let config = ShellConfig {
        sidebar_width: 200.0,
        top_bar_height: 40.0,
        ..ShellConfig::default()
    };
    let layout = config.layout();
    assert_eq!(layout.sidebar_width, 200.0);
    assert_eq!(layout.top_bar_height, 40.0);
}

// ─── URL normalization ───

#[rstest]
#[case("https://example.com", Some("https://example.com"))]
#[case("  http://example.com  ", Some("http://example.com"))]
#[case("example.com", Some("https://example.com"))]
#[case("about:blank", Some("about:blank"))]
#[case("file:///tmp/a.html", Some("file:///tmp/a.html"))]
#[case("", None)]
#[case("   ", None)]
fn test_normalize_url(#[case] input: &str, #[case] expected: Option<&str>) {
    assert_eq!(normalize_url(input).as_deref(), expected);
}
