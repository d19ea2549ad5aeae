use serde::{Deserialize, Serialize};

/// Title shown until the content surface reports one.
pub const PLACEHOLDER_TITLE: &str = "Loading...";

/// Title shown when the content surface failed to load the tab's url.
pub const LOAD_ERROR_TITLE: &str = "Failed to load";

/// Load status of a tab's content surface. Runtime-only, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Loading,
    Ready,
    Error,
}

impl TabStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TabStatus::Loading => "loading",
            TabStatus::Ready => "ready",
            TabStatus::Error => "error",
        }
    }
}

/// A live tab as reported by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: String,
    pub url: String,
    pub title: String,
    pub created_at: i64,
    pub last_accessed: i64,
    pub status: TabStatus,
}

impl Tab {
    /// The durable part of this tab.
    pub fn to_record(&self) -> TabRecord {
        TabRecord {
            id: self.id.clone(),
            url: self.url.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            last_accessed: self.last_accessed,
        }
    }

    /// Rebuilds a live tab from a persisted record. Rehydrated tabs start loading.
    pub fn from_record(record: TabRecord) -> Self {
        Self {
            id: record.id,
            url: record.url,
            title: record.title,
            created_at: record.created_at,
            last_accessed: record.last_accessed,
            status: TabStatus::Loading,
        }
    }
}

/// Durable record for one tab: `{id, url, title, createdAt, lastAccessed}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    pub id: String,
    pub url: String,
    pub title: String,
    pub created_at: i64,
    pub last_accessed: i64,
}

/// Normalizes user-supplied url input.
///
/// Returns `None` for blank input so the caller can fall back to its default url.
/// Known schemes are kept as typed; bare hosts such as `example.com` get `https://`.
pub fn normalize_url(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = url::Url::parse(trimmed) {
        if matches!(parsed.scheme(), "http" | "https" | "about" | "file" | "data") {
            return Some(trimmed.to_string());
        }
    }
    if trimmed.contains(char::is_whitespace) {
        return Some(trimmed.to_string());
    }
    Some(format!("https://{}", trimmed))
}

/// Derives a short title from a url: its host without a leading `www.`.
pub fn title_from_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.trim_start_matches("www.").to_string(),
            None => url.to_string(),
        },
        Err(_) => url.to_string(),
    }
}
