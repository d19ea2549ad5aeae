use serde_json::{json, Value};

use super::tab::TabStatus;

/// State change committed by the tab registry.
///
/// Emitted only after the in-memory change is applied, so subscribers never
/// observe speculative state.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    Created {
        id: String,
        url: String,
        title: String,
    },
    Switched {
        active_tab_id: Option<String>,
    },
    Closed {
        closed_tab_id: String,
        active_tab_id: Option<String>,
    },
    Navigated {
        tab_id: String,
        url: String,
    },
    TitleUpdated {
        tab_id: String,
        title: String,
    },
    StatusChanged {
        tab_id: String,
        status: TabStatus,
    },
}

impl RegistryEvent {
    /// Channel name of the push message for this event.
    pub fn channel(&self) -> &'static str {
        match self {
            RegistryEvent::Created { .. } => "tabs:created",
            RegistryEvent::Switched { .. } => "tabs:switched",
            RegistryEvent::Closed { .. } => "tabs:closed",
            RegistryEvent::Navigated { .. } => "tabs:navigated",
            RegistryEvent::TitleUpdated { .. } => "tabs:title-updated",
            RegistryEvent::StatusChanged { .. } => "tabs:status-changed",
        }
    }

    /// Payload of the push message for this event.
    pub fn payload(&self) -> Value {
        match self {
            RegistryEvent::Created { id, url, title } => json!({"id": id, "url": url, "title": title}),
            RegistryEvent::Switched { active_tab_id } => json!({"activeTabId": active_tab_id}),
            RegistryEvent::Closed { closed_tab_id, active_tab_id } => {
                json!({"closedTabId": closed_tab_id, "activeTabId": active_tab_id})
            }
            RegistryEvent::Navigated { tab_id, url } => json!({"tabId": tab_id, "url": url}),
            RegistryEvent::TitleUpdated { tab_id, title } => json!({"tabId": tab_id, "title": title}),
            RegistryEvent::StatusChanged { tab_id, status } => {
                json!({"tabId": tab_id, "status": status.as_str()})
            }
        }
    }

    /// Full push envelope: `{"event": <channel>, "data": <payload>}`.
    pub fn to_message(&self) -> Value {
        json!({"event": self.channel(), "data": self.payload()})
    }
}
