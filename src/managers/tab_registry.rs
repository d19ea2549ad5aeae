//! Tab Registry for sidetabs.
//!
//! The authoritative in-memory set of live tabs and the active-tab pointer.
//! Every operation mutates memory first, in one synchronous step, and then
//! issues a best-effort durability write. Store failures are recorded in
//! [`Diagnostics`] and never undo the in-memory change.
//!
//! The registry runs on a single thread; concurrent operations interleave only
//! at `.await` points (surface creation, surface navigation, store I/O). Tab
//! liveness is checked again after each of those points, so a tab closed in
//! the meantime is never touched or written back.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{broadcast, mpsc};
use url::Url;
use uuid::Uuid;

use crate::managers::geometry_coordinator::Viewport;
use crate::managers::persistence_store::PersistenceStore;
use crate::services::surface_factory::ContentSurfaceFactory;
use crate::types::errors::{StoreError, TabError};
use crate::types::event::RegistryEvent;
use crate::types::geometry::Bounds;
use crate::types::surface::{LoadEvent, SurfaceHandle, SurfaceHooks, SurfaceId, SurfaceRequest};
use crate::types::tab::{normalize_url, Tab, TabStatus, LOAD_ERROR_TITLE, PLACEHOLDER_TITLE};

/// Buffer of the registry event channel. Slow subscribers lose the oldest events.
pub const EVENT_CAPACITY: usize = 256;

/// Notification raised by a content surface through its hooks.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceNotice {
    TitleChanged { tab_id: String, title: String },
    Load { tab_id: String, event: LoadEvent },
}

/// Receiving end for surface notices; drain it into [`TabRegistry::handle_surface_notice`].
pub type SurfaceNotices = mpsc::UnboundedReceiver<SurfaceNotice>;

/// Observability sink for durability failures.
#[derive(Debug, Default)]
pub struct Diagnostics {
    store_failures: Cell<u64>,
    last_store_error: RefCell<Option<String>>,
}

impl Diagnostics {
    pub fn store_failures(&self) -> u64 {
        self.store_failures.get()
    }

    pub fn last_store_error(&self) -> Option<String> {
        self.last_store_error.borrow().clone()
    }

    pub fn record_store_failure(&self, operation: &str, err: &StoreError) {
        log::error!("store {} failed: {}", operation, err);
        self.store_failures.set(self.store_failures.get() + 1);
        *self.last_store_error.borrow_mut() = Some(format!("{}: {}", operation, err));
    }
}

struct TabEntry {
    tab: Tab,
    surface: SurfaceHandle,
    /// Insertion order; breaks ties between equal creation timestamps.
    seq: u64,
}

#[derive(Default)]
struct RegistryState {
    entries: Vec<TabEntry>,
    active: Option<String>,
    next_seq: u64,
    last_stamp: i64,
    shut_down: bool,
    /// While set, activation leaves the active surface hidden.
    presentation_held: bool,
}

impl RegistryState {
    fn position(&self, tab_id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.tab.id == tab_id)
    }

    fn entry(&self, tab_id: &str) -> Option<&TabEntry> {
        self.entries.iter().find(|e| e.tab.id == tab_id)
    }

    fn entry_mut(&mut self, tab_id: &str) -> Option<&mut TabEntry> {
        self.entries.iter_mut().find(|e| e.tab.id == tab_id)
    }

    fn is_live(&self, tab_id: &str) -> bool {
        self.position(tab_id).is_some()
    }

    /// Millisecond timestamp that never goes backwards, even if the wall clock does.
    fn stamp(&mut self) -> i64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;
        self.last_stamp = self.last_stamp.max(now);
        self.last_stamp
    }

    fn push(&mut self, tab: Tab, surface: SurfaceHandle) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(TabEntry { tab, surface, seq });
    }

    fn most_recently_created(&self) -> Option<String> {
        self.entries
            .iter()
            .max_by_key(|e| (e.tab.created_at, e.seq))
            .map(|e| e.tab.id.clone())
    }
}

/// The tab registry. Share it with `Rc`; all operations take `&self`.
pub struct TabRegistry<S, F> {
    store: S,
    factory: F,
    viewport: Rc<Viewport>,
    default_url: String,
    state: RefCell<RegistryState>,
    events: broadcast::Sender<RegistryEvent>,
    notices: mpsc::UnboundedSender<SurfaceNotice>,
    diagnostics: Diagnostics,
}

impl<S, F> TabRegistry<S, F>
where
    S: PersistenceStore,
    F: ContentSurfaceFactory,
{
    /// Creates an empty registry and the receiver for its surface notices.
    pub fn new(
        store: S,
        factory: F,
        viewport: Rc<Viewport>,
        default_url: impl Into<String>,
    ) -> (Self, SurfaceNotices) {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (notices, notices_rx) = mpsc::unbounded_channel();
        let registry = Self {
            store,
            factory,
            viewport,
            default_url: default_url.into(),
            state: RefCell::new(RegistryState::default()),
            events,
            notices,
            diagnostics: Diagnostics::default(),
        };
        (registry, notices_rx)
    }

    // ─── Lifecycle ───

    /// Rehydrates every persisted tab into a live surface.
    ///
    /// The persisted active pointer is restored when it names a rehydrated tab;
    /// otherwise the first rehydrated tab (most recently accessed) becomes active.
    /// Store failures degrade to an empty registry. Returns the number of tabs restored.
    pub async fn initialize(&self) -> Result<usize, TabError> {
        self.ensure_running()?;

        let records = match self.store.load().await {
            Ok(records) => records,
            Err(e) => {
                self.diagnostics.record_store_failure("load", &e);
                Vec::new()
            }
        };
        let persisted_pointer = match self.store.active_pointer().await {
            Ok(pointer) => pointer,
            Err(e) => {
                self.diagnostics.record_store_failure("read active pointer", &e);
                None
            }
        };

        let mut restored = 0;
        for record in records {
            if self.state.borrow().is_live(&record.id) {
                continue;
            }
            let tab = Tab::from_record(record);
            let bounds = self.viewport.surface_bounds();
            let request = SurfaceRequest {
                tab_id: tab.id.clone(),
                url: tab.url.clone(),
                bounds,
                visible: false,
                hooks: self.hooks_for(&tab.id),
            };
            let handle = match self.factory.create(request).await {
                Ok(handle) => handle,
                Err(e) => {
                    log::error!("could not restore tab {}: {}", tab.id, e);
                    continue;
                }
            };
            let mut state = self.state.borrow_mut();
            if state.shut_down {
                drop(state);
                self.release(handle);
                return Err(TabError::ShutDown);
            }
            state.last_stamp = state.last_stamp.max(tab.created_at).max(tab.last_accessed);
            self.catch_up_bounds(handle.id(), bounds);
            state.push(tab, handle);
            restored += 1;
        }

        let active = {
            let mut state = self.state.borrow_mut();
            let target = persisted_pointer
                .as_deref()
                .filter(|id| state.is_live(id))
                .map(str::to_string)
                .or_else(|| state.entries.first().map(|e| e.tab.id.clone()));
            if let Some(id) = target.as_deref() {
                self.activate_locked(&mut state, id, false);
            }
            target
        };

        log::info!("rehydrated {} tabs, active: {:?}", restored, active);
        if active.is_some() {
            self.emit(RegistryEvent::Switched { active_tab_id: active.clone() });
        }
        if active != persisted_pointer {
            self.persist_active_pointer().await;
        }
        Ok(restored)
    }

    /// Keeps the active surface hidden until [`TabRegistry::present`] is called.
    /// Used while the host window itself is still hidden.
    pub fn hold_presentation(&self) {
        self.state.borrow_mut().presentation_held = true;
    }

    /// Ends a presentation hold and shows the active surface.
    pub fn present(&self) {
        let mut state = self.state.borrow_mut();
        if !std::mem::take(&mut state.presentation_held) {
            return;
        }
        let active = state.active.as_deref().and_then(|id| state.entry(id));
        if let Some(entry) = active {
            self.apply_visibility(entry.surface.id(), true);
        }
    }

    /// Releases every surface. Durable records are kept for the next session.
    /// Returns the number of surfaces released.
    pub fn shutdown(&self) -> usize {
        let entries = {
            let mut state = self.state.borrow_mut();
            state.shut_down = true;
            state.active = None;
            std::mem::take(&mut state.entries)
        };
        let count = entries.len();
        for entry in entries {
            self.release(entry.surface);
        }
        log::info!("tab registry shut down, released {} surfaces", count);
        count
    }

    // ─── Operations ───

    /// Creates a tab, loading `url` (or the default url when absent or blank).
    ///
    /// The tab becomes active only if the registry was otherwise empty when it
    /// was inserted. A surface creation failure leaves the registry untouched.
    pub async fn create_tab(&self, url: Option<&str>) -> Result<Tab, TabError> {
        self.ensure_running()?;
        let url = url
            .and_then(normalize_url)
            .unwrap_or_else(|| self.default_url.clone());
        let id = Uuid::new_v4().to_string();

        let bounds = self.viewport.surface_bounds();
        let request = SurfaceRequest {
            tab_id: id.clone(),
            url: url.clone(),
            bounds,
            visible: false,
            hooks: self.hooks_for(&id),
        };
        let handle = self.factory.create(request).await?;

        let (tab, activated) = {
            let mut state = self.state.borrow_mut();
            if state.shut_down {
                drop(state);
                self.release(handle);
                return Err(TabError::ShutDown);
            }
            let now = state.stamp();
            let tab = Tab {
                id: id.clone(),
                url,
                title: PLACEHOLDER_TITLE.to_string(),
                created_at: now,
                last_accessed: now,
                status: TabStatus::Loading,
            };
            let first = state.entries.is_empty();
            self.catch_up_bounds(handle.id(), bounds);
            state.push(tab.clone(), handle);
            if first {
                self.activate_locked(&mut state, &id, false);
            }
            (tab, first)
        };

        log::info!("created tab {} -> {}", tab.id, tab.url);
        self.emit(RegistryEvent::Created {
            id: tab.id.clone(),
            url: tab.url.clone(),
            title: tab.title.clone(),
        });
        if activated {
            self.emit(RegistryEvent::Switched { active_tab_id: Some(tab.id.clone()) });
        }

        self.persist_tab(&tab.id).await;
        if activated {
            self.persist_active_pointer().await;
        }
        Ok(tab)
    }

    /// Makes `tab_id` the active tab. Switching to the active tab is a no-op.
    pub async fn switch_tab(&self, tab_id: &str) -> Result<(), TabError> {
        self.ensure_running()?;
        {
            let mut state = self.state.borrow_mut();
            if !state.is_live(tab_id) {
                return Err(TabError::NotFound(tab_id.to_string()));
            }
            if state.active.as_deref() == Some(tab_id) {
                return Ok(());
            }
            self.activate_locked(&mut state, tab_id, true);
        }

        log::debug!("switched to tab {}", tab_id);
        self.emit(RegistryEvent::Switched { active_tab_id: Some(tab_id.to_string()) });
        self.persist_active_pointer().await;
        self.persist_tab(tab_id).await;
        Ok(())
    }

    /// Closes a tab and destroys its surface.
    ///
    /// If it was active, the most recently created remaining tab is switched to;
    /// with no tabs left the active pointer becomes none.
    pub async fn close_tab(&self, tab_id: &str) -> Result<(), TabError> {
        self.ensure_running()?;
        let (surface, replacement, active_after) = {
            let mut state = self.state.borrow_mut();
            let pos = state
                .position(tab_id)
                .ok_or_else(|| TabError::NotFound(tab_id.to_string()))?;
            let entry = state.entries.remove(pos);
            let mut replacement = None;
            if state.active.as_deref() == Some(tab_id) {
                state.active = None;
                replacement = state.most_recently_created();
                if let Some(next) = replacement.as_deref() {
                    self.activate_locked(&mut state, next, true);
                }
            }
            (entry.surface, replacement, state.active.clone())
        };
        self.release(surface);

        log::info!("closed tab {}, active now {:?}", tab_id, active_after);
        self.emit(RegistryEvent::Closed {
            closed_tab_id: tab_id.to_string(),
            active_tab_id: active_after,
        });

        if let Err(e) = self.store.remove(tab_id).await {
            self.diagnostics.record_store_failure("remove", &e);
        }
        self.persist_active_pointer().await;
        if let Some(next) = replacement {
            self.persist_tab(&next).await;
        }
        Ok(())
    }

    /// Points a tab at a new url.
    ///
    /// The url is stored before the load completes; a later call wins over an
    /// earlier one. A load that cannot be dispatched keeps the url and turns
    /// the title into an error indicator; the call still succeeds.
    pub async fn navigate_tab(&self, tab_id: &str, url: &str) -> Result<(), TabError> {
        self.ensure_running()?;
        let url = normalize_url(url).unwrap_or_else(|| self.default_url.clone());
        let surface = {
            let mut state = self.state.borrow_mut();
            if !state.is_live(tab_id) {
                return Err(TabError::NotFound(tab_id.to_string()));
            }
            let stamp = state.stamp();
            let entry = state
                .entry_mut(tab_id)
                .ok_or_else(|| TabError::NotFound(tab_id.to_string()))?;
            entry.tab.url = url.clone();
            entry.tab.status = TabStatus::Loading;
            entry.tab.last_accessed = stamp;
            entry.surface.id()
        };

        self.emit(RegistryEvent::Navigated { tab_id: tab_id.to_string(), url: url.clone() });
        self.emit(RegistryEvent::StatusChanged { tab_id: tab_id.to_string(), status: TabStatus::Loading });

        if let Err(err) = self.factory.navigate(surface, &url).await {
            let current_url = self.state.borrow().entry(tab_id).map(|e| e.tab.url.clone());
            match current_url {
                None => return Err(TabError::NotFound(tab_id.to_string())),
                Some(current) if current == url => {
                    log::warn!("tab {} failed to load {}: {}", tab_id, url, err);
                    self.mark_load_failed(tab_id);
                }
                Some(_) => log::debug!("ignoring failure of superseded load {}", url),
            }
        }

        if !self.is_live(tab_id) {
            return Err(TabError::NotFound(tab_id.to_string()));
        }
        self.persist_tab(tab_id).await;
        Ok(())
    }

    /// Applies a title reported by a tab's surface.
    ///
    /// Returns false, without error, when the tab is gone or the title is blank.
    pub async fn update_tab_title(&self, tab_id: &str, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }
        {
            let mut state = self.state.borrow_mut();
            if state.shut_down || !state.is_live(tab_id) {
                log::debug!("dropping title for closed tab {}", tab_id);
                return false;
            }
            let stamp = state.stamp();
            if let Some(entry) = state.entry_mut(tab_id) {
                entry.tab.title = title.to_string();
                entry.tab.last_accessed = stamp;
            }
        }

        self.emit(RegistryEvent::TitleUpdated {
            tab_id: tab_id.to_string(),
            title: title.to_string(),
        });
        self.persist_tab(tab_id).await;
        true
    }

    /// Routes one surface notice to the matching registry update.
    pub async fn handle_surface_notice(&self, notice: SurfaceNotice) {
        match notice {
            SurfaceNotice::TitleChanged { tab_id, title } => {
                self.update_tab_title(&tab_id, &title).await;
            }
            SurfaceNotice::Load { tab_id, event } => self.apply_load_event(&tab_id, event).await,
        }
    }

    // ─── Queries (in-memory only) ───

    /// Live tabs in insertion order.
    pub fn get_all_tabs(&self) -> Vec<Tab> {
        self.state.borrow().entries.iter().map(|e| e.tab.clone()).collect()
    }

    pub fn get_active_tab(&self) -> Option<Tab> {
        let state = self.state.borrow();
        state
            .active
            .as_deref()
            .and_then(|id| state.entry(id))
            .map(|e| e.tab.clone())
    }

    pub fn get_tab(&self, tab_id: &str) -> Option<Tab> {
        self.state.borrow().entry(tab_id).map(|e| e.tab.clone())
    }

    pub fn active_tab_id(&self) -> Option<String> {
        self.state.borrow().active.clone()
    }

    pub fn tab_count(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_live(&self, tab_id: &str) -> bool {
        self.state.borrow().is_live(tab_id)
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.borrow().shut_down
    }

    /// Surfaces of every live tab, active and hidden alike.
    pub fn surface_ids(&self) -> Vec<SurfaceId> {
        self.state.borrow().entries.iter().map(|e| e.surface.id()).collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn viewport(&self) -> Rc<Viewport> {
        self.viewport.clone()
    }

    // ─── Internals ───

    fn ensure_running(&self) -> Result<(), TabError> {
        if self.state.borrow().shut_down {
            return Err(TabError::ShutDown);
        }
        Ok(())
    }

    /// Shows `tab_id`, hides the previously active tab and moves the pointer.
    /// The caller has checked that `tab_id` is live.
    fn activate_locked(&self, state: &mut RegistryState, tab_id: &str, touch: bool) {
        let previous = state.active.replace(tab_id.to_string());
        if let Some(prev) = previous.as_deref().filter(|p| *p != tab_id) {
            if let Some(entry) = state.entry(prev) {
                self.apply_visibility(entry.surface.id(), false);
            }
        }
        let stamp = if touch { Some(state.stamp()) } else { None };
        let show = !state.presentation_held;
        if let Some(entry) = state.entry_mut(tab_id) {
            if let Some(stamp) = stamp {
                entry.tab.last_accessed = stamp;
            }
            if show {
                self.apply_visibility(entry.surface.id(), true);
            }
        }
    }

    /// A host move during surface creation is missed by the coordinator, which
    /// only sees registered surfaces. Re-applies the bounds if they went stale.
    fn catch_up_bounds(&self, surface: SurfaceId, requested: Bounds) {
        let current = self.viewport.surface_bounds();
        if current == requested {
            return;
        }
        if let Err(e) = self.factory.set_bounds(surface, current) {
            log::warn!("could not position {}: {}", surface, e);
        }
    }

    fn apply_visibility(&self, surface: SurfaceId, visible: bool) {
        if let Err(e) = self.factory.set_visible(surface, visible) {
            log::warn!("could not set visibility of {}: {}", surface, e);
        }
    }

    fn release(&self, surface: SurfaceHandle) {
        let id = surface.id();
        if let Err(e) = self.factory.destroy(surface) {
            log::error!("failed to destroy {}: {}", id, e);
        }
    }

    fn mark_load_failed(&self, tab_id: &str) -> bool {
        {
            let mut state = self.state.borrow_mut();
            let Some(entry) = state.entry_mut(tab_id) else {
                return false;
            };
            entry.tab.status = TabStatus::Error;
            entry.tab.title = LOAD_ERROR_TITLE.to_string();
        }
        self.emit(RegistryEvent::StatusChanged { tab_id: tab_id.to_string(), status: TabStatus::Error });
        self.emit(RegistryEvent::TitleUpdated {
            tab_id: tab_id.to_string(),
            title: LOAD_ERROR_TITLE.to_string(),
        });
        true
    }

    async fn apply_load_event(&self, tab_id: &str, event: LoadEvent) {
        log::trace!("tab {} load event at {}", tab_id, event.url());
        let status = match &event {
            LoadEvent::Started { .. } => TabStatus::Loading,
            LoadEvent::Finished { .. } => TabStatus::Ready,
            LoadEvent::Failed { url, reason } => {
                // Redirects change the url mid-load; only failures are matched
                // against the current url so a stale load cannot mark the tab.
                let current = self.state.borrow().entry(tab_id).map(|e| e.tab.url.clone());
                match current {
                    Some(current) if same_url(&current, url) => {
                        log::warn!("tab {} failed to load {}: {}", tab_id, url, reason);
                        if self.mark_load_failed(tab_id) {
                            self.persist_tab(tab_id).await;
                        }
                    }
                    Some(_) => log::debug!("ignoring failure of superseded load {}", url),
                    None => {}
                }
                return;
            }
        };

        let changed = {
            let mut state = self.state.borrow_mut();
            match state.entry_mut(tab_id) {
                Some(entry) if entry.tab.status != status => {
                    entry.tab.status = status;
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.emit(RegistryEvent::StatusChanged { tab_id: tab_id.to_string(), status });
        }
    }

    fn hooks_for(&self, tab_id: &str) -> SurfaceHooks {
        let title_tx = self.notices.clone();
        let title_tab = tab_id.to_string();
        let load_tx = self.notices.clone();
        let load_tab = tab_id.to_string();
        SurfaceHooks {
            on_title_changed: Box::new(move |title| {
                let _ = title_tx.send(SurfaceNotice::TitleChanged { tab_id: title_tab.clone(), title });
            }),
            on_load_event: Box::new(move |event| {
                let _ = load_tx.send(SurfaceNotice::Load { tab_id: load_tab.clone(), event });
            }),
        }
    }

    /// Pushes an event; having no subscribers is fine.
    fn emit(&self, event: RegistryEvent) {
        let _ = self.events.send(event);
    }

    /// Writes the tab's current record, unless it was closed in the meantime.
    async fn persist_tab(&self, tab_id: &str) {
        let record = match self.state.borrow().entry(tab_id) {
            Some(entry) => entry.tab.to_record(),
            None => return,
        };
        if let Err(e) = self.store.upsert(&record).await {
            self.diagnostics.record_store_failure("upsert", &e);
        }
    }

    /// Writes the pointer as it is in memory at the time of the call.
    async fn persist_active_pointer(&self) {
        let active = self.state.borrow().active.clone();
        if let Err(e) = self.store.set_active_pointer(active.as_deref()).await {
            self.diagnostics.record_store_failure("set active pointer", &e);
        }
    }
}

/// Compares two urls after parsing, so `https://a.com` matches `https://a.com/`.
fn same_url(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
