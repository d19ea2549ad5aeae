//! Persistence Store for sidetabs.
//!
//! Durable records for tabs and the active-tab pointer, backed by SQLite.
//! The connection lives on a dedicated worker thread; requests are queued over
//! a channel and answered over oneshot replies, so writes apply in issue order
//! and the async caller never blocks on disk I/O.

use std::path::PathBuf;
use std::rc::Rc;
use std::thread;

use rusqlite::{params, OptionalExtension};
use tokio::sync::{mpsc, oneshot};

use crate::database::connection::Database;
use crate::types::errors::StoreError;
use crate::types::tab::TabRecord;

/// Durable store contract for tab records and the active-tab pointer.
///
/// Every operation is idempotent: repeating it has no effect beyond the last write.
#[allow(async_fn_in_trait)]
pub trait PersistenceStore {
    async fn initialize(&self) -> Result<(), StoreError>;
    /// All records, most recently accessed first.
    async fn load(&self) -> Result<Vec<TabRecord>, StoreError>;
    async fn upsert(&self, record: &TabRecord) -> Result<(), StoreError>;
    async fn remove(&self, tab_id: &str) -> Result<(), StoreError>;
    async fn active_pointer(&self) -> Result<Option<String>, StoreError>;
    async fn set_active_pointer(&self, tab_id: Option<&str>) -> Result<(), StoreError>;
}

impl<S: PersistenceStore> PersistenceStore for Rc<S> {
    async fn initialize(&self) -> Result<(), StoreError> {
        (**self).initialize().await
    }

    async fn load(&self) -> Result<Vec<TabRecord>, StoreError> {
        (**self).load().await
    }

    async fn upsert(&self, record: &TabRecord) -> Result<(), StoreError> {
        (**self).upsert(record).await
    }

    async fn remove(&self, tab_id: &str) -> Result<(), StoreError> {
        (**self).remove(tab_id).await
    }

    async fn active_pointer(&self) -> Result<Option<String>, StoreError> {
        (**self).active_pointer().await
    }

    async fn set_active_pointer(&self, tab_id: Option<&str>) -> Result<(), StoreError> {
        (**self).set_active_pointer(tab_id).await
    }
}

type Reply<T> = oneshot::Sender<Result<T, StoreError>>;

enum StoreCommand {
    Initialize { reply: Reply<()> },
    Load { reply: Reply<Vec<TabRecord>> },
    Upsert { record: TabRecord, reply: Reply<()> },
    Remove { tab_id: String, reply: Reply<()> },
    GetActive { reply: Reply<Option<String>> },
    SetActive { tab_id: Option<String>, reply: Reply<()> },
}

enum Location {
    File(PathBuf),
    Memory,
}

/// SQLite-backed [`PersistenceStore`].
///
/// Opening only starts the worker; the database itself is opened (and
/// migrated) by [`PersistenceStore::initialize`].
pub struct SqliteTabStore {
    tx: mpsc::UnboundedSender<StoreCommand>,
}

impl SqliteTabStore {
    /// Store backed by a database file at `path`.
    pub fn open<P: Into<PathBuf>>(path: P) -> Self {
        Self::spawn(Location::File(path.into()))
    }

    /// Store backed by a private in-memory database.
    pub fn open_in_memory() -> Self {
        Self::spawn(Location::Memory)
    }

    fn spawn(location: Location) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let spawned = thread::Builder::new()
            .name("sidetabs-store".into())
            .spawn(move || StoreWorker { location, db: None }.run(rx));
        if let Err(e) = spawned {
            log::error!("failed to start store worker: {}", e);
        }
        Self { tx }
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> StoreCommand) -> Result<T, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| StoreError::WorkerUnavailable)?;
        rx.await.map_err(|_| StoreError::WorkerUnavailable)?
    }
}

impl PersistenceStore for SqliteTabStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        self.request(|reply| StoreCommand::Initialize { reply }).await
    }

    async fn load(&self) -> Result<Vec<TabRecord>, StoreError> {
        self.request(|reply| StoreCommand::Load { reply }).await
    }

    async fn upsert(&self, record: &TabRecord) -> Result<(), StoreError> {
        let record = record.clone();
        self.request(|reply| StoreCommand::Upsert { record, reply }).await
    }

    async fn remove(&self, tab_id: &str) -> Result<(), StoreError> {
        let tab_id = tab_id.to_string();
        self.request(|reply| StoreCommand::Remove { tab_id, reply }).await
    }

    async fn active_pointer(&self) -> Result<Option<String>, StoreError> {
        self.request(|reply| StoreCommand::GetActive { reply }).await
    }

    async fn set_active_pointer(&self, tab_id: Option<&str>) -> Result<(), StoreError> {
        let tab_id = tab_id.map(str::to_string);
        self.request(|reply| StoreCommand::SetActive { tab_id, reply }).await
    }
}

/// Owns the connection on the store thread.
struct StoreWorker {
    location: Location,
    db: Option<Database>,
}

impl StoreWorker {
    fn run(mut self, mut rx: mpsc::UnboundedReceiver<StoreCommand>) {
        while let Some(cmd) = rx.blocking_recv() {
            // A dropped reply receiver just means the caller stopped waiting.
            match cmd {
                StoreCommand::Initialize { reply } => {
                    let _ = reply.send(self.initialize());
                }
                StoreCommand::Load { reply } => {
                    let _ = reply.send(self.with_db(load_records));
                }
                StoreCommand::Upsert { record, reply } => {
                    let _ = reply.send(self.with_db(|db| upsert_record(db, &record)));
                }
                StoreCommand::Remove { tab_id, reply } => {
                    let _ = reply.send(self.with_db(|db| remove_record(db, &tab_id)));
                }
                StoreCommand::GetActive { reply } => {
                    let _ = reply.send(self.with_db(read_active));
                }
                StoreCommand::SetActive { tab_id, reply } => {
                    let _ = reply.send(self.with_db(|db| write_active(db, tab_id.as_deref())));
                }
            }
        }
        log::debug!("store worker stopped");
    }

    fn initialize(&mut self) -> Result<(), StoreError> {
        if self.db.is_some() {
            return Ok(());
        }
        let db = match &self.location {
            Location::File(path) => Database::open(path)?,
            Location::Memory => Database::open_in_memory()?,
        };
        self.db = Some(db);
        Ok(())
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T, StoreError>) -> Result<T, StoreError> {
        match &self.db {
            Some(db) => f(db),
            None => Err(StoreError::NotInitialized),
        }
    }
}

fn load_records(db: &Database) -> Result<Vec<TabRecord>, StoreError> {
    let mut stmt = db.connection().prepare(
        "SELECT id, url, title, created_at, last_accessed FROM tabs
         ORDER BY last_accessed DESC, created_at DESC, id ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(TabRecord {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            created_at: row.get(3)?,
            last_accessed: row.get(4)?,
        })
    })?;
    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

fn upsert_record(db: &Database, record: &TabRecord) -> Result<(), StoreError> {
    db.connection().execute(
        "INSERT INTO tabs (id, url, title, created_at, last_accessed) VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
             url = excluded.url,
             title = excluded.title,
             created_at = excluded.created_at,
             last_accessed = excluded.last_accessed",
        params![record.id, record.url, record.title, record.created_at, record.last_accessed],
    )?;
    Ok(())
}

fn remove_record(db: &Database, tab_id: &str) -> Result<(), StoreError> {
    db.connection()
        .execute("DELETE FROM tabs WHERE id = ?1", params![tab_id])?;
    Ok(())
}

fn read_active(db: &Database) -> Result<Option<String>, StoreError> {
    let pointer: Option<Option<String>> = db
        .connection()
        .query_row("SELECT tab_id FROM active_tab WHERE singleton = 1", [], |row| row.get(0))
        .optional()?;
    Ok(pointer.flatten())
}

fn write_active(db: &Database, tab_id: Option<&str>) -> Result<(), StoreError> {
    db.connection().execute(
        "INSERT INTO active_tab (singleton, tab_id) VALUES (1, ?1)
         ON CONFLICT(singleton) DO UPDATE SET tab_id = excluded.tab_id",
        params![tab_id],
    )?;
    Ok(())
}
