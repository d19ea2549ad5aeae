//! Versioned schema for the tab database.
//!
//! Applied versions are listed in `schema_version`; on open, every entry of
//! [`MIGRATIONS`] above the recorded version runs inside its own transaction
//! together with the row that records it.

use rusqlite::{params, Connection};

/// One schema step.
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All schema steps, oldest first.
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Tabs and active tab pointer",
    sql: "
        CREATE TABLE IF NOT EXISTS tabs (
            id            TEXT PRIMARY KEY,
            url           TEXT NOT NULL,
            title         TEXT NOT NULL,
            created_at    INTEGER NOT NULL,
            last_accessed INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tabs_last_accessed ON tabs(last_accessed);
        CREATE TABLE IF NOT EXISTS active_tab (
            singleton INTEGER PRIMARY KEY CHECK (singleton = 1),
            tab_id    TEXT
        );
    ",
}];

/// Latest version in [`MIGRATIONS`].
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Highest applied version, 0 for a database that has never been migrated.
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT IFNULL(MAX(version), 0) FROM schema_version", [], |row| {
        row.get(0)
    })
    .unwrap_or(0)
}

/// Brings the schema up to [`CURRENT_SCHEMA_VERSION`]. Safe to call on every open.
pub fn run_all(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
             version     INTEGER PRIMARY KEY,
             applied_at  INTEGER NOT NULL,
             description TEXT NOT NULL
         );",
    )?;

    let applied = get_schema_version(conn);
    for migration in MIGRATIONS.iter().filter(|m| m.version > applied) {
        apply(conn, migration)?;
        log::info!(
            "applied schema v{}: {}",
            migration.version,
            migration.description
        );
    }
    Ok(())
}

fn apply(conn: &Connection, migration: &Migration) -> Result<(), rusqlite::Error> {
    let applied_at = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    conn.execute_batch("BEGIN")?;
    let result = conn.execute_batch(migration.sql).and_then(|_| {
        conn.execute(
            "INSERT INTO schema_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
            params![migration.version, applied_at, migration.description],
        )
    });
    match result {
        Ok(_) => conn.execute_batch("COMMIT"),
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(e)
        }
    }
}
