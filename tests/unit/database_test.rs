//! Unit tests for the sidetabs database layer (connection + migrations).

use sidetabs::database::migrations::{get_schema_version, run_all, CURRENT_SCHEMA_VERSION};
use sidetabs::database::Database;

fn table_exists(db: &Database, kind: &str, name: &str) -> bool {
    db.connection()
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type=?1 AND name=?2",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap_or(false)
}

#[test]
fn test_open_in_memory_succeeds() {
    let db = Database::open_in_memory();
    assert!(db.is_ok(), "open_in_memory should succeed");
}

#[test]
fn test_migrations_create_tables_and_index() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    assert!(table_exists(&db, "table", "tabs"));
    assert!(table_exists(&db, "table", "active_tab"));
    assert!(table_exists(&db, "table", "schema_version"));
    assert!(table_exists(&db, "index", "idx_tabs_last_accessed"));
}

#[test]
fn test_schema_version_recorded() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    assert_eq!(get_schema_version(db.connection()), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_migrations_are_idempotent() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    // Running migrations a second time should not fail
    assert!(run_all(db.connection()).is_ok());
    assert_eq!(get_schema_version(db.connection()), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_active_tab_is_a_singleton() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let conn = db.connection();
    conn.execute("INSERT INTO active_tab (singleton, tab_id) VALUES (1, 'a')", [])
        .unwrap();
    let second = conn.execute("INSERT INTO active_tab (singleton, tab_id) VALUES (2, 'b')", []);
    assert!(second.is_err(), "only singleton = 1 may exist");
}

#[test]
fn test_open_file_database_creates_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("sidetabs.db");

    {
        let db = Database::open(&db_path).expect("open file db failed");
        db.connection()
            .execute(
                "INSERT INTO tabs (id, url, title, created_at, last_accessed) VALUES ('t', 'https://a.com', 'A', 1, 2)",
                [],
            )
            .unwrap();
    }
    assert!(db_path.exists());

    let db = Database::open(&db_path).expect("reopen failed");
    let count: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM tabs", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}
