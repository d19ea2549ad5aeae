//! sidetabs tab database.
//!
//! The connection is owned by the persistence store's worker thread; nothing
//! else touches it.
//!
//! ```no_run
//! use sidetabs::database::Database;
//!
//! let db = Database::open("/tmp/sidetabs.db").expect("failed to open database");
//! let tabs: i64 = db
//!     .connection()
//!     .query_row("SELECT COUNT(*) FROM tabs", [], |row| row.get(0))
//!     .expect("query failed");
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
