//! SQLite storage for example sentences and user accounts.
//!
//! One [`Database`] handle wraps a single connection behind a mutex. It is
//! cheap to clone; the web service hands a clone to each blocking task.
//!
//! ## Tables
//!
//! ```text
//! examples(id INTEGER PRIMARY KEY AUTOINCREMENT, expression, french, english)
//! users(id, username UNIQUE, email UNIQUE, password_hash, tier, created_at)
//! ```
//!
//! The store assumes a single writer process. Concurrent writers are not
//! coordinated beyond what SQLite itself guarantees.

mod examples;
mod schema;
mod users;

pub use examples::ExampleRecord;
pub use users::{NewUser, Tier, UserRecord};

use parking_lot::Mutex;
use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

pub const IN_MEMORY: &str = ":memory:";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("cannot create database directory {path}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0}")]
    Conflict(String),
}

#[derive(Clone)]
pub struct Database {
    location: String,
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("location", &self.location)
            .finish()
    }
}

impl Database {
    /// Open (or create) the database at `location`.
    ///
    /// `:memory:` opens a private in-memory database.
    pub fn open(location: &str) -> Result<Self, StoreError> {
        if location == IN_MEMORY {
            return Self::open_in_memory();
        }

        let path = Path::new(location);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        info!(path = location, "opening database");
        let conn = Connection::open(path)?;
        schema::initialize_schema(&conn)?;
        Ok(Self {
            location: location.to_string(),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        debug!("creating in-memory database");
        let conn = Connection::open_in_memory()?;
        schema::initialize_schema(&conn)?;
        Ok(Self {
            location: IN_MEMORY.to_string(),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Run `f` inside a transaction, committing only if it succeeds.
    pub fn transaction<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    /// The database server's notion of now, `YYYY-MM-DD HH:MM:SS` in UTC.
    pub fn now(&self) -> Result<String, StoreError> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT datetime('now')", [], |row| row.get(0))?)
        })
    }
}
