//! Table definitions and schema versioning.
//!
//! Tables are created with `IF NOT EXISTS` so a database populated by earlier
//! tooling is adopted as-is and only gains the version table and indexes.

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

pub const SCHEMA_VERSION: i32 = 1;

pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    let current = schema_version(conn)?;
    if current >= SCHEMA_VERSION {
        debug!(version = current, "database schema is up to date");
        return Ok(());
    }

    info!(from = current, to = SCHEMA_VERSION, "initializing database schema");
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS examples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            expression TEXT NOT NULL,
            french TEXT NOT NULL,
            english TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_examples_expression ON examples(expression);

        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            tier INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [SCHEMA_VERSION],
    )?;
    Ok(())
}

fn schema_version(conn: &Connection) -> rusqlite::Result<i32> {
    let table_exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
        [],
        |row| row.get(0),
    )?;
    if !table_exists {
        return Ok(0);
    }
    Ok(conn
        .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()?
        .unwrap_or(0))
}
