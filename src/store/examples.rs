//! Example sentence rows.

use super::{Database, StoreError};
use rusqlite::{Row, params};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExampleRecord {
    pub id: i64,
    pub expression: String,
    pub french: String,
    pub english: String,
}

impl ExampleRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            expression: row.get(1)?,
            french: row.get(2)?,
            english: row.get(3)?,
        })
    }
}

impl Database {
    /// Stored examples for one expression, oldest first.
    pub fn examples_for(&self, expression: &str) -> Result<Vec<ExampleRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, expression, french, english FROM examples WHERE expression = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map([expression], ExampleRecord::from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Every stored example, grouped by expression and oldest first within each.
    pub fn all_examples(&self) -> Result<Vec<ExampleRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, expression, french, english FROM examples ORDER BY expression, id",
            )?;
            let rows = stmt.query_map([], ExampleRecord::from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Insert a sentence pair unless the expression already has that French
    /// sentence. Returns the new row id, or `None` for a duplicate.
    ///
    /// The existence check and the insert are one statement, so a sentence
    /// stored by another writer in the meantime is still caught.
    pub fn insert_example_if_new(
        &self,
        expression: &str,
        french: &str,
        english: &str,
    ) -> Result<Option<i64>, StoreError> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                r#"
                INSERT INTO examples (expression, french, english)
                SELECT ?1, ?2, ?3
                WHERE NOT EXISTS (
                    SELECT 1 FROM examples WHERE expression = ?1 AND french = ?2
                )
                "#,
                params![expression, french, english],
            )?;
            Ok((inserted == 1).then(|| conn.last_insert_rowid()))
        })
    }

    /// Delete rows by id in one transaction. Returns how many were removed.
    pub fn delete_examples(&self, ids: &[i64]) -> Result<usize, StoreError> {
        self.transaction(|tx| {
            let mut stmt = tx.prepare("DELETE FROM examples WHERE id = ?1")?;
            let mut deleted = 0;
            for id in ids {
                deleted += stmt.execute([id])?;
            }
            Ok(deleted)
        })
    }
}
