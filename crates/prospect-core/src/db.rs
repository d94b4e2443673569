// SQLite persistence for scout annotations.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::annotations::{Annotation, AnnotationSnapshot, AnnotationStore};

/// SQLite-backed annotation store. Each player's annotation is one JSON
/// document keyed by player name.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS annotations (
                name       TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Panics if the mutex is poisoned.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }
}

impl AnnotationStore for Database {
    fn snapshot(&self) -> Result<AnnotationSnapshot> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT name, value FROM annotations")
            .context("failed to prepare snapshot query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .context("failed to query annotations")?;

        let mut snapshot = AnnotationSnapshot::new();
        for row in rows {
            let (name, json_str) = row.context("failed to read annotation row")?;
            let annotation: Annotation = serde_json::from_str(&json_str)
                .with_context(|| format!("failed to deserialize annotation for '{name}'"))?;
            snapshot.insert(name, annotation);
        }
        debug!("loaded {} annotations", snapshot.len());
        Ok(snapshot)
    }

    fn load(&self, name: &str) -> Result<Option<Annotation>> {
        let json_str: Option<String> = self
            .conn()
            .query_row(
                "SELECT value FROM annotations WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query annotation")?;

        json_str
            .map(|s| {
                serde_json::from_str(&s)
                    .with_context(|| format!("failed to deserialize annotation for '{name}'"))
            })
            .transpose()
    }

    fn store(&self, name: &str, annotation: &Annotation) -> Result<()> {
        let json_str =
            serde_json::to_string(annotation).context("failed to serialize annotation")?;
        self.conn()
            .execute(
                "INSERT INTO annotations (name, value) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET
                    value = excluded.value,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![name, json_str],
            )
            .context("failed to store annotation")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
