//! SQLite implementation of the Store trait.
//!
//! One row per named container: the whole container is serialized with CBOR
//! and replaced on every mutation. The connection mutex is held across each
//! read-modify-write, which gives the per-table exclusion the
//! whole-container update pattern requires.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{Container, Store, TableKind, TableValue};

/// SQLite-based store implementation.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the parent directory and runs migrations as needed. Every
    /// commit is flushed to disk before a mutating call returns
    /// (`synchronous = FULL`).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database. Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run an operation while holding the connection lock.
    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&conn)
    }
}

fn load_container(conn: &Connection, table: &str) -> Result<Option<Container>> {
    let row: Option<(String, Vec<u8>)> = conn
        .query_row(
            "SELECT kind, data FROM containers WHERE name = ?1",
            params![table],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((kind_tag, blob)) = row else {
        return Ok(None);
    };

    let kind = TableKind::parse(&kind_tag)?;
    let container: Container = ciborium::from_reader(&blob[..])
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    if container.kind() != kind {
        return Err(StoreError::Serialization(format!(
            "table {} tagged {} but decodes as {}",
            table,
            kind,
            container.kind()
        )));
    }

    Ok(Some(container))
}

fn save_container(conn: &Connection, table: &str, container: &Container) -> Result<()> {
    let mut blob = Vec::new();
    ciborium::into_writer(container, &mut blob)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    conn.execute(
        "INSERT INTO containers (name, kind, data) VALUES (?1, ?2, ?3)
         ON CONFLICT(name) DO UPDATE SET kind = excluded.kind, data = excluded.data",
        params![table, container.kind().as_str(), blob],
    )?;

    Ok(())
}

fn require_container(conn: &Connection, table: &str) -> Result<Container> {
    load_container(conn, table)?.ok_or_else(|| StoreError::MissingTable(table.to_string()))
}

#[async_trait]
impl Store for SqliteStore {
    async fn open_table(&self, name: &str, kind: TableKind) -> Result<()> {
        self.with_conn(|conn| match load_container(conn, name)? {
            Some(existing) if existing.kind() == kind => Ok(()),
            Some(existing) => Err(StoreError::KindMismatch {
                table: name.to_string(),
                declared: kind,
                stored: existing.kind(),
            }),
            None => save_container(conn, name, &Container::empty(kind)),
        })
    }

    async fn table_exists(&self, name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM containers WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    async fn key_exists(&self, table: &str, key: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let container = require_container(conn, table)?;
            Ok(container.as_mapping(table)?.contains_key(key))
        })
    }

    async fn merge_entry(&self, table: &str, key: &str, value: TableValue) -> Result<()> {
        self.with_conn(|conn| {
            let mut container = require_container(conn, table)?;
            container
                .as_mapping_mut(table)?
                .insert(key.to_string(), value);
            save_container(conn, table, &container)
        })
    }

    async fn append(&self, table: &str, value: TableValue) -> Result<()> {
        self.with_conn(|conn| {
            let mut container = require_container(conn, table)?;
            container.as_sequence_mut(table)?.push(value);
            save_container(conn, table, &container)
        })
    }

    async fn replace_value(&self, table: &str, key: &str, value: TableValue) -> Result<()> {
        self.with_conn(|conn| {
            let mut container = require_container(conn, table)?;
            let mapping = container.as_mapping_mut(table)?;
            if !mapping.contains_key(key) {
                return Err(StoreError::MissingKey {
                    table: table.to_string(),
                    key: key.to_string(),
                });
            }
            mapping.insert(key.to_string(), value);
            save_container(conn, table, &container)
        })
    }

    async fn read_table(&self, table: &str) -> Result<Container> {
        self.with_conn(|conn| require_container(conn, table))
    }

    async fn read(&self, table: &str, key: &str) -> Result<Option<TableValue>> {
        self.with_conn(|conn| {
            let container = require_container(conn, table)?;
            Ok(container.as_mapping(table)?.get(key).cloned())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_table_is_idempotent() {
        let store = SqliteStore::open_memory().unwrap();
        store.open_table("channels", TableKind::Mapping).await.unwrap();
        store.open_table("channels", TableKind::Mapping).await.unwrap();
        assert!(store.table_exists("channels").await.unwrap());
    }

    #[tokio::test]
    async fn reopening_under_other_kind_fails() {
        let store = SqliteStore::open_memory().unwrap();
        store.open_table("log", TableKind::Sequence).await.unwrap();
        let err = store.open_table("log", TableKind::Mapping).await.unwrap_err();
        assert!(matches!(err, StoreError::KindMismatch { .. }));
    }

    #[tokio::test]
    async fn merge_then_read_round_trips() {
        let store = SqliteStore::open_memory().unwrap();
        store.open_table("channels", TableKind::Mapping).await.unwrap();

        store
            .merge_entry("channels", "42", TableValue::Bool(true))
            .await
            .unwrap();

        assert!(store.key_exists("channels", "42").await.unwrap());
        assert_eq!(
            store.read("channels", "42").await.unwrap(),
            Some(TableValue::Bool(true))
        );
        assert_eq!(store.read("channels", "7").await.unwrap(), None);
    }

    #[tokio::test]
    async fn replace_requires_existing_key() {
        let store = SqliteStore::open_memory().unwrap();
        store.open_table("channels", TableKind::Mapping).await.unwrap();

        let err = store
            .replace_value("channels", "42", TableValue::Bool(false))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingKey { .. }));

        store
            .merge_entry("channels", "42", TableValue::Bool(true))
            .await
            .unwrap();
        store
            .replace_value("channels", "42", TableValue::Bool(false))
            .await
            .unwrap();
        assert_eq!(
            store.read("channels", "42").await.unwrap(),
            Some(TableValue::Bool(false))
        );
    }

    #[tokio::test]
    async fn append_is_sequence_only() {
        let store = SqliteStore::open_memory().unwrap();
        store.open_table("events", TableKind::Sequence).await.unwrap();
        store.open_table("channels", TableKind::Mapping).await.unwrap();

        store
            .append("events", TableValue::Text("rotated".into()))
            .await
            .unwrap();

        let err = store
            .append("channels", TableValue::Text("nope".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::WrongContainer { .. }));

        match store.read_table("events").await.unwrap() {
            Container::Sequence(values) => assert_eq!(values.len(), 1),
            other => panic!("expected sequence, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn contents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .open_table("permissions", TableKind::Mapping)
                .await
                .unwrap();
            store
                .merge_entry(
                    "permissions",
                    "alice",
                    TableValue::TextList(vec!["admin".into(), "member".into()]),
                )
                .await
                .unwrap();
        }

        // Simulated restart: a fresh store over the same file.
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.read("permissions", "alice").await.unwrap(),
            Some(TableValue::TextList(vec!["admin".into(), "member".into()]))
        );
    }

    #[tokio::test]
    async fn unknown_persisted_kind_is_fatal() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO containers (name, kind, data) VALUES ('bad', 'graph', x'00')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        let err = store.open_table("bad", TableKind::Mapping).await.unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedKind(_)));
    }
}
