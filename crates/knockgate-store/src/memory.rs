//! In-memory implementation of the Store trait.
//!
//! Primarily for testing. Same semantics as SQLite, no persistence; all
//! data is lost when the store is dropped.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{Result, StoreError};
use crate::traits::{Container, Store, TableKind, TableValue};

/// In-memory store implementation. Thread-safe via RwLock.
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Container>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    fn with_read<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&HashMap<String, Container>) -> Result<T>,
    {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        f(&tables)
    }

    fn with_write<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut HashMap<String, Container>) -> Result<T>,
    {
        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        f(&mut tables)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn require<'a>(tables: &'a HashMap<String, Container>, table: &str) -> Result<&'a Container> {
    tables
        .get(table)
        .ok_or_else(|| StoreError::MissingTable(table.to_string()))
}

fn require_mut<'a>(
    tables: &'a mut HashMap<String, Container>,
    table: &str,
) -> Result<&'a mut Container> {
    tables
        .get_mut(table)
        .ok_or_else(|| StoreError::MissingTable(table.to_string()))
}

#[async_trait]
impl Store for MemoryStore {
    async fn open_table(&self, name: &str, kind: TableKind) -> Result<()> {
        self.with_write(|tables| match tables.get(name) {
            Some(existing) if existing.kind() == kind => Ok(()),
            Some(existing) => Err(StoreError::KindMismatch {
                table: name.to_string(),
                declared: kind,
                stored: existing.kind(),
            }),
            None => {
                tables.insert(name.to_string(), Container::empty(kind));
                Ok(())
            }
        })
    }

    async fn table_exists(&self, name: &str) -> Result<bool> {
        self.with_read(|tables| Ok(tables.contains_key(name)))
    }

    async fn key_exists(&self, table: &str, key: &str) -> Result<bool> {
        self.with_read(|tables| {
            let container = require(tables, table)?;
            Ok(container.as_mapping(table)?.contains_key(key))
        })
    }

    async fn merge_entry(&self, table: &str, key: &str, value: TableValue) -> Result<()> {
        self.with_write(|tables| {
            let container = require_mut(tables, table)?;
            container
                .as_mapping_mut(table)?
                .insert(key.to_string(), value);
            Ok(())
        })
    }

    async fn append(&self, table: &str, value: TableValue) -> Result<()> {
        self.with_write(|tables| {
            let container = require_mut(tables, table)?;
            container.as_sequence_mut(table)?.push(value);
            Ok(())
        })
    }

    async fn replace_value(&self, table: &str, key: &str, value: TableValue) -> Result<()> {
        self.with_write(|tables| {
            let container = require_mut(tables, table)?;
            let mapping = container.as_mapping_mut(table)?;
            if !mapping.contains_key(key) {
                return Err(StoreError::MissingKey {
                    table: table.to_string(),
                    key: key.to_string(),
                });
            }
            mapping.insert(key.to_string(), value);
            Ok(())
        })
    }

    async fn read_table(&self, table: &str) -> Result<Container> {
        self.with_read(|tables| Ok(require(tables, table)?.clone()))
    }

    async fn read(&self, table: &str, key: &str) -> Result<Option<TableValue>> {
        self.with_read(|tables| {
            let container = require(tables, table)?;
            Ok(container.as_mapping(table)?.get(key).cloned())
        })
    }
}
