//! Store trait: the abstract interface for table persistence.
//!
//! Implementations include SQLite (primary) and in-memory (for tests). Both
//! share the same whole-container read-modify-write semantics, expressed
//! once as operations on [`Container`].

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// The shape a table was declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// String key to value mapping.
    Mapping,
    /// Ordered list of values.
    Sequence,
}

impl TableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Mapping => "mapping",
            TableKind::Sequence => "sequence",
        }
    }

    /// Decode a persisted kind tag. Anything outside the known set is an
    /// unsupported kind and must fail initialization.
    pub fn parse(tag: &str) -> Result<TableKind> {
        match tag {
            "mapping" => Ok(TableKind::Mapping),
            "sequence" => Ok(TableKind::Sequence),
            other => Err(StoreError::UnsupportedKind(other.to_string())),
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableValue {
    Bool(bool),
    Text(String),
    TextList(Vec<String>),
}

impl TableValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TableValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TableValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_text_list(&self) -> Option<&[String]> {
        match self {
            TableValue::TextList(l) => Some(l),
            _ => None,
        }
    }
}

/// A whole stored container. This is the atomic unit of mutation: updates
/// replace the entire container, never a field in isolation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Container {
    Mapping(BTreeMap<String, TableValue>),
    Sequence(Vec<TableValue>),
}

impl Container {
    /// The empty container of a given kind, used at table creation.
    pub fn empty(kind: TableKind) -> Self {
        match kind {
            TableKind::Mapping => Container::Mapping(BTreeMap::new()),
            TableKind::Sequence => Container::Sequence(Vec::new()),
        }
    }

    pub fn kind(&self) -> TableKind {
        match self {
            Container::Mapping(_) => TableKind::Mapping,
            Container::Sequence(_) => TableKind::Sequence,
        }
    }

    pub(crate) fn as_mapping(&self, table: &str) -> Result<&BTreeMap<String, TableValue>> {
        match self {
            Container::Mapping(m) => Ok(m),
            Container::Sequence(_) => Err(StoreError::WrongContainer {
                table: table.to_string(),
                expected: TableKind::Mapping,
            }),
        }
    }

    pub(crate) fn as_mapping_mut(
        &mut self,
        table: &str,
    ) -> Result<&mut BTreeMap<String, TableValue>> {
        match self {
            Container::Mapping(m) => Ok(m),
            Container::Sequence(_) => Err(StoreError::WrongContainer {
                table: table.to_string(),
                expected: TableKind::Mapping,
            }),
        }
    }

    pub(crate) fn as_sequence_mut(&mut self, table: &str) -> Result<&mut Vec<TableValue>> {
        match self {
            Container::Sequence(v) => Ok(v),
            Container::Mapping(_) => Err(StoreError::WrongContainer {
                table: table.to_string(),
                expected: TableKind::Sequence,
            }),
        }
    }
}

/// The Store trait: async interface for table persistence.
///
/// Every mutating operation is synchronously durable before it returns:
/// read the whole container, alter the copy, write it back, flush. The
/// implementation must hold its lock across the whole read-modify-write so
/// concurrent writers cannot lose updates.
#[async_trait]
pub trait Store: Send + Sync {
    /// Create `name` with an empty container of `kind` if absent.
    ///
    /// Idempotent across restarts. Re-opening an existing table under a
    /// different kind is a [`StoreError::KindMismatch`].
    async fn open_table(&self, name: &str, kind: TableKind) -> Result<()>;

    /// Whether the named table has been created.
    async fn table_exists(&self, name: &str) -> Result<bool>;

    /// Whether `key` is present in a mapping table.
    async fn key_exists(&self, table: &str, key: &str) -> Result<bool>;

    /// Mapping tables: set `key` to `value`, creating or overwriting it.
    async fn merge_entry(&self, table: &str, key: &str, value: TableValue) -> Result<()>;

    /// Sequence tables: append `value`.
    async fn append(&self, table: &str, value: TableValue) -> Result<()>;

    /// Mapping tables: overwrite the value of an existing `key`.
    ///
    /// Fails with [`StoreError::MissingKey`] if the key is absent.
    async fn replace_value(&self, table: &str, key: &str, value: TableValue) -> Result<()>;

    /// Read the whole container.
    async fn read_table(&self, table: &str) -> Result<Container>;

    /// Read one value from a mapping table.
    async fn read(&self, table: &str, key: &str) -> Result<Option<TableValue>>;
}
