//! Error types for the store.

use thiserror::Error;

use crate::traits::TableKind;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Container serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A persisted kind tag decoded to neither `mapping` nor `sequence`.
    /// Fatal at initialization.
    #[error("unsupported table kind: {0}")]
    UnsupportedKind(String),

    /// A table was re-opened under a different kind than it was created with.
    #[error("table {table} is a {stored} table, opened as {declared}")]
    KindMismatch {
        table: String,
        declared: TableKind,
        stored: TableKind,
    },

    /// The named table has not been opened.
    #[error("no such table: {0}")]
    MissingTable(String),

    /// `replace_value` requires the key to already be present.
    #[error("no key {key} in table {table}")]
    MissingKey { table: String, key: String },

    /// The operation does not apply to the table's container kind.
    #[error("table {table} is not a {expected} table")]
    WrongContainer { table: String, expected: TableKind },

    /// The store's lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
