//! # Knockgate Store
//!
//! Durable table-oriented storage for knockgate. Provides a trait-based
//! interface over named containers with SQLite and in-memory
//! implementations.
//!
//! ## Overview
//!
//! A table is a named container — a mapping of string keys to values, or a
//! sequence of values. The atomic unit of mutation is the **whole
//! container**: every write reads the stored container, alters the copy, and
//! writes it back in one critical section. There is no per-field update.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-backed persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`Container`] / [`TableValue`] - The stored shapes
//!
//! ## Usage
//!
//! ```rust,no_run
//! use knockgate_store::{SqliteStore, Store, TableKind, TableValue};
//!
//! async fn example() {
//!     let store = SqliteStore::open("knockgate.db").unwrap();
//!     store.open_table("channels", TableKind::Mapping).await.unwrap();
//!     store
//!         .merge_entry("channels", "42", TableValue::Bool(true))
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Whole-container writes**: last-writer-wins at container granularity
//! - **Synchronous durability**: every mutation is flushed before returning
//! - **Per-table exclusion**: all operations run under the store's lock, so
//!   a read-modify-write cannot interleave with a concurrent writer

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{Container, Store, TableKind, TableValue};
