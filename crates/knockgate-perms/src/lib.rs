//! # Knockgate Perms
//!
//! Role-based permission resolution and group membership management.
//!
//! ## Overview
//!
//! Users are opaque ids; all authority comes from group membership persisted
//! in the `permissions` table (user id → list of group names). Groups and
//! their permission sets are static configuration in `knockgate-core`.
//!
//! An allow-list, if configured, gates every check; a deny-list overrides
//! everything. Past those, a check passes when the required permission set
//! is a subset of the union of the caller's group permissions — so the empty
//! requirement passes for everyone, known or not.

pub mod engine;
pub mod error;

pub use engine::{PermissionEngine, PERMISSIONS_TABLE};
pub use error::{PermsError, Result};
