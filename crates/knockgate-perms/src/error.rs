//! Error types for the permission engine.

use thiserror::Error;

/// Errors that can occur during permission operations.
#[derive(Debug, Error)]
pub enum PermsError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] knockgate_store::StoreError),

    /// The permissions table held a value of an unexpected shape.
    #[error("invalid permission data: {0}")]
    InvalidData(String),
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
