//! Error types for the facade crate.

use thiserror::Error;

/// Errors crossing the chat transport boundary.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP-level failure.
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote API answered but reported failure.
    #[error("transport API error: {0}")]
    Api(String),
}

/// Errors that can occur while running the bot.
#[derive(Debug, Error)]
pub enum BotError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] knockgate_core::ConfigError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] knockgate_store::StoreError),

    /// Permission error.
    #[error("permission error: {0}")]
    Perms(#[from] knockgate_perms::PermsError),

    /// Daemon control error.
    #[error("daemon control error: {0}")]
    Knockd(#[from] knockgate_knockd::KnockdError),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type for bot operations.
pub type Result<T> = std::result::Result<T, BotError>;
