//! Error types for knockgate core.

use thiserror::Error;

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The file contents did not parse.
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
