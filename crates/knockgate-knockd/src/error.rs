//! Error types for daemon control.

use thiserror::Error;

use crate::runner::ServiceAction;

/// Errors that can occur while configuring or driving the daemon.
#[derive(Debug, Error)]
pub enum KnockdError {
    /// The external service control call reported non-success.
    ///
    /// Never retried automatically; the combined restart is the only
    /// multi-step recovery anywhere in the system.
    #[error("could not {step} the service (exit code {code})")]
    ServiceControl { step: ServiceAction, code: i32 },

    /// Writing the configuration artifact or invoking the runner failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for daemon control operations.
pub type Result<T> = std::result::Result<T, KnockdError>;
