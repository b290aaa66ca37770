//! Service control seam.
//!
//! The controller never shells out directly; it goes through
//! [`ServiceRunner`] so tests can record actions and inject failures.

use std::fmt;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info};

/// The two external service-control sub-steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Executes service-control actions against a named unit.
#[async_trait]
pub trait ServiceRunner: Send + Sync {
    /// Run `action` against `unit`, returning the external exit code.
    async fn run(&self, action: ServiceAction, unit: &str) -> std::io::Result<i32>;
}

/// Production runner: `systemctl <action> <unit>`.
pub struct SystemctlRunner;

#[async_trait]
impl ServiceRunner for SystemctlRunner {
    async fn run(&self, action: ServiceAction, unit: &str) -> std::io::Result<i32> {
        let status = Command::new("systemctl")
            .arg(action.as_str())
            .arg(unit)
            .status()
            .await?;

        // A signal-terminated systemctl has no exit code; report it as -1.
        let code = status.code().unwrap_or(-1);
        if code == 0 {
            info!(%action, unit, code, "service control succeeded");
        } else {
            error!(%action, unit, code, "service control failed");
        }
        Ok(code)
    }
}
