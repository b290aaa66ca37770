//! The daemon lifecycle controller.
//!
//! A two-state machine over the external service: `start` moves
//! Stopped→Running, `stop` moves Running→Stopped, and repeating either in
//! place is a successful no-op reported as [`Transition::AlreadyInState`].

use std::fs;
use std::path::PathBuf;

use tokio::sync::Mutex;
use tracing::info;

use knockgate_core::{Config, KnockSequence, ServiceState};

use crate::error::{KnockdError, Result};
use crate::render::render_config;
use crate::runner::{ServiceAction, ServiceRunner};

/// Outcome of a start/stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The state changed and the external call succeeded.
    Changed,
    /// The daemon was already in the requested state; nothing was invoked.
    AlreadyInState,
}

/// Renders configuration and drives the daemon through a [`ServiceRunner`].
pub struct KnockController<R: ServiceRunner> {
    runner: R,
    unit: String,
    config_path: PathBuf,
    render_config: Config,
    state: Mutex<ServiceState>,
}

impl<R: ServiceRunner> KnockController<R> {
    /// The controller starts out Stopped; `/start` is the explicit way up.
    pub fn new(runner: R, config: &Config) -> Self {
        Self {
            runner,
            unit: config.knockd_unit.clone(),
            config_path: config.knockd_config_path.clone(),
            render_config: config.clone(),
            state: Mutex::new(ServiceState::Stopped),
        }
    }

    pub async fn state(&self) -> ServiceState {
        *self.state.lock().await
    }

    /// Start the daemon. No-op if already Running.
    pub async fn start(&self) -> Result<Transition> {
        let mut state = self.state.lock().await;
        if *state == ServiceState::Running {
            return Ok(Transition::AlreadyInState);
        }
        self.invoke(ServiceAction::Start).await?;
        *state = ServiceState::Running;
        Ok(Transition::Changed)
    }

    /// Stop the daemon. No-op if already Stopped.
    pub async fn stop(&self) -> Result<Transition> {
        let mut state = self.state.lock().await;
        if *state == ServiceState::Stopped {
            return Ok(Transition::AlreadyInState);
        }
        self.invoke(ServiceAction::Stop).await?;
        *state = ServiceState::Stopped;
        Ok(Transition::Changed)
    }

    /// Render the configuration artifact for `sequence` and write it to the
    /// configured path, overwriting whatever was there.
    pub fn configure(&self, sequence: &KnockSequence) -> Result<()> {
        let rendered = render_config(sequence, &self.render_config);
        fs::write(&self.config_path, rendered)?;
        info!(path = %self.config_path.display(), %sequence, "daemon configuration written");
        Ok(())
    }

    /// Write the configuration for `sequence`, then restart the daemon so
    /// it takes effect.
    pub async fn apply_sequence(&self, sequence: &KnockSequence) -> Result<()> {
        self.configure(sequence)?;
        self.restart().await
    }

    /// Stop then start. Both external calls are issued unconditionally —
    /// the start is attempted even when the stop failed, favoring
    /// availability over strict sequencing — and the restart as a whole
    /// fails if either sub-step failed.
    pub async fn restart(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let stopped = self.invoke(ServiceAction::Stop).await;
        let started = self.invoke(ServiceAction::Start).await;
        *state = if started.is_ok() {
            ServiceState::Running
        } else {
            ServiceState::Stopped
        };
        stopped?;
        started?;
        Ok(())
    }

    async fn invoke(&self, action: ServiceAction) -> Result<()> {
        let code = self.runner.run(action, &self.unit).await?;
        if code != 0 {
            return Err(KnockdError::ServiceControl { step: action, code });
        }
        Ok(())
    }
}
