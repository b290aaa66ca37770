//! # Knockgate Knockd
//!
//! Drives the external knock daemon: renders its configuration from a knock
//! sequence and starts/stops/restarts the service, tracking Running/Stopped
//! state.
//!
//! This crate does not match knocks itself — the daemon does. It only
//! produces the daemon's configuration and controls its lifecycle through
//! the [`ServiceRunner`] seam (systemctl in production, fakes in tests).

pub mod controller;
pub mod error;
pub mod render;
pub mod runner;

pub use controller::{KnockController, Transition};
pub use error::{KnockdError, Result};
pub use render::{render_config, CMD_TIMEOUT_SECS, SEQ_TIMEOUT_SECS};
pub use runner::{ServiceAction, ServiceRunner, SystemctlRunner};
