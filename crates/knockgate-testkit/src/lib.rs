//! # Knockgate Testkit
//!
//! Testing utilities for knockgate.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **FakeTransport**: scripted update batches in, recorded sends out
//! - **FakeRunner**: a [`knockgate_knockd::ServiceRunner`] that records
//!   actions and can fail on demand
//! - **test_config**: a configuration pointing every path at a scratch
//!   directory, with the fixed open sequence enabled
//!
//! ## Usage
//!
//! ```rust
//! use knockgate_testkit::fixtures::{test_config, FakeRunner, FakeTransport};
//!
//! let dir = std::env::temp_dir();
//! let config = test_config(&dir);
//! let transport = FakeTransport::new();
//! let runner = FakeRunner::new();
//! ```

pub mod fixtures;

pub use fixtures::{command_update, test_config, FakeRunner, FakeTransport, SentMessage};
