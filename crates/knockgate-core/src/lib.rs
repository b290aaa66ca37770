//! # Knockgate Core
//!
//! Pure primitives for knockgate: identities, permission groups, knock
//! sequences, and the immutable runtime configuration.
//!
//! This crate contains no storage and no networking. The only I/O is the
//! one-shot configuration file load.
//!
//! ## Key Types
//!
//! - [`UserId`] / [`ChannelId`] - Opaque chat identities
//! - [`Group`] / [`Permission`] - The static role model
//! - [`KnockSequence`] - An ordered list of knock ports
//! - [`SequenceSpec`] - Generation constraints (length, range, blacklist)
//! - [`Config`] - The immutable configuration value, constructed once

pub mod config;
pub mod error;
pub mod sequence;
pub mod types;

pub use config::Config;
pub use error::ConfigError;
pub use sequence::{filter_port, generate_sequence, next_sequence, SequenceSpec};
pub use types::{ChannelId, Group, KnockSequence, Permission, ServiceState, UserId};
