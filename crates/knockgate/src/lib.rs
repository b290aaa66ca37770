//! # Knockgate
//!
//! Chat-operated dynamic port knocking. A long-running process receives
//! text commands over a chat transport, authorizes each against the
//! role-based permission model, generates or rotates a secret knock
//! sequence, and reconfigures the external knock daemon to match.
//!
//! ## Overview
//!
//! - **Router**: static command registry; arity check, then a uniform
//!   permission guard, then the handler
//! - **Channels**: persisted broadcast roster with best-effort fan-out
//! - **Rotation**: one lazily started background task re-applying fresh
//!   sequences on an interval, cooperatively cancellable
//! - **Server**: the long-poll main loop with a monotonic update cursor
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use knockgate::{ChannelRegistry, CommandHandlers, Router, Server};
//! use knockgate::{RotationScheduler, TelegramTransport};
//! use knockgate_core::Config;
//! use knockgate_knockd::{KnockController, SystemctlRunner};
//! use knockgate_perms::PermissionEngine;
//! use knockgate_store::SqliteStore;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = Arc::new(Config::default());
//!     let store = Arc::new(SqliteStore::open(&config.database_path)?);
//!
//!     let engine = Arc::new(PermissionEngine::new(store.clone(), &config));
//!     engine.init().await?;
//!     engine.bootstrap_admins().await?;
//!
//!     let transport = Arc::new(TelegramTransport::new(&config.bot_token));
//!     let channels = Arc::new(ChannelRegistry::new(store, transport.clone()));
//!     channels.init().await?;
//!
//!     let controller = Arc::new(KnockController::new(SystemctlRunner, &config));
//!     let rotation = Arc::new(RotationScheduler::new(
//!         config.clone(),
//!         controller.clone(),
//!         transport.clone(),
//!     ));
//!
//!     let handlers = CommandHandlers::new(
//!         config.clone(),
//!         engine.clone(),
//!         channels.clone(),
//!         controller,
//!         rotation.clone(),
//!     );
//!     let router = Router::new(engine, handlers);
//!
//!     Server::new(transport, router, channels, rotation, config)
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod channels;
pub mod commands;
pub mod error;
pub mod rotation;
pub mod router;
pub mod server;
pub mod telegram;
pub mod transport;

pub use channels::{ChannelRegistry, CHANNELS_TABLE};
pub use commands::CommandHandlers;
pub use error::{BotError, Result, TransportError};
pub use rotation::RotationScheduler;
pub use router::{CommandContext, CommandOutcome, Router};
pub use server::Server;
pub use telegram::TelegramTransport;
pub use transport::{ChatMessage, ChatTransport, Update};
