//! The main processing loop.
//!
//! One task long-polls the transport, processes each update strictly in
//! arrival order, and advances the monotonic offset after every processed
//! update so nothing is reprocessed on the next poll. A handler returning
//! [`CommandOutcome::Shutdown`] ends the loop cleanly.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info};

use knockgate_core::Config;
use knockgate_knockd::ServiceRunner;
use knockgate_store::Store;

use crate::channels::ChannelRegistry;
use crate::error::Result;
use crate::rotation::RotationScheduler;
use crate::router::{CommandContext, CommandOutcome, Router};
use crate::transport::{ChatTransport, Update};

/// Wait before re-polling after a transport error, so a dead network does
/// not spin the loop.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

/// The long-running bot process.
pub struct Server<S: Store, R: ServiceRunner + 'static> {
    transport: Arc<dyn ChatTransport>,
    router: Router<S, R>,
    channels: Arc<ChannelRegistry<S>>,
    rotation: Arc<RotationScheduler<R>>,
    config: Arc<Config>,
}

impl<S: Store, R: ServiceRunner + 'static> Server<S, R> {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        router: Router<S, R>,
        channels: Arc<ChannelRegistry<S>>,
        rotation: Arc<RotationScheduler<R>>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            transport,
            router,
            channels,
            rotation,
            config,
        }
    }

    /// Poll and process until a handler requests shutdown.
    pub async fn run(&self) -> Result<()> {
        let poll_timeout = Duration::from_secs(self.config.poll_timeout_secs);
        let mut offset = 0i64;

        info!("processing loop started");
        'poll: loop {
            let updates = match self.transport.poll_updates(offset, poll_timeout).await {
                Ok(updates) => updates,
                Err(e) => {
                    error!(error = %e, "update poll failed; retrying");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                let outcome = self.process(&update).await;
                offset = update.update_id + 1;
                if matches!(outcome, CommandOutcome::Shutdown) {
                    break 'poll;
                }
            }
        }

        self.rotation.cancel().await;
        info!("processing loop ended");
        Ok(())
    }

    /// Handle one update end to end: filter, register the channel,
    /// dispatch, deliver the reply.
    async fn process(&self, update: &Update) -> CommandOutcome {
        // Malformed or non-message updates carry no command text; skip.
        let Some(message) = &update.message else {
            return CommandOutcome::Silent;
        };
        let Some(text) = &message.text else {
            return CommandOutcome::Silent;
        };
        if !text.starts_with('/') {
            return CommandOutcome::Silent;
        }
        if unix_now() - message.timestamp >= self.config.max_message_age_secs {
            debug!(update_id = update.update_id, "skipping stale command");
            return CommandOutcome::Silent;
        }

        // Any channel that speaks joins (or rejoins) the broadcast list.
        if let Err(e) = self.channels.register(&message.channel).await {
            error!(channel = %message.channel, error = %e, "channel registration failed");
        }

        let ctx = CommandContext {
            user: message.sender.clone(),
            channel: message.channel.clone(),
        };
        match self.router.dispatch(&ctx, text).await {
            Ok(CommandOutcome::Reply(reply)) => {
                if let Err(e) = self
                    .transport
                    .send_message(&message.channel, &reply, Some(message.message_id))
                    .await
                {
                    error!(channel = %message.channel, error = %e, "reply delivery failed");
                }
                CommandOutcome::Silent
            }
            Ok(CommandOutcome::Silent) => CommandOutcome::Silent,
            Ok(CommandOutcome::Shutdown) => {
                info!(user = %ctx.user, "shutdown requested");
                CommandOutcome::Shutdown
            }
            Err(e) => {
                error!(user = %ctx.user, error = %e, "command processing failed");
                CommandOutcome::Silent
            }
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
