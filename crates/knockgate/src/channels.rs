//! Broadcast channel registry.
//!
//! Every chat the bot has heard from is persisted in the `channels` table
//! with an active flag. A channel is created active on its first message,
//! deactivated by `/forget`, and reactivated the moment it speaks again.

use std::sync::Arc;

use tracing::{info, warn};

use knockgate_core::ChannelId;
use knockgate_store::{Container, Store, TableKind, TableValue};

use crate::error::Result;
use crate::transport::ChatTransport;

/// Name of the persisted channel table (channel id → active flag).
pub const CHANNELS_TABLE: &str = "channels";

/// Tracks broadcast subscribers and fans messages out to the active ones.
pub struct ChannelRegistry<S: Store> {
    store: Arc<S>,
    transport: Arc<dyn ChatTransport>,
}

impl<S: Store> ChannelRegistry<S> {
    pub fn new(store: Arc<S>, transport: Arc<dyn ChatTransport>) -> Self {
        Self { store, transport }
    }

    /// Create the channel table if absent. Idempotent across restarts.
    pub async fn init(&self) -> Result<()> {
        self.store
            .open_table(CHANNELS_TABLE, TableKind::Mapping)
            .await?;
        Ok(())
    }

    /// Mark a channel active, creating it on first sight.
    pub async fn register(&self, channel: &ChannelId) -> Result<()> {
        self.store
            .merge_entry(CHANNELS_TABLE, channel.as_str(), TableValue::Bool(true))
            .await?;
        Ok(())
    }

    /// Mark a channel inactive. Unknown channels are left untouched — no
    /// error, and no entry is created.
    pub async fn deactivate(&self, channel: &ChannelId) -> Result<()> {
        if self.store.key_exists(CHANNELS_TABLE, channel.as_str()).await? {
            self.store
                .replace_value(CHANNELS_TABLE, channel.as_str(), TableValue::Bool(false))
                .await?;
            info!(%channel, "channel deactivated");
        }
        Ok(())
    }

    /// Channels currently marked active, in key order.
    pub async fn list_active(&self) -> Result<Vec<ChannelId>> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .filter_map(|(id, active)| active.then_some(id))
            .collect())
    }

    /// Every known channel, active or not, in key order.
    pub async fn list_all(&self) -> Result<Vec<ChannelId>> {
        Ok(self.entries().await?.into_iter().map(|(id, _)| id).collect())
    }

    /// Send `text` to every active channel. Best-effort: a failed send is
    /// logged and does not block the remaining channels.
    pub async fn broadcast(&self, text: &str) -> Result<()> {
        info!(message = text, "broadcasting");
        for channel in self.list_active().await? {
            if let Err(e) = self.transport.send_message(&channel, text, None).await {
                warn!(%channel, error = %e, "broadcast delivery failed");
            }
        }
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<(ChannelId, bool)>> {
        let container = self.store.read_table(CHANNELS_TABLE).await?;
        let Container::Mapping(entries) = container else {
            return Ok(Vec::new());
        };
        Ok(entries
            .into_iter()
            .map(|(id, value)| (ChannelId::new(id), value.as_bool().unwrap_or(false)))
            .collect())
    }
}
