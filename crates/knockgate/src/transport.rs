//! Chat transport abstraction.
//!
//! The bot is transport-agnostic: anything that can long-poll for updates
//! and send messages implements [`ChatTransport`]. The production
//! implementation is Telegram ([`crate::telegram`]); tests use the
//! testkit's scripted fake.

use std::time::Duration;

use async_trait::async_trait;

use knockgate_core::{ChannelId, UserId};

use crate::error::TransportError;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// One element of a polled update batch.
///
/// Updates carry a monotonically increasing id; the main loop acknowledges
/// an update by polling with `offset = update_id + 1`.
#[derive(Debug, Clone)]
pub struct Update {
    pub update_id: i64,
    /// Absent when the update is not a well-formed user message (edits,
    /// joins, payloads missing expected fields). Such updates are skipped.
    pub message: Option<ChatMessage>,
}

/// A well-formed inbound message.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// The chat the message arrived in; also where replies go.
    pub channel: ChannelId,
    /// The author, as the permission engine knows them.
    pub sender: UserId,
    /// Transport message id, used to address replies.
    pub message_id: i64,
    /// Unix seconds the transport stamped the message with.
    pub timestamp: i64,
    /// Message text; absent for stickers, photos and the like.
    pub text: Option<String>,
}

/// Transport trait for polling updates and sending messages.
///
/// Implementations must be thread-safe (Send + Sync); the rotation task
/// shares the transport with the main loop.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Long-poll for the next batch of updates at or after `offset`.
    ///
    /// Blocks up to `timeout`; an empty batch on timeout is not an error.
    async fn poll_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>>;

    /// Send `text` to a channel, optionally as a reply to a message.
    async fn send_message(
        &self,
        channel: &ChannelId,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<()>;
}
