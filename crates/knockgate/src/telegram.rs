//! Telegram implementation of the chat transport.
//!
//! Thin wrapper over the Bot API: `getUpdates` long polling and
//! `sendMessage`. Updates that do not carry a user message map to
//! `message: None` and are skipped by the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use knockgate_core::ChannelId;

use crate::error::TransportError;
use crate::transport::{ChatMessage, ChatTransport, Result, Update};

/// Telegram Bot API transport.
pub struct TelegramTransport {
    client: Client,
    api_url: String,
}

impl TelegramTransport {
    pub fn new(token: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: format!("https://api.telegram.org/bot{token}/"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct WireUpdate {
    update_id: i64,
    message: Option<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    message_id: i64,
    date: i64,
    text: Option<String>,
    chat: WireChat,
    from: Option<WireUser>,
}

#[derive(Debug, Deserialize)]
struct WireChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: i64,
}

impl WireUpdate {
    fn into_update(self) -> Update {
        let message = self.message.and_then(|m| {
            // A message without an author cannot be authorized; drop it.
            let from = m.from?;
            Some(ChatMessage {
                channel: ChannelId::new(m.chat.id.to_string()),
                sender: knockgate_core::UserId::new(from.id.to_string()),
                message_id: m.message_id,
                timestamp: m.date,
                text: m.text,
            })
        });
        Update {
            update_id: self.update_id,
            message,
        }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn poll_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>> {
        let response: ApiResponse<Vec<WireUpdate>> = self
            .client
            .get(format!("{}getUpdates", self.api_url))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", timeout.as_secs().to_string()),
            ])
            // The request must outlive the server-side long poll.
            .timeout(timeout + Duration::from_secs(10))
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(TransportError::Api(
                response
                    .description
                    .unwrap_or_else(|| "getUpdates failed".to_string()),
            ));
        }

        Ok(response
            .result
            .unwrap_or_default()
            .into_iter()
            .map(WireUpdate::into_update)
            .collect())
    }

    async fn send_message(
        &self,
        channel: &ChannelId,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<()> {
        let mut params = vec![
            ("chat_id", channel.as_str().to_string()),
            ("text", text.to_string()),
            ("parse_mode", "HTML".to_string()),
        ];
        if let Some(message_id) = reply_to {
            params.push(("reply_to_message_id", message_id.to_string()));
        }

        let response: ApiResponse<serde_json::Value> = self
            .client
            .post(format!("{}sendMessage", self.api_url))
            .form(&params)
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(TransportError::Api(
                response
                    .description
                    .unwrap_or_else(|| "sendMessage failed".to_string()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_without_text_or_author_still_carry_their_id() {
        let raw = r#"{
            "update_id": 7,
            "message": {
                "message_id": 1,
                "date": 1700000000,
                "chat": {"id": 42}
            }
        }"#;
        let wire: WireUpdate = serde_json::from_str(raw).unwrap();
        let update = wire.into_update();
        assert_eq!(update.update_id, 7);
        // No author: unusable for authorization, mapped to no message.
        assert!(update.message.is_none());
    }

    #[test]
    fn full_message_maps_across() {
        let raw = r#"{
            "update_id": 8,
            "message": {
                "message_id": 5,
                "date": 1700000001,
                "text": "/status",
                "chat": {"id": -100},
                "from": {"id": 31337}
            }
        }"#;
        let update: WireUpdate = serde_json::from_str(raw).unwrap();
        let message = update.into_update().message.unwrap();
        assert_eq!(message.channel.as_str(), "-100");
        assert_eq!(message.sender.as_str(), "31337");
        assert_eq!(message.text.as_deref(), Some("/status"));
    }
}
