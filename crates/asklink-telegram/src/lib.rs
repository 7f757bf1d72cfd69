// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for asklink.
//!
//! Implements [`ChannelAdapter`] for the Telegram Bot API via teloxide:
//! long polling for inbound replies, plain-text sends that report the
//! Telegram message id, and the chat discovery helpers used by `init`.

pub mod handler;
pub mod setup;

pub use teloxide::Bot;

use std::sync::Arc;

use async_trait::async_trait;
use asklink_config::TelegramConfig;
use asklink_core::AsklinkError;
use asklink_core::traits::{ChannelAdapter, PluginAdapter};
use asklink_core::types::{
    ChannelCapabilities, HealthStatus, InboundMessage, MessageId, OutboundMessage,
};
use teloxide::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Longest message Telegram accepts, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

/// Telegram channel adapter implementing [`ChannelAdapter`].
///
/// Connects to Telegram via long polling and forwards text messages from
/// authorized users, in private chats and groups alike.
pub struct TelegramChannel {
    bot: Bot,
    config: TelegramConfig,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramChannel {
    /// Creates a new Telegram channel adapter.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: TelegramConfig) -> Result<Self, AsklinkError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            AsklinkError::Config("telegram.bot_token is required to run the daemon".into())
        })?;

        if token.is_empty() {
            return Err(AsklinkError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            bot,
            config,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
        })
    }
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, AsklinkError> {
        // A valid token answers getMe.
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), AsklinkError> {
        debug!("Telegram channel shutting down");
        if let Some(handle) = &self.polling_handle {
            handle.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_reply_threading: true,
            max_message_length: Some(MAX_MESSAGE_LENGTH),
        }
    }

    async fn connect(&mut self) -> Result<(), AsklinkError> {
        if self.polling_handle.is_some() {
            return Ok(()); // Already connected
        }

        let bot = self.bot.clone();
        let tx = self.inbound_tx.clone();
        let allowed_users: Arc<Vec<String>> = Arc::new(self.config.allowed_users.clone());

        if allowed_users.is_empty() {
            warn!("telegram.allowed_users is empty, every inbound message will be ignored");
        }

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let handler = Update::filter_message().endpoint(move |msg: Message| {
                let tx = tx.clone();
                let allowed = allowed_users.clone();
                async move {
                    if !handler::is_authorized(&msg, &allowed) {
                        debug!(chat_id = msg.chat.id.0, "ignoring unauthorized user");
                        return respond(());
                    }

                    match handler::to_inbound_message(&msg) {
                        Some(inbound) => {
                            debug!(
                                chat_id = msg.chat.id.0,
                                group = handler::is_group(&msg),
                                "inbound message"
                            );
                            if tx.send(inbound).await.is_err() {
                                warn!("inbound channel closed, dropping message");
                            }
                        }
                        None => {
                            debug!(msg_id = msg.id.0, "ignoring non-text message");
                        }
                    }

                    respond(())
                }
            });

            Dispatcher::builder(bot, handler)
                .default_handler(|_| async {}) // Silently ignore non-message updates
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, AsklinkError> {
        check_length(&msg.content)?;

        let sent = self
            .bot
            .send_message(ChatId(msg.conversation.0), &msg.content)
            .await
            .map_err(|e| AsklinkError::Channel {
                message: format!("failed to send message: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(MessageId(sent.id.0.to_string()))
    }

    async fn receive(&self) -> Result<InboundMessage, AsklinkError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| AsklinkError::channel("Telegram inbound channel closed"))
    }
}

/// Rejects text Telegram would refuse, before any network call.
fn check_length(content: &str) -> Result<(), AsklinkError> {
    let len = content.chars().count();
    if len > MAX_MESSAGE_LENGTH {
        return Err(AsklinkError::channel(format!(
            "message exceeds {MAX_MESSAGE_LENGTH} character limit ({len} characters)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use asklink_core::ConversationId;

    fn config(token: Option<&str>) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.map(str::to_string),
            allowed_users: vec![],
        }
    }

    #[test]
    fn new_requires_bot_token() {
        assert!(TelegramChannel::new(config(None)).is_err());
    }

    #[test]
    fn new_rejects_empty_token() {
        assert!(TelegramChannel::new(config(Some(""))).is_err());
    }

    #[test]
    fn new_accepts_valid_token() {
        let config = TelegramConfig {
            bot_token: Some("123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11".into()),
            allowed_users: vec!["user1".into()],
        };
        assert!(TelegramChannel::new(config).is_ok());
    }

    #[test]
    fn capabilities_are_correct() {
        let channel = TelegramChannel::new(config(Some("test:token"))).unwrap();
        let caps = channel.capabilities();
        assert!(caps.supports_reply_threading);
        assert_eq!(caps.max_message_length, Some(4096));
    }

    #[test]
    fn length_limit_counts_characters() {
        assert!(check_length(&"a".repeat(4096)).is_ok());
        assert!(check_length(&"é".repeat(4096)).is_ok());
        assert!(check_length(&"a".repeat(4097)).is_err());
    }

    #[tokio::test]
    async fn oversized_message_fails_without_network() {
        let channel = TelegramChannel::new(config(Some("test:token"))).unwrap();
        let err = channel
            .send(OutboundMessage::new(ConversationId(42), "x".repeat(5000)))
            .await
            .unwrap_err();
        assert!(matches!(err, AsklinkError::Channel { .. }));
        assert!(err.to_string().contains("4096"));
    }

    #[test]
    fn plugin_adapter_metadata() {
        let channel = TelegramChannel::new(config(Some("test:token"))).unwrap();
        assert_eq!(channel.name(), "telegram");
        assert_eq!(channel.version(), semver::Version::new(0, 1, 0));
    }
}
