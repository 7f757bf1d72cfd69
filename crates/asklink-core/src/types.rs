// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the asklink daemon.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a conversation in the external messaging system.
///
/// For Telegram this is the chat id: positive for private chats, negative
/// for groups and supergroups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ConversationId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Provider-assigned identifier of a single message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// An inbound message received from a channel adapter.
///
/// Only messages from authorized senders are ever constructed by adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Provider id of this message.
    pub id: MessageId,
    /// Conversation the message was posted in.
    pub conversation: ConversationId,
    /// Provider id of the sender.
    pub sender_id: String,
    /// Raw message text.
    pub text: String,
    /// The message this one replies to, when the provider supports threading.
    pub reply_to: Option<MessageId>,
    /// RFC 3339 timestamp.
    pub timestamp: String,
}

/// An outbound message to be sent via a channel adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub conversation: ConversationId,
    pub content: String,
}

impl OutboundMessage {
    pub fn new(conversation: ConversationId, content: impl Into<String>) -> Self {
        Self {
            conversation,
            content: content.into(),
        }
    }
}

/// Capabilities reported by a channel adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCapabilities {
    /// Whether inbound messages carry a reply-to reference.
    pub supports_reply_threading: bool,
    /// Maximum outbound message length in characters, if limited.
    pub max_message_length: Option<usize>,
}
