// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authorization filtering and conversion of Telegram messages.
//!
//! Determines whether an incoming Telegram message should reach the daemon
//! and turns its text into a channel-agnostic [`InboundMessage`].

use asklink_core::types::{ConversationId, InboundMessage, MessageId};
use teloxide::prelude::*;

/// Checks whether the message sender is authorized.
///
/// Authorization passes if the sender's user ID (as string) or username
/// matches any entry in the `allowed_users` list. If `allowed_users` is
/// empty, all messages are rejected (secure default).
///
/// Messages without a sender (e.g., channel posts) always return `false`.
pub fn is_authorized(msg: &Message, allowed_users: &[String]) -> bool {
    if allowed_users.is_empty() {
        return false;
    }

    let user = match msg.from.as_ref() {
        Some(u) => u,
        None => return false,
    };

    let user_id_str = user.id.0.to_string();

    for allowed in allowed_users {
        // Match by user ID
        if *allowed == user_id_str {
            return true;
        }
        // Match by username (with or without @ prefix)
        if let Some(ref username) = user.username {
            let allowed_clean = allowed.strip_prefix('@').unwrap_or(allowed);
            if username.eq_ignore_ascii_case(allowed_clean) {
                return true;
            }
        }
    }

    false
}

/// Whether the message was posted in a group or supergroup.
pub fn is_group(msg: &Message) -> bool {
    msg.chat.is_group() || msg.chat.is_supergroup()
}

/// Converts a Telegram text message into an [`InboundMessage`].
///
/// Returns `None` for messages without text (stickers, photos, ...).
pub fn to_inbound_message(msg: &Message) -> Option<InboundMessage> {
    let text = msg.text()?;

    let sender_id = msg
        .from
        .as_ref()
        .map(|u| u.id.0.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    Some(InboundMessage {
        id: MessageId(msg.id.0.to_string()),
        conversation: ConversationId(msg.chat.id.0),
        sender_id,
        text: text.to_string(),
        reply_to: msg
            .reply_to_message()
            .map(|parent| MessageId(parent.id.0.to_string())),
        timestamp: chrono::DateTime::to_rfc3339(&msg.date),
    })
}
