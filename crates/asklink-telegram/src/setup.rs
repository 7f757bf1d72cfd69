// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat discovery for first-time setup.
//!
//! Before the daemon runs, `asklink init` needs a user id and possibly a
//! group chat id. Both are recovered from the bot's pending updates, so the
//! user must have messaged the bot (or a group containing it) beforehand.

use asklink_core::AsklinkError;
use teloxide::prelude::*;
use teloxide::types::UpdateKind;
use tracing::debug;

/// Fetches the messages among the bot's pending updates.
pub async fn recent_messages(bot: &Bot) -> Result<Vec<Message>, AsklinkError> {
    let updates = bot
        .get_updates()
        .await
        .map_err(|e| AsklinkError::Channel {
            message: format!("calling Telegram API: {e}"),
            source: Some(Box::new(e)),
        })?;

    debug!(updates = updates.len(), "fetched pending updates");

    Ok(updates
        .into_iter()
        .filter_map(|update| match update.kind {
            UpdateKind::Message(msg) => Some(msg),
            _ => None,
        })
        .collect())
}

/// Finds the id of the user who sent one of `messages` as `@username`.
///
/// The leading `@` is optional and the comparison ignores case.
pub fn find_user_id(messages: &[Message], username: &str) -> Option<u64> {
    let wanted = username.strip_prefix('@').unwrap_or(username);
    messages
        .iter()
        .filter_map(|msg| msg.from.as_ref())
        .find(|user| {
            user.username
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(wanted))
        })
        .map(|user| user.id.0)
}

/// Returns the first group or supergroup chat among `messages`.
pub fn find_group_chat(messages: &[Message]) -> Option<i64> {
    messages
        .iter()
        .find(|msg| msg.chat.is_group() || msg.chat.is_supergroup())
        .map(|msg| msg.chat.id.0)
}

/// Resolves `@username` to a numeric user id from recent messages.
pub async fn resolve_username(bot: &Bot, username: &str) -> Result<u64, AsklinkError> {
    let messages = recent_messages(bot).await?;
    find_user_id(&messages, username).ok_or_else(|| {
        let clean = username.strip_prefix('@').unwrap_or(username);
        AsklinkError::channel(format!(
            "username @{clean} not found in recent messages, send /start to the bot first"
        ))
    })
}

/// Finds a group chat the bot was recently messaged in.
pub async fn detect_group_chat(bot: &Bot) -> Result<i64, AsklinkError> {
    let messages = recent_messages(bot).await?;
    find_group_chat(&messages).ok_or_else(|| {
        AsklinkError::channel(
            "no group chat found, add the bot to a group and send a message there first",
        )
    })
}
