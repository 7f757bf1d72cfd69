// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Racing a question's reply against its deadline.
//!
//! The race is settled against the store, not the timer: a reply that the
//! matcher delivered before `withdraw` ran always wins, even if the deadline
//! fired first on this side.

use std::time::Duration;

use asklink_core::{
    ChannelAdapter, ConversationId, NO_REPLY_SENTINEL, OutboundMessage, TIMEOUT_NOTICE,
};
use strum::Display;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::store::{CorrelationStore, QuestionId, QuestionTicket};

/// Lifecycle of one question/answer episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum EpisodeState {
    /// Racing the reply against the deadline.
    Waiting,
    /// A reply arrived.
    Resolved,
    /// The deadline passed with no reply.
    TimedOut,
}

/// Final result of an episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub state: EpisodeState,
    /// Text handed back to the caller. Never empty.
    pub reply: String,
}

/// Waits for `ticket` to resolve or for `timeout` to elapse.
///
/// `prior` holds replies that were buffered before the question was sent;
/// they are prepended to whatever the episode yields. On timeout the channel
/// gets a best-effort notice and the caller gets the sentinel unless some
/// reply was buffered.
pub async fn arbitrate(
    store: &CorrelationStore,
    channel: &dyn ChannelAdapter,
    ticket: QuestionTicket,
    prior: Vec<String>,
    timeout: Duration,
) -> Episode {
    let QuestionTicket {
        id,
        conversation,
        mut rx,
    } = ticket;
    let mut state = EpisodeState::Waiting;
    debug!(%conversation, question = %id, %state, timeout_secs = timeout.as_secs(), "awaiting reply");

    let received = tokio::select! {
        reply = &mut rx => reply.ok(),
        _ = tokio::time::sleep(timeout) => None,
    };

    let reply = match received {
        Some(reply) => Some(reply),
        None => settle_after_deadline(store, conversation, id, &mut rx),
    };

    if let Some(reply) = reply {
        state = EpisodeState::Resolved;
        info!(%conversation, question = %id, %state, prior = prior.len(), "episode finished");
        return Episode {
            state,
            reply: join_replies(prior, [reply]),
        };
    }

    state = EpisodeState::TimedOut;
    let interim = store.drain_buffered(conversation);
    info!(
        %conversation,
        question = %id,
        %state,
        prior = prior.len(),
        interim = interim.len(),
        "episode finished"
    );

    if let Err(e) = channel
        .send(OutboundMessage::new(conversation, TIMEOUT_NOTICE))
        .await
    {
        warn!(%conversation, error = %e, "failed to post timeout notice");
    }

    let combined = join_replies(prior, interim);
    Episode {
        state,
        reply: if combined.is_empty() {
            NO_REPLY_SENTINEL.to_string()
        } else {
            combined
        },
    }
}

/// Withdraws the question once its deadline passed, recovering a reply the
/// matcher delivered before the withdrawal.
fn settle_after_deadline(
    store: &CorrelationStore,
    conversation: ConversationId,
    id: QuestionId,
    rx: &mut oneshot::Receiver<String>,
) -> Option<String> {
    if store.withdraw(conversation, id) {
        return None;
    }
    // The matcher removed the question first, so its reply is in the channel.
    match rx.try_recv() {
        Ok(reply) => Some(reply),
        Err(TryRecvError::Empty | TryRecvError::Closed) => None,
    }
}

/// Newline-joins `prior` followed by `rest`, in order.
fn join_replies(prior: Vec<String>, rest: impl IntoIterator<Item = String>) -> String {
    prior.into_iter().chain(rest).collect::<Vec<_>>().join("\n")
}
