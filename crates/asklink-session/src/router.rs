// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daemon entry points for local requests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use asklink_config::{AsklinkConfig, SessionConfig};
use asklink_core::{AsklinkError, ChannelAdapter, ConversationId, OutboundMessage};
use asklink_ipc::{Request, RequestHandler, RequestKind, Response, UNKNOWN_REQUEST_TYPE};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::arbiter::{self, Episode};
use crate::store::{CaptureId, CaptureTicket, CorrelationStore};

/// Chooses the configured session a question is for.
///
/// An explicit name wins; otherwise the caller's working directory must
/// equal a session's `working_dir`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSelector {
    pub name: Option<String>,
    pub work_dir: Option<PathBuf>,
}

impl SessionSelector {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            work_dir: None,
        }
    }

    pub fn by_work_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            name: None,
            work_dir: Some(dir.into()),
        }
    }

    fn resolve<'a>(&self, config: &'a AsklinkConfig) -> Result<&'a SessionConfig, AsklinkError> {
        let found = match (&self.name, &self.work_dir) {
            (Some(name), _) => config.find_session_by_name(name),
            (None, Some(dir)) => config.find_session_by_work_dir(dir),
            (None, None) => None,
        };
        found.ok_or_else(|| AsklinkError::SessionNotFound {
            selector: self.to_string(),
        })
    }
}

impl std::fmt::Display for SessionSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.name, &self.work_dir) {
            (Some(name), _) => write!(f, "name `{name}`"),
            (None, Some(dir)) => write!(f, "working directory {}", dir.display()),
            (None, None) => f.write_str("no session name or working directory"),
        }
    }
}

/// Process-wide coordinator between local callers, the store and the channel.
pub struct DaemonRouter {
    store: Arc<CorrelationStore>,
    channel: Arc<dyn ChannelAdapter>,
    config: AsklinkConfig,
}

impl DaemonRouter {
    pub fn new(
        store: Arc<CorrelationStore>,
        channel: Arc<dyn ChannelAdapter>,
        config: AsklinkConfig,
    ) -> Self {
        Self {
            store,
            channel,
            config,
        }
    }

    pub fn store(&self) -> &Arc<CorrelationStore> {
        &self.store
    }

    /// Posts `text` to the selected session's chat and waits for the reply.
    ///
    /// A missing reply is not an error: after `timeout` (or the configured
    /// default when `None` or zero) the caller gets whatever was buffered, or
    /// the sentinel.
    pub async fn send_and_wait(
        &self,
        selector: &SessionSelector,
        text: &str,
        timeout: Option<Duration>,
    ) -> Result<String, AsklinkError> {
        Ok(self.run_episode(selector, text, timeout).await?.reply)
    }

    /// Like [`send_and_wait`](Self::send_and_wait) but reports how the episode ended.
    pub async fn run_episode(
        &self,
        selector: &SessionSelector,
        text: &str,
        timeout: Option<Duration>,
    ) -> Result<Episode, AsklinkError> {
        let session = selector.resolve(&self.config)?;
        self.check_length(text)?;
        let conversation = session.conversation();
        let timeout = effective(timeout, self.config.daemon.default_timeout());

        let prior = self.store.drain_buffered(conversation);
        let sent = match self
            .channel
            .send(OutboundMessage::new(conversation, text))
            .await
        {
            Ok(id) => id,
            Err(e) => {
                // Replies drained above belong to the next question.
                self.restore_buffered(conversation, prior);
                return Err(e);
            }
        };

        let ticket = self.store.register(conversation, Some(sent.clone()), text);
        info!(
            session = %session.name,
            %conversation,
            question = %ticket.id,
            message_id = %sent,
            "question sent"
        );

        Ok(arbiter::arbitrate(&self.store, &*self.channel, ticket, prior, timeout).await)
    }

    /// Reports the conversation of the next inbound message.
    ///
    /// Replaces any capture already pending. A replaced waiter keeps waiting
    /// and fails with [`AsklinkError::CaptureTimeout`] at its own deadline.
    pub async fn capture_next_conversation(
        &self,
        timeout: Option<Duration>,
    ) -> Result<ConversationId, AsklinkError> {
        let timeout = effective(timeout, self.config.daemon.capture_timeout());
        let CaptureTicket { id, mut rx } = self.store.start_capture();
        debug!(capture = %id, timeout_secs = timeout.as_secs(), "capture started");

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let raced = tokio::select! {
            captured = &mut rx => Some(captured),
            _ = &mut deadline => None,
        };

        let captured = match raced {
            Some(Ok(conversation)) => Some(conversation),
            Some(Err(_)) => {
                debug!(capture = %id, "capture replaced, waiting out deadline");
                deadline.await;
                None
            }
            None => settle_capture(&self.store, id, &mut rx),
        };

        match captured {
            Some(conversation) => {
                info!(%conversation, "conversation captured");
                Ok(conversation)
            }
            None => Err(AsklinkError::CaptureTimeout { duration: timeout }),
        }
    }

    /// Posts `text` to every configured session chat, logging failures.
    pub async fn broadcast(&self, text: &str) {
        for session in &self.config.sessions {
            let msg = OutboundMessage::new(session.conversation(), text);
            if let Err(e) = self.channel.send(msg).await {
                warn!(session = %session.name, error = %e, "failed to post notice");
            }
        }
    }

    /// Rejects text longer than the channel accepts, before the buffer is
    /// touched.
    fn check_length(&self, text: &str) -> Result<(), AsklinkError> {
        let Some(max) = self.channel.capabilities().max_message_length else {
            return Ok(());
        };
        let len = text.chars().count();
        if len > max {
            return Err(AsklinkError::channel(format!(
                "message exceeds {max} character limit ({len} characters)"
            )));
        }
        Ok(())
    }

    fn restore_buffered(&self, conversation: ConversationId, prior: Vec<String>) {
        if prior.is_empty() {
            return;
        }
        let mut inner = self.store.lock();
        let queue = inner.buffered.entry(conversation).or_default();
        // Anything buffered meanwhile arrived later, so it goes after.
        let later = std::mem::replace(queue, prior);
        queue.extend(later);
    }
}

/// Cancels capture `id` once its deadline passed, recovering a conversation
/// the matcher delivered before the cancel. A replaced capture yields nothing.
fn settle_capture(
    store: &CorrelationStore,
    id: CaptureId,
    rx: &mut oneshot::Receiver<ConversationId>,
) -> Option<ConversationId> {
    if store.cancel_capture(id) {
        return None;
    }
    rx.try_recv().ok()
}

fn effective(requested: Option<Duration>, default: Duration) -> Duration {
    match requested {
        Some(d) if !d.is_zero() => d,
        _ => default,
    }
}

#[async_trait]
impl RequestHandler for DaemonRouter {
    async fn handle(&self, request: Request) -> Response {
        let timeout = Some(Duration::from_secs(request.timeout));

        match request.kind {
            RequestKind::Send => {
                let selector = SessionSelector {
                    name: non_empty(request.session),
                    work_dir: non_empty(request.workdir).map(PathBuf::from),
                };
                match self.send_and_wait(&selector, &request.message, timeout).await {
                    Ok(reply) => Response::reply(reply),
                    Err(e) => {
                        warn!(error = %e, "send request failed");
                        Response::error(request_error(&e))
                    }
                }
            }
            RequestKind::GetChatId => match self.capture_next_conversation(timeout).await {
                Ok(conversation) => Response::chat_id(conversation.0),
                Err(e) => Response::error(request_error(&e)),
            },
            RequestKind::Unknown => Response::error(UNKNOWN_REQUEST_TYPE),
        }
    }
}

/// Error text for the CLI. Session lookups keep the short wording the CLI
/// matches on.
fn request_error(e: &AsklinkError) -> String {
    match e {
        AsklinkError::SessionNotFound { .. } => "session not found".to_string(),
        AsklinkError::CaptureTimeout { .. } => "timeout waiting for message".to_string(),
        other => other.to_string(),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AsklinkConfig {
        AsklinkConfig {
            sessions: vec![SessionConfig {
                name: "api".into(),
                chat_id: 42,
                working_dir: "/work/api".into(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn selector_prefers_name() {
        let config = config();
        let selector = SessionSelector {
            name: Some("api".into()),
            work_dir: Some("/elsewhere".into()),
        };
        assert_eq!(selector.resolve(&config).unwrap().chat_id, 42);
    }

    #[test]
    fn selector_falls_back_to_work_dir() {
        let config = config();
        let selector = SessionSelector::by_work_dir("/work/api");
        assert_eq!(selector.resolve(&config).unwrap().name, "api");
    }

    #[test]
    fn unknown_selector_is_session_not_found() {
        let config = config();
        let err = SessionSelector::by_name("web").resolve(&config).unwrap_err();
        assert!(matches!(err, AsklinkError::SessionNotFound { .. }));
        assert_eq!(request_error(&err), "session not found");

        let err = SessionSelector::default().resolve(&config).unwrap_err();
        assert!(err.to_string().contains("no session name"));
    }

    #[test]
    fn zero_timeout_uses_default() {
        let default = Duration::from_secs(300);
        assert_eq!(effective(None, default), default);
        assert_eq!(effective(Some(Duration::ZERO), default), default);
        assert_eq!(
            effective(Some(Duration::from_secs(5)), default),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn capture_resolved_before_cancel_is_recovered() {
        let store = CorrelationStore::new();
        let mut ticket = store.start_capture();

        // The matcher resolves the capture just as the deadline fires.
        store.deliver_reply(ConversationId(-100777), None, "hello");
        assert!(!store.has_capture());

        let captured = settle_capture(&store, ticket.id, &mut ticket.rx);
        assert_eq!(captured, Some(ConversationId(-100777)));
    }

    #[test]
    fn unresolved_capture_is_cancelled_at_deadline() {
        let store = CorrelationStore::new();
        let mut ticket = store.start_capture();

        assert_eq!(settle_capture(&store, ticket.id, &mut ticket.rx), None);
        assert!(!store.has_capture());
    }

    #[test]
    fn replaced_capture_settles_empty_and_keeps_the_newer_one() {
        let store = CorrelationStore::new();
        let mut first = store.start_capture();
        let _second = store.start_capture();

        assert_eq!(settle_capture(&store, first.id, &mut first.rx), None);
        assert!(store.has_capture());
    }
}
