// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory correlation state shared by the router and the inbound listener.
//!
//! Everything lives behind a single [`std::sync::Mutex`]. The lock is never
//! held across an `.await`, so a blocking mutex is sufficient and keeps every
//! check-then-act sequence atomic.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use asklink_core::{ConversationId, MessageId};
use tokio::sync::oneshot;
use tracing::debug;

/// Daemon-local identifier of an outstanding question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuestionId(u64);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// Identifier of a capture request, used to cancel only one's own capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureId(u64);

impl fmt::Display for CaptureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// A question posted to a conversation that has not been answered yet.
#[derive(Debug)]
pub(crate) struct OutstandingQuestion {
    pub(crate) id: QuestionId,
    pub(crate) external_ref: Option<MessageId>,
    pub(crate) content: String,
    pub(crate) resolver: oneshot::Sender<String>,
    pub(crate) created_at: Instant,
}

#[derive(Debug)]
pub(crate) struct PendingCapture {
    pub(crate) id: CaptureId,
    pub(crate) resolver: oneshot::Sender<ConversationId>,
}

#[derive(Debug, Default)]
pub(crate) struct StoreInner {
    pub(crate) outstanding: HashMap<ConversationId, Vec<OutstandingQuestion>>,
    pub(crate) buffered: HashMap<ConversationId, Vec<String>>,
    pub(crate) capture: Option<PendingCapture>,
    next_question: u64,
    next_capture: u64,
}

/// Handle returned by [`CorrelationStore::register`].
///
/// `rx` yields the reply text once the matcher resolves the question.
#[derive(Debug)]
pub struct QuestionTicket {
    pub id: QuestionId,
    pub conversation: ConversationId,
    pub rx: oneshot::Receiver<String>,
}

/// Handle returned by [`CorrelationStore::start_capture`].
///
/// `rx` closes without a value if a newer capture replaces this one.
#[derive(Debug)]
pub struct CaptureTicket {
    pub id: CaptureId,
    pub rx: oneshot::Receiver<ConversationId>,
}

/// Registry of outstanding questions, buffered replies and the pending capture.
#[derive(Debug, Default)]
pub struct CorrelationStore {
    inner: Mutex<StoreInner>,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the state. A poisoned lock is recovered: every mutation leaves
    /// the maps consistent before anything that could panic.
    pub(crate) fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a question as outstanding for `conversation`.
    pub fn register(
        &self,
        conversation: ConversationId,
        external_ref: Option<MessageId>,
        content: impl Into<String>,
    ) -> QuestionTicket {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.lock();
        inner.next_question += 1;
        let id = QuestionId(inner.next_question);

        inner
            .outstanding
            .entry(conversation)
            .or_default()
            .push(OutstandingQuestion {
                id,
                external_ref,
                content: content.into(),
                resolver: tx,
                created_at: Instant::now(),
            });
        debug!(%conversation, question = %id, "question registered");

        QuestionTicket {
            id,
            conversation,
            rx,
        }
    }

    /// Takes every reply buffered for `conversation`, oldest first.
    pub fn drain_buffered(&self, conversation: ConversationId) -> Vec<String> {
        self.lock()
            .buffered
            .remove(&conversation)
            .unwrap_or_default()
    }

    /// Removes the question if it is still outstanding.
    ///
    /// Returns `false` when the matcher already resolved it, in which case
    /// the reply is waiting in the ticket's receiver.
    pub fn withdraw(&self, conversation: ConversationId, id: QuestionId) -> bool {
        let mut inner = self.lock();
        let Some(questions) = inner.outstanding.get_mut(&conversation) else {
            return false;
        };
        let Some(idx) = questions.iter().position(|q| q.id == id) else {
            return false;
        };

        let question = questions.remove(idx);
        if questions.is_empty() {
            inner.outstanding.remove(&conversation);
        }
        debug!(
            %conversation,
            question = %id,
            content_len = question.content.len(),
            waited_ms = question.created_at.elapsed().as_millis() as u64,
            "question withdrawn"
        );
        true
    }

    pub fn has_outstanding(&self, conversation: ConversationId) -> bool {
        self.lock()
            .outstanding
            .get(&conversation)
            .is_some_and(|q| !q.is_empty())
    }

    /// Number of questions outstanding for `conversation`.
    pub fn outstanding_count(&self, conversation: ConversationId) -> usize {
        self.lock()
            .outstanding
            .get(&conversation)
            .map_or(0, Vec::len)
    }

    /// Installs a capture for the next inbound conversation id.
    ///
    /// A previous capture is dropped unresolved; its waiter sees a closed
    /// receiver and runs out its own deadline.
    pub fn start_capture(&self) -> CaptureTicket {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.lock();
        inner.next_capture += 1;
        let id = CaptureId(inner.next_capture);

        if let Some(previous) = inner.capture.replace(PendingCapture { id, resolver: tx }) {
            debug!(replaced = %previous.id, capture = %id, "capture replaced");
        }

        CaptureTicket { id, rx }
    }

    /// Clears the capture if it is still `id`. Returns whether it was cleared.
    pub fn cancel_capture(&self, id: CaptureId) -> bool {
        let mut inner = self.lock();
        if inner.capture.as_ref().is_some_and(|c| c.id == id) {
            inner.capture = None;
            true
        } else {
            false
        }
    }

    pub fn has_capture(&self) -> bool {
        self.lock().capture.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONV: ConversationId = ConversationId(42);

    #[test]
    fn register_assigns_distinct_ids() {
        let store = CorrelationStore::new();
        let a = store.register(CONV, None, "a");
        let b = store.register(CONV, None, "b");
        assert_ne!(a.id, b.id);
        assert_eq!(store.outstanding_count(CONV), 2);
    }

    #[test]
    fn withdraw_is_idempotent() {
        let store = CorrelationStore::new();
        let ticket = store.register(CONV, None, "q");
        assert!(store.withdraw(CONV, ticket.id));
        assert!(!store.withdraw(CONV, ticket.id));
        assert!(!store.has_outstanding(CONV));
        assert!(store.lock().outstanding.is_empty());
    }

    #[test]
    fn withdraw_unknown_conversation_is_noop() {
        let store = CorrelationStore::new();
        let ticket = store.register(CONV, None, "q");
        assert!(!store.withdraw(ConversationId(7), ticket.id));
        assert!(store.has_outstanding(CONV));
    }

    #[test]
    fn drain_empties_buffer() {
        let store = CorrelationStore::new();
        store
            .lock()
            .buffered
            .insert(CONV, vec!["one".into(), "two".into()]);
        assert_eq!(store.drain_buffered(CONV), vec!["one", "two"]);
        assert!(store.drain_buffered(CONV).is_empty());
    }

    #[test]
    fn new_capture_closes_previous_receiver() {
        let store = CorrelationStore::new();
        let mut first = store.start_capture();
        let second = store.start_capture();

        assert!(matches!(
            first.rx.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));
        // Cancelling with a stale id leaves the newer capture in place.
        assert!(!store.cancel_capture(first.id));
        assert!(store.has_capture());
        assert!(store.cancel_capture(second.id));
        assert!(!store.has_capture());
    }

    #[test]
    fn question_id_display() {
        assert_eq!(QuestionId(3).to_string(), "q3");
    }
}
