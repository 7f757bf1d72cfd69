// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Matching inbound replies to outstanding questions.
//!
//! A reply that threads onto a sent question resolves exactly that question.
//! Otherwise the oldest outstanding question in the conversation gets it.
//! With nothing outstanding the reply is buffered for the next question.
//! Independently, every inbound message satisfies a pending capture.

use asklink_core::{ConversationId, InboundMessage, MessageId};
use tracing::{debug, info, warn};

use crate::store::{CorrelationStore, OutstandingQuestion, QuestionId};

/// What happened to one inbound reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The reply resolved a question. `threaded` is set when it was picked
    /// by reply reference rather than by arrival order.
    Matched { question: QuestionId, threaded: bool },
    /// No question was outstanding; the reply was appended to the buffer.
    Buffered,
}

/// Result of delivering one inbound message to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub outcome: MatchOutcome,
    /// Whether a pending capture was resolved with this message's conversation.
    pub captured: bool,
}

/// Index into the outstanding list and whether it came from a reply reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Selection {
    index: usize,
    threaded: bool,
}

/// Picks the question a reply answers. `questions` must be non-empty and in
/// arrival order.
fn select(
    conversation: ConversationId,
    questions: &[OutstandingQuestion],
    reply_to: Option<&MessageId>,
) -> Selection {
    if let Some(target) = reply_to
        && let Some(index) = questions
            .iter()
            .position(|q| q.external_ref.as_ref() == Some(target))
    {
        return Selection {
            index,
            threaded: true,
        };
    }

    if questions.len() > 1 || reply_to.is_some() {
        warn!(
            %conversation,
            outstanding = questions.len(),
            reply_to = reply_to.map(|r| r.0.as_str()).unwrap_or(""),
            "reply not threaded to a known question, answering the oldest"
        );
    }

    Selection {
        index: 0,
        threaded: false,
    }
}

impl CorrelationStore {
    /// Delivers an inbound message from an authorized sender.
    pub fn deliver(&self, msg: &InboundMessage) -> Delivery {
        self.deliver_reply(msg.conversation, msg.reply_to.as_ref(), &msg.text)
    }

    /// Resolves one outstanding question with `text` or buffers it, then
    /// satisfies a pending capture. All of it happens under one lock.
    pub fn deliver_reply(
        &self,
        conversation: ConversationId,
        reply_to: Option<&MessageId>,
        text: &str,
    ) -> Delivery {
        let mut inner = self.lock();
        let mut outcome = MatchOutcome::Buffered;

        if let Some(questions) = inner.outstanding.get_mut(&conversation) {
            // A question whose waiter has gone away cannot take the reply;
            // drop it and select again so the text is never lost.
            while !questions.is_empty() {
                let selection = select(conversation, questions, reply_to);
                let question = questions.remove(selection.index);
                let waited_ms = question.created_at.elapsed().as_millis() as u64;

                match question.resolver.send(text.to_string()) {
                    Ok(()) => {
                        info!(
                            %conversation,
                            question = %question.id,
                            threaded = selection.threaded,
                            waited_ms,
                            "reply matched"
                        );
                        outcome = MatchOutcome::Matched {
                            question: question.id,
                            threaded: selection.threaded,
                        };
                        break;
                    }
                    Err(_) => {
                        debug!(%conversation, question = %question.id, "waiter gone, discarding question");
                    }
                }
            }

            if questions.is_empty() {
                inner.outstanding.remove(&conversation);
            }
        }

        if outcome == MatchOutcome::Buffered {
            let queue = inner.buffered.entry(conversation).or_default();
            queue.push(text.to_string());
            info!(%conversation, buffered = queue.len(), "no outstanding question, reply buffered");
        }

        let captured = match inner.capture.take() {
            Some(capture) => {
                let delivered = capture.resolver.send(conversation).is_ok();
                debug!(%conversation, capture = %capture.id, delivered, "capture resolved");
                delivered
            }
            None => false,
        };

        Delivery { outcome, captured }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONV: ConversationId = ConversationId(42);

    fn mid(s: &str) -> MessageId {
        MessageId(s.to_string())
    }

    #[test]
    fn reply_without_question_is_buffered() {
        let store = CorrelationStore::new();
        let d = store.deliver_reply(CONV, None, "early");
        assert_eq!(d.outcome, MatchOutcome::Buffered);
        assert!(!d.captured);
        assert_eq!(store.drain_buffered(CONV), vec!["early"]);
    }

    #[test]
    fn threaded_reply_resolves_targeted_question() {
        let store = CorrelationStore::new();
        let mut first = store.register(CONV, Some(mid("10")), "first");
        let mut second = store.register(CONV, Some(mid("11")), "second");

        let d = store.deliver_reply(CONV, Some(&mid("11")), "to second");
        assert_eq!(
            d.outcome,
            MatchOutcome::Matched {
                question: second.id,
                threaded: true
            }
        );
        assert_eq!(second.rx.try_recv().unwrap(), "to second");
        assert!(first.rx.try_recv().is_err());
        assert_eq!(store.outstanding_count(CONV), 1);
    }

    #[test]
    fn unthreaded_reply_resolves_oldest() {
        let store = CorrelationStore::new();
        let mut first = store.register(CONV, Some(mid("10")), "first");
        let _second = store.register(CONV, Some(mid("11")), "second");

        let d = store.deliver_reply(CONV, None, "answer");
        assert_eq!(
            d.outcome,
            MatchOutcome::Matched {
                question: first.id,
                threaded: false
            }
        );
        assert_eq!(first.rx.try_recv().unwrap(), "answer");
    }

    #[test]
    fn unknown_reply_target_falls_back_to_oldest() {
        let store = CorrelationStore::new();
        let mut only = store.register(CONV, Some(mid("10")), "only");

        let d = store.deliver_reply(CONV, Some(&mid("999")), "answer");
        assert!(matches!(
            d.outcome,
            MatchOutcome::Matched {
                threaded: false,
                ..
            }
        ));
        assert_eq!(only.rx.try_recv().unwrap(), "answer");
        assert!(!store.has_outstanding(CONV));
    }

    #[test]
    #[tracing_test::traced_test]
    fn ambiguous_fallback_is_logged() {
        let store = CorrelationStore::new();
        let _a = store.register(CONV, Some(mid("10")), "a");
        let _b = store.register(CONV, Some(mid("11")), "b");

        store.deliver_reply(CONV, None, "which one?");
        assert!(logs_contain("answering the oldest"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn single_unthreaded_question_is_not_ambiguous() {
        let store = CorrelationStore::new();
        let _a = store.register(CONV, Some(mid("10")), "a");

        store.deliver_reply(CONV, None, "sure");
        assert!(!logs_contain("answering the oldest"));
    }

    #[test]
    fn conversations_are_isolated() {
        let store = CorrelationStore::new();
        let mut other = store.register(ConversationId(7), None, "elsewhere");

        let d = store.deliver_reply(CONV, None, "hi");
        assert_eq!(d.outcome, MatchOutcome::Buffered);
        assert!(other.rx.try_recv().is_err());
        assert!(store.has_outstanding(ConversationId(7)));
    }

    #[test]
    fn abandoned_question_passes_reply_to_next() {
        let store = CorrelationStore::new();
        let abandoned = store.register(CONV, None, "gone");
        let mut live = store.register(CONV, None, "live");
        drop(abandoned);

        let d = store.deliver_reply(CONV, None, "answer");
        assert_eq!(
            d.outcome,
            MatchOutcome::Matched {
                question: live.id,
                threaded: false
            }
        );
        assert_eq!(live.rx.try_recv().unwrap(), "answer");
    }

    #[test]
    fn abandoned_only_question_leads_to_buffering() {
        let store = CorrelationStore::new();
        drop(store.register(CONV, None, "gone"));

        let d = store.deliver_reply(CONV, None, "answer");
        assert_eq!(d.outcome, MatchOutcome::Buffered);
        assert_eq!(store.drain_buffered(CONV), vec!["answer"]);
    }

    #[test]
    fn capture_fires_alongside_buffering_and_matching() {
        let store = CorrelationStore::new();

        let mut capture = store.start_capture();
        let d = store.deliver_reply(ConversationId(-100), None, "hello");
        assert!(d.captured);
        assert_eq!(d.outcome, MatchOutcome::Buffered);
        assert_eq!(capture.rx.try_recv().unwrap(), ConversationId(-100));
        assert!(!store.has_capture());

        let mut question = store.register(CONV, None, "q");
        let mut capture = store.start_capture();
        let d = store.deliver_reply(CONV, None, "a");
        assert!(d.captured);
        assert!(matches!(d.outcome, MatchOutcome::Matched { .. }));
        assert_eq!(question.rx.try_recv().unwrap(), "a");
        assert_eq!(capture.rx.try_recv().unwrap(), CONV);
    }

    #[test]
    fn deliver_uses_message_fields() {
        let store = CorrelationStore::new();
        let mut ticket = store.register(CONV, Some(mid("5")), "q");
        let msg = InboundMessage {
            id: mid("6"),
            conversation: CONV,
            sender_id: "1".into(),
            text: "yes".into(),
            reply_to: Some(mid("5")),
            timestamp: String::new(),
        };
        let d = store.deliver(&msg);
        assert!(matches!(d.outcome, MatchOutcome::Matched { threaded: true, .. }));
        assert_eq!(ticket.rx.try_recv().unwrap(), "yes");
    }
}
