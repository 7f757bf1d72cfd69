// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for question/reply correlation through the router.

use std::sync::{Arc, Barrier};
use std::time::Duration;

use asklink_core::{AsklinkError, ConversationId, NO_REPLY_SENTINEL, TIMEOUT_NOTICE};
use asklink_session::arbiter::arbitrate;
use asklink_session::{CorrelationStore, EpisodeState, MatchOutcome, SessionSelector};
use asklink_test_utils::TestHarness;
use tokio::time::Instant;

const CHAT: i64 = 42;

async fn harness() -> TestHarness {
    TestHarness::builder()
        .with_session("api", CHAT, "/work/api")
        .with_session("web", 7, "/work/web")
        .build()
        .await
        .unwrap()
}

/// Lets the listener task process injected messages.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn threaded_reply_resolves_exactly_the_targeted_question() {
    let h = Arc::new(harness().await);

    let first = {
        let h = h.clone();
        tokio::spawn(async move { h.send_and_wait("api", "first?", Duration::from_secs(60)).await })
    };
    h.mock_channel.wait_for_sent(1).await;
    let second = {
        let h = h.clone();
        tokio::spawn(async move { h.send_and_wait("api", "second?", Duration::from_secs(60)).await })
    };
    let sent = h.mock_channel.wait_for_sent(2).await;
    assert_eq!(sent[1].1.content, "second?");

    // Threaded to the newer question, ahead of FIFO order.
    h.reply(CHAT, "answer two", Some(sent[1].0.clone())).await;
    assert_eq!(second.await.unwrap().unwrap(), "answer two");
    assert!(!first.is_finished());

    h.reply(CHAT, "answer one", None).await;
    assert_eq!(first.await.unwrap().unwrap(), "answer one");
    assert!(!h.store.has_outstanding(ConversationId(CHAT)));
}

#[tokio::test(start_paused = true)]
async fn buffered_replies_are_prepended_to_the_next_answer() {
    let h = Arc::new(harness().await);

    h.reply(CHAT, "early one", None).await;
    h.reply(CHAT, "early two", None).await;
    settle().await;

    let ask = {
        let h = h.clone();
        tokio::spawn(async move { h.send_and_wait("api", "go?", Duration::from_secs(60)).await })
    };
    let sent = h.mock_channel.wait_for_sent(1).await;
    h.reply(CHAT, "now", Some(sent[0].0.clone())).await;

    assert_eq!(ask.await.unwrap().unwrap(), "early one\nearly two\nnow");
}

#[tokio::test(start_paused = true)]
async fn timeout_returns_sentinel_and_late_reply_is_buffered() {
    let h = harness().await;
    let started = Instant::now();

    let reply = h
        .send_and_wait("api", "anyone?", Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(reply, NO_REPLY_SENTINEL);
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(!h.store.has_outstanding(ConversationId(CHAT)));

    let sent = h.mock_channel.sent_messages().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].content, TIMEOUT_NOTICE);
    assert_eq!(sent[1].conversation, ConversationId(CHAT));

    h.reply(CHAT, "sorry, late", None).await;
    settle().await;
    assert_eq!(
        h.store.drain_buffered(ConversationId(CHAT)),
        vec!["sorry, late"]
    );
}

#[tokio::test(start_paused = true)]
async fn timeout_returns_prior_buffered_replies_instead_of_sentinel() {
    let h = harness().await;
    h.reply(CHAT, "fyi: tests are red", None).await;
    settle().await;

    let episode = h
        .router
        .run_episode(&SessionSelector::by_name("api"), "ship?", Some(Duration::from_secs(3)))
        .await
        .unwrap();

    assert_eq!(episode.state, EpisodeState::TimedOut);
    assert_eq!(episode.reply, "fyi: tests are red");
}

#[tokio::test(start_paused = true)]
async fn reply_that_beats_the_deadline_is_not_lost() {
    let h = harness().await;
    let conversation = ConversationId(CHAT);

    // Resolved and removed by the matcher before the arbiter looks at it.
    let ticket = h.store.register(conversation, None, "ship?");
    h.store.deliver_reply(conversation, None, "yes");

    let episode = arbitrate(&h.store, &*h.mock_channel, ticket, Vec::new(), Duration::ZERO).await;

    assert_eq!(episode.state, EpisodeState::Resolved);
    assert_eq!(episode.reply, "yes");
    assert_eq!(h.mock_channel.sent_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn zero_timeout_uses_configured_default() {
    let h = TestHarness::builder()
        .with_session("api", CHAT, "/work/api")
        .with_default_timeout(30)
        .build()
        .await
        .unwrap();
    let started = Instant::now();

    let reply = h
        .send_and_wait("api", "wait for default?", Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(reply, NO_REPLY_SENTINEL);
    assert!(started.elapsed() >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn session_is_selected_by_working_directory() {
    let h = Arc::new(harness().await);

    let ask = {
        let h = h.clone();
        tokio::spawn(async move {
            h.router
                .send_and_wait(
                    &SessionSelector::by_work_dir("/work/web/"),
                    "web?",
                    Some(Duration::from_secs(60)),
                )
                .await
        })
    };
    let sent = h.mock_channel.wait_for_sent(1).await;
    assert_eq!(sent[0].1.conversation, ConversationId(7));

    h.reply(7, "web ok", None).await;
    assert_eq!(ask.await.unwrap().unwrap(), "web ok");
}

#[tokio::test]
async fn unknown_session_is_reported_and_nothing_is_sent() {
    let h = harness().await;
    let err = h
        .send_and_wait("nope", "hello?", Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AsklinkError::SessionNotFound { .. }));
    assert_eq!(h.mock_channel.sent_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn oversized_question_is_rejected_before_sending() {
    let h = TestHarness::builder()
        .with_session("api", CHAT, "/work/api")
        .with_max_message_length(10)
        .build()
        .await
        .unwrap();
    h.reply(CHAT, "queued", None).await;
    settle().await;

    let err = h
        .send_and_wait("api", "this is far too long", Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, AsklinkError::Channel { .. }));
    assert!(err.to_string().contains("10 character limit (20 characters)"));
    assert_eq!(h.mock_channel.sent_count().await, 0);
    assert!(!h.store.has_outstanding(ConversationId(CHAT)));
    assert_eq!(h.store.drain_buffered(ConversationId(CHAT)), vec!["queued"]);

    // Exactly at the limit is fine.
    let ask = h.send_and_wait("api", "0123456789", Duration::from_secs(5));
    assert_eq!(ask.await.unwrap(), NO_REPLY_SENTINEL);
}

#[tokio::test(start_paused = true)]
async fn send_failure_registers_nothing_and_keeps_buffer() {
    let h = harness().await;
    h.reply(CHAT, "queued", None).await;
    settle().await;
    h.mock_channel.fail_next_send("telegram unreachable").await;

    let err = h
        .send_and_wait("api", "hello?", Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, AsklinkError::Channel { .. }));
    assert!(!h.store.has_outstanding(ConversationId(CHAT)));
    assert_eq!(h.store.drain_buffered(ConversationId(CHAT)), vec!["queued"]);
}

#[tokio::test(start_paused = true)]
async fn capture_reports_next_conversation_even_when_buffered() {
    let h = Arc::new(harness().await);

    let capture = {
        let h = h.clone();
        tokio::spawn(async move {
            h.router
                .capture_next_conversation(Some(Duration::from_secs(30)))
                .await
        })
    };
    while !h.store.has_capture() {
        tokio::task::yield_now().await;
    }

    h.reply(-100123, "hi from the group", None).await;
    assert_eq!(capture.await.unwrap().unwrap(), ConversationId(-100123));
    settle().await;
    assert_eq!(
        h.store.drain_buffered(ConversationId(-100123)),
        vec!["hi from the group"]
    );
}

#[tokio::test(start_paused = true)]
async fn capture_times_out_and_clears_itself() {
    let h = harness().await;
    let started = Instant::now();

    let err = h
        .router
        .capture_next_conversation(Some(Duration::from_secs(2)))
        .await
        .unwrap_err();

    assert!(matches!(err, AsklinkError::CaptureTimeout { .. }));
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert!(!h.store.has_capture());
}

#[tokio::test(start_paused = true)]
async fn replaced_capture_waits_out_its_own_deadline() {
    let h = Arc::new(harness().await);
    let started = Instant::now();

    let first = {
        let h = h.clone();
        tokio::spawn(async move {
            let r = h
                .router
                .capture_next_conversation(Some(Duration::from_secs(10)))
                .await;
            (r, Instant::now())
        })
    };
    while !h.store.has_capture() {
        tokio::task::yield_now().await;
    }

    let second = {
        let h = h.clone();
        tokio::spawn(async move {
            h.router
                .capture_next_conversation(Some(Duration::from_secs(30)))
                .await
        })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;
    h.reply(55, "me", None).await;

    assert_eq!(second.await.unwrap().unwrap(), ConversationId(55));

    let (first_result, finished_at) = first.await.unwrap();
    assert!(matches!(
        first_result,
        Err(AsklinkError::CaptureTimeout { .. })
    ));
    assert!(finished_at.duration_since(started) >= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn different_conversations_proceed_in_parallel() {
    let h = Arc::new(harness().await);

    let api = {
        let h = h.clone();
        tokio::spawn(async move { h.send_and_wait("api", "api?", Duration::from_secs(60)).await })
    };
    let web = {
        let h = h.clone();
        tokio::spawn(async move { h.send_and_wait("web", "web?", Duration::from_secs(60)).await })
    };
    h.mock_channel.wait_for_sent(2).await;

    h.reply(7, "web answer", None).await;
    h.reply(CHAT, "api answer", None).await;

    assert_eq!(web.await.unwrap().unwrap(), "web answer");
    assert_eq!(api.await.unwrap().unwrap(), "api answer");
}

/// A question is never resolved twice: whichever of resolution and
/// withdrawal wins inside the store, the other observes it.
#[test]
fn concurrent_resolve_and_withdraw_settle_exactly_once() {
    let store = Arc::new(CorrelationStore::new());
    let conversation = ConversationId(CHAT);

    for round in 0..500 {
        let mut ticket = store.register(conversation, None, "q");
        let id = ticket.id;
        let barrier = Arc::new(Barrier::new(2));

        let resolver = {
            let store = store.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                store.deliver_reply(conversation, None, "reply")
            })
        };

        barrier.wait();
        let withdrawn = store.withdraw(conversation, id);
        let delivery = resolver.join().unwrap();

        match delivery.outcome {
            MatchOutcome::Matched { question, .. } => {
                assert_eq!(question, id, "round {round}");
                assert!(!withdrawn, "round {round}: resolved and withdrawn");
                assert_eq!(ticket.rx.try_recv().unwrap(), "reply");
            }
            MatchOutcome::Buffered => {
                assert!(withdrawn, "round {round}: neither resolved nor withdrawn");
                assert!(ticket.rx.try_recv().is_err());
                assert_eq!(store.drain_buffered(conversation), vec!["reply"]);
            }
        }
        assert!(!store.has_outstanding(conversation));
    }
}
