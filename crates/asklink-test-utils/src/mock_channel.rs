// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable inbound messages
//! and captured outbound messages for assertion in tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use asklink_core::traits::adapter::PluginAdapter;
use asklink_core::traits::channel::ChannelAdapter;
use asklink_core::types::{
    ChannelCapabilities, ConversationId, HealthStatus, InboundMessage, MessageId, OutboundMessage,
};
use asklink_core::AsklinkError;

/// A mock messaging channel for testing.
///
/// Provides two queues:
/// - **inbound**: Messages injected via `inject_message()` are returned by `receive()`
/// - **sent**: Messages passed to `send()` are captured with the id they were
///   given; ids are sequential (`"1"`, `"2"`, ...) so tests can thread replies
pub struct MockChannel {
    inbound: Arc<Mutex<VecDeque<InboundMessage>>>,
    sent: Arc<Mutex<Vec<(MessageId, OutboundMessage)>>>,
    notify: Arc<Notify>,
    sent_notify: Arc<Notify>,
    next_sent_id: AtomicU64,
    next_inbound_id: AtomicU64,
    fail_next_send: Mutex<Option<String>>,
    closed: AtomicBool,
    max_message_length: Option<usize>,
}

impl MockChannel {
    /// Create a new mock channel with empty queues.
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            sent_notify: Arc::new(Notify::new()),
            next_sent_id: AtomicU64::new(1),
            next_inbound_id: AtomicU64::new(1),
            fail_next_send: Mutex::new(None),
            closed: AtomicBool::new(false),
            max_message_length: None,
        }
    }

    /// Advertise an outbound length limit in `capabilities()`.
    pub fn with_max_message_length(mut self, max: usize) -> Self {
        self.max_message_length = Some(max);
        self
    }

    /// Inject an inbound message into the receive queue.
    ///
    /// The next call to `receive()` will return this message.
    pub async fn inject_message(&self, msg: InboundMessage) {
        self.inbound.lock().await.push_back(msg);
        self.notify.notify_one();
    }

    /// Inject a text reply from the test user into `conversation`.
    pub async fn inject_reply(
        &self,
        conversation: ConversationId,
        text: &str,
        reply_to: Option<MessageId>,
    ) {
        let id = self.next_inbound_id.fetch_add(1, Ordering::Relaxed);
        self.inject_message(InboundMessage {
            id: MessageId(format!("in-{id}")),
            conversation,
            sender_id: "test-user".to_string(),
            text: text.to_string(),
            reply_to,
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
        .await;
    }

    /// Make the next `send()` fail with a channel error carrying `message`.
    pub async fn fail_next_send(&self, message: &str) {
        *self.fail_next_send.lock().await = Some(message.to_string());
    }

    /// End the inbound feed: `receive()` errors once the queue is empty.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Get all messages that were sent through `send()`.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.iter().map(|(_, m)| m.clone()).collect()
    }

    /// Get sent messages together with the ids `send()` returned.
    pub async fn sent_with_ids(&self) -> Vec<(MessageId, OutboundMessage)> {
        self.sent.lock().await.clone()
    }

    /// Wait until at least `count` messages have been sent and return them.
    pub async fn wait_for_sent(&self, count: usize) -> Vec<(MessageId, OutboundMessage)> {
        loop {
            let notified = self.sent_notify.notified();
            {
                let sent = self.sent.lock().await;
                if sent.len() >= count {
                    return sent.clone();
                }
            }
            notified.await;
        }
    }

    /// Get the count of sent messages.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Clear all sent messages.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, AsklinkError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AsklinkError> {
        self.close();
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_reply_threading: true,
            max_message_length: self.max_message_length,
        }
    }

    async fn connect(&mut self) -> Result<(), AsklinkError> {
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, AsklinkError> {
        if let Some(message) = self.fail_next_send.lock().await.take() {
            return Err(AsklinkError::channel(message));
        }

        let id = MessageId(self.next_sent_id.fetch_add(1, Ordering::Relaxed).to_string());
        self.sent.lock().await.push((id.clone(), msg));
        self.sent_notify.notify_waiters();
        Ok(id)
    }

    async fn receive(&self) -> Result<InboundMessage, AsklinkError> {
        loop {
            // Try to pop from queue
            {
                let mut queue = self.inbound.lock().await;
                if let Some(msg) = queue.pop_front() {
                    return Ok(msg);
                }
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(AsklinkError::channel("mock channel closed"));
            }
            // Wait for notification that a new message was injected
            self.notify.notified().await;
        }
    }
}
