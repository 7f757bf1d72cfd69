// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end daemon testing.
//!
//! `TestHarness` assembles the daemon core (correlation store, router and
//! inbound listener) around a [`MockChannel`], optionally serving the router
//! on a Unix socket in a temp directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use asklink_config::{AsklinkConfig, SessionConfig};
use asklink_core::{AsklinkError, ChannelAdapter, ConversationId, MessageId};
use asklink_ipc::{IpcClient, IpcServer, RequestHandler};
use asklink_session::{CorrelationStore, DaemonRouter, SessionSelector, run_listener};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::mock_channel::MockChannel;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: AsklinkConfig,
    with_ipc: bool,
    max_message_length: Option<usize>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: AsklinkConfig::default(),
            with_ipc: false,
            max_message_length: None,
        }
    }

    /// Add a configured session.
    pub fn with_session(mut self, name: &str, chat_id: i64, working_dir: &str) -> Self {
        self.config.sessions.push(SessionConfig {
            name: name.to_string(),
            chat_id,
            working_dir: working_dir.to_string(),
        });
        self
    }

    /// Set the reply timeout used when a request gives none.
    pub fn with_default_timeout(mut self, secs: u64) -> Self {
        self.config.daemon.default_timeout_secs = secs;
        self
    }

    /// Set the capture timeout used when a request gives none.
    pub fn with_capture_timeout(mut self, secs: u64) -> Self {
        self.config.daemon.capture_timeout_secs = secs;
        self
    }

    /// Limit outbound messages the mock channel accepts, in characters.
    pub fn with_max_message_length(mut self, max: usize) -> Self {
        self.max_message_length = Some(max);
        self
    }

    /// Serve the router on a socket in a temp directory.
    pub fn with_ipc(mut self) -> Self {
        self.with_ipc = true;
        self
    }

    /// Build the harness and start the inbound listener (and socket server).
    pub async fn build(self) -> Result<TestHarness, AsklinkError> {
        let temp_dir = tempfile::TempDir::new()
            .map_err(|e| AsklinkError::Internal(format!("failed to create temp dir: {e}")))?;
        let socket_path = temp_dir.path().join("asklink.sock");

        let mut config = self.config;
        config.daemon.socket_path = socket_path.to_string_lossy().into_owned();

        let store = Arc::new(CorrelationStore::new());
        let mut mock_channel = MockChannel::new();
        if let Some(max) = self.max_message_length {
            mock_channel = mock_channel.with_max_message_length(max);
        }
        let mock_channel = Arc::new(mock_channel);
        let channel: Arc<dyn ChannelAdapter> = mock_channel.clone();
        let router = Arc::new(DaemonRouter::new(
            store.clone(),
            channel.clone(),
            config.clone(),
        ));

        let cancel = CancellationToken::new();
        let mut tasks = vec![tokio::spawn(run_listener(
            store.clone(),
            channel,
            cancel.clone(),
        ))];

        if self.with_ipc {
            let server = IpcServer::bind(&socket_path)?;
            let handler: Arc<dyn RequestHandler> = router.clone();
            tasks.push(tokio::spawn(server.serve(handler, cancel.clone())));
        }

        Ok(TestHarness {
            store,
            mock_channel,
            router,
            config,
            socket_path,
            cancel,
            tasks,
            _temp_dir: temp_dir,
        })
    }
}

/// A running daemon core with a mock channel.
pub struct TestHarness {
    /// Correlation state shared by the router and listener.
    pub store: Arc<CorrelationStore>,
    /// The mock channel adapter.
    pub mock_channel: Arc<MockChannel>,
    /// The daemon router.
    pub router: Arc<DaemonRouter>,
    /// Configuration the router was built with.
    pub config: AsklinkConfig,
    socket_path: PathBuf,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Ask a question in the named session and wait for the reply.
    pub async fn send_and_wait(
        &self,
        session: &str,
        text: &str,
        timeout: Duration,
    ) -> Result<String, AsklinkError> {
        self.router
            .send_and_wait(&SessionSelector::by_name(session), text, Some(timeout))
            .await
    }

    /// Inject a reply from the human into `conversation`.
    pub async fn reply(&self, conversation: i64, text: &str, reply_to: Option<MessageId>) {
        self.mock_channel
            .inject_reply(ConversationId(conversation), text, reply_to)
            .await;
    }

    /// Path of the daemon socket (served only when built `with_ipc`).
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// A client for the daemon socket.
    pub fn client(&self) -> IpcClient {
        IpcClient::new(&self.socket_path)
    }

    /// Stop the listener and socket server and wait for them to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for task in std::mem::take(&mut self.tasks) {
            let _ = task.await;
        }
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
