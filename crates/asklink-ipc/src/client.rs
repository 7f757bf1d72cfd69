// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client side of the daemon socket, used by the CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use asklink_core::AsklinkError;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::protocol::{Request, Response};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Connects to the daemon socket, one connection per request.
#[derive(Debug, Clone)]
pub struct IpcClient {
    socket_path: PathBuf,
}

impl IpcClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Sends `request` and waits for the daemon's response.
    ///
    /// There is no read deadline: a `send` legitimately blocks for as long
    /// as the daemon waits for the human.
    pub async fn send(&self, request: &Request) -> Result<Response, AsklinkError> {
        let stream = self.connect(CONNECT_TIMEOUT).await?;
        let (reader, mut writer) = stream.into_split();

        let mut line = serde_json::to_string(request)
            .map_err(|e| AsklinkError::transport("failed to encode request", e))?;
        line.push('\n');
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| AsklinkError::transport("failed to send request", e))?;

        let mut reply = String::new();
        let read = BufReader::new(reader)
            .read_line(&mut reply)
            .await
            .map_err(|e| AsklinkError::transport("failed to read response", e))?;
        if read == 0 {
            return Err(AsklinkError::Transport {
                message: "daemon closed the connection without a response".to_string(),
                source: None,
            });
        }

        serde_json::from_str(reply.trim())
            .map_err(|e| AsklinkError::transport("failed to parse response", e))
    }

    /// Whether something accepts connections on the socket.
    pub async fn is_running(&self) -> bool {
        self.connect(PROBE_TIMEOUT).await.is_ok()
    }

    async fn connect(&self, limit: Duration) -> Result<UnixStream, AsklinkError> {
        match timeout(limit, UnixStream::connect(&self.socket_path)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(AsklinkError::transport(
                format!("failed to connect to {}", self.socket_path.display()),
                e,
            )),
            Err(elapsed) => Err(AsklinkError::transport(
                format!("timed out connecting to {}", self.socket_path.display()),
                elapsed,
            )),
        }
    }
}
