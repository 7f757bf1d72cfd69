// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unix domain socket server for the daemon.
//!
//! The socket is mode 0600 and a directory created for it is 0700, so
//! filesystem permissions are the only access control.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use asklink_core::AsklinkError;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::protocol::{INVALID_REQUEST, Request, Response};

/// Upper bound on a request line. Questions are short; anything larger is
/// treated as malformed.
const MAX_REQUEST_BYTES: u64 = 1024 * 1024;

/// Serves decoded requests. Implemented by the daemon router.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    async fn handle(&self, request: Request) -> Response;
}

/// A bound, not yet serving, daemon socket.
pub struct IpcServer {
    listener: UnixListener,
    path: PathBuf,
}

impl IpcServer {
    /// Creates a missing socket directory (0700), removes a stale socket file
    /// and binds a fresh socket restricted to the owner.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self, AsklinkError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                AsklinkError::transport(format!("failed to create {}", parent.display()), e)
            })?;
            set_mode(parent, 0o700)?;
        }

        // Ignore NotFound to avoid a check-then-remove race.
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed stale socket"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(AsklinkError::transport("failed to remove stale socket", e));
            }
        }

        let listener = UnixListener::bind(&path).map_err(|e| {
            AsklinkError::transport(format!("failed to bind {}", path.display()), e)
        })?;
        set_mode(&path, 0o600)?;

        Ok(Self { listener, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accepts connections until `cancel` fires, one task per connection.
    ///
    /// The socket file is removed on return. Connections already being served
    /// keep running; their handlers finish on their own deadlines.
    pub async fn serve(self, handler: Arc<dyn RequestHandler>, cancel: CancellationToken) {
        info!(path = %self.path.display(), "ipc server listening");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("ipc server shutting down");
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let handler = Arc::clone(&handler);
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, handler).await {
                                    debug!(error = %e, "ipc connection ended");
                                }
                            });
                        }
                        Err(e) => warn!(error = %e, "ipc accept error"),
                    }
                }
            }
        }

        let _ = std::fs::remove_file(&self.path);
    }
}

/// Reads one request line, dispatches it and writes one response line.
async fn handle_connection(
    stream: UnixStream,
    handler: Arc<dyn RequestHandler>,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader.take(MAX_REQUEST_BYTES));

    // Raw bytes, so invalid UTF-8 is answered like any other malformed line.
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line).await? == 0 {
        return Ok(());
    }

    let response = match serde_json::from_slice::<Request>(line.trim_ascii()) {
        Ok(request) => {
            debug!(kind = ?request.kind, session = %request.session, "ipc request");
            handler.handle(request).await
        }
        Err(e) => {
            debug!(error = %e, "malformed ipc request");
            Response::error(INVALID_REQUEST)
        }
    };

    let mut json = serde_json::to_string(&response).map_err(std::io::Error::other)?;
    json.push('\n');
    // The client may be gone by now; its question was already handled.
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), AsklinkError> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|e| {
        AsklinkError::transport(format!("failed to set permissions on {}", path.display()), e)
    })
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), AsklinkError> {
    Ok(())
}
