// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `asklink serve` command implementation.
//!
//! Starts the daemon: connects the Telegram channel, feeds inbound messages
//! into the correlation store and serves CLI requests on the Unix socket
//! until SIGINT or SIGTERM.

use std::sync::Arc;

use asklink_config::AsklinkConfig;
use asklink_core::{AsklinkError, ChannelAdapter, HealthStatus, PluginAdapter};
use asklink_ipc::{IpcServer, RequestHandler};
use asklink_session::{CorrelationStore, DaemonRouter, install_signal_handler, run_listener};
use asklink_telegram::TelegramChannel;
use tracing::{debug, info, warn};

const STARTED_NOTICE: &str = "asklink daemon started";
const STOPPED_NOTICE: &str = "asklink daemon stopped";

/// Runs the `asklink serve` command.
pub async fn run_serve(config: AsklinkConfig) -> Result<(), AsklinkError> {
    init_tracing(&config.daemon.log_level);

    info!(sessions = config.sessions.len(), "starting asklink serve");
    if config.sessions.is_empty() {
        warn!("no sessions configured, every send will be rejected");
    }

    let mut telegram = TelegramChannel::new(config.telegram.clone())?;
    match telegram.health_check().await? {
        HealthStatus::Healthy => debug!("telegram bot reachable"),
        HealthStatus::Degraded(reason) => warn!(reason = %reason, "telegram bot degraded"),
        HealthStatus::Unhealthy(reason) => return Err(AsklinkError::channel(reason)),
    }
    telegram.connect().await?;
    let caps = telegram.capabilities();
    info!(
        reply_threading = caps.supports_reply_threading,
        max_message_length = ?caps.max_message_length,
        "telegram channel connected"
    );
    if !caps.supports_reply_threading {
        warn!("channel cannot thread replies, answers are matched by arrival order");
    }
    let channel: Arc<dyn ChannelAdapter> = Arc::new(telegram);

    let store = Arc::new(CorrelationStore::new());
    let router = Arc::new(DaemonRouter::new(
        store.clone(),
        channel.clone(),
        config.clone(),
    ));

    let server = IpcServer::bind(&config.daemon.socket_path)?;

    // Install signal handler.
    let cancel = install_signal_handler();

    let listener = tokio::spawn(run_listener(store, channel.clone(), cancel.clone()));

    if config.daemon.notify_lifecycle {
        router.broadcast(STARTED_NOTICE).await;
    }

    let handler: Arc<dyn RequestHandler> = router.clone();
    server.serve(handler, cancel.clone()).await;

    if config.daemon.notify_lifecycle {
        router.broadcast(STOPPED_NOTICE).await;
    }

    cancel.cancel();
    if let Err(e) = listener.await {
        warn!(error = %e, "inbound listener task failed");
    }
    if let Err(e) = channel.shutdown().await {
        warn!(error = %e, "channel shutdown failed");
    }

    info!("asklink serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
///
/// Logs go to stderr. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("asklink={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
