// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound listener: feeds every message from the channel to the matcher.

use std::sync::Arc;

use asklink_core::ChannelAdapter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::store::CorrelationStore;

/// Reads the channel until it closes or `cancel` fires.
///
/// Adapters only yield messages from authorized senders, so everything
/// received here is delivered. A receive error means the feed has ended.
pub async fn run_listener(
    store: Arc<CorrelationStore>,
    channel: Arc<dyn ChannelAdapter>,
    cancel: CancellationToken,
) {
    info!(channel = channel.name(), "inbound listener running");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("shutdown signal received, stopping inbound listener");
                break;
            }
            msg = channel.receive() => match msg {
                Ok(inbound) => {
                    let delivery = store.deliver(&inbound);
                    debug!(
                        conversation = %inbound.conversation,
                        message_id = %inbound.id,
                        outcome = ?delivery.outcome,
                        captured = delivery.captured,
                        "inbound message handled"
                    );
                }
                Err(e) => {
                    error!(error = %e, "channel receive error, stopping inbound listener");
                    break;
                }
            }
        }
    }
}
