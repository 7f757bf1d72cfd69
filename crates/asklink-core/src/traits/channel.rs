// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for the messaging provider the human is reachable on.

use async_trait::async_trait;

use crate::error::AsklinkError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChannelCapabilities, InboundMessage, MessageId, OutboundMessage};

/// Adapter for a bidirectional messaging channel.
///
/// `send` delivers a question and returns the provider-assigned id used for
/// reply threading. `receive` yields the next inbound message from an
/// authorized sender; it returns an error once the feed is closed.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Returns the capabilities supported by this channel.
    fn capabilities(&self) -> ChannelCapabilities;

    /// Establishes a connection to the messaging platform and starts the inbound feed.
    async fn connect(&mut self) -> Result<(), AsklinkError>;

    /// Sends a message through the channel.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, AsklinkError>;

    /// Receives the next inbound message from the channel.
    async fn receive(&self) -> Result<InboundMessage, AsklinkError>;
}
