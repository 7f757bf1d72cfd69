// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for asklink.
//!
//! This crate provides the error type, identifiers, message types and the
//! channel adapter traits shared by the daemon, the IPC layer and the CLI.

pub mod error;
pub mod traits;
pub mod types;

pub use error::AsklinkError;
pub use traits::{ChannelAdapter, PluginAdapter};
pub use types::{
    ChannelCapabilities, ConversationId, HealthStatus, InboundMessage, MessageId, OutboundMessage,
};

/// Reply handed to a waiting caller when the human never answered, and the
/// fallback the CLI prints when the daemon cannot be reached.
pub const NO_REPLY_SENTINEL: &str =
    "user didn't reply go ahead with caution, don't make huge refactor, check what you are doing";

/// Notice posted to a conversation when a question's wait lapsed.
pub const TIMEOUT_NOTICE: &str = "timeout: no reply received";
