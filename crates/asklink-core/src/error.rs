// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by every asklink crate.

use thiserror::Error;

/// The primary error type used across adapters, the daemon, and the CLI.
#[derive(Debug, Error)]
pub enum AsklinkError {
    /// Configuration errors (missing token, invalid values, unreadable file).
    #[error("configuration error: {0}")]
    Config(String),

    /// No configured session matched the caller's selector.
    #[error("session not found: {selector}")]
    SessionNotFound { selector: String },

    /// Messaging channel errors (send failure, message too long, feed closed).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Local transport errors between the CLI and the daemon.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No inbound message arrived before a chat capture deadline.
    #[error("timeout waiting for message after {duration:?}")]
    CaptureTimeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AsklinkError {
    /// Shorthand for a [`AsklinkError::Channel`] without an underlying source.
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a [`AsklinkError::Transport`] wrapping an I/O or codec error.
    pub fn transport<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
