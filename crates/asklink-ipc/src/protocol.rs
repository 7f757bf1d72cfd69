// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types exchanged over the daemon socket.
//!
//! Each connection carries exactly one request line and one response line,
//! both newline-terminated JSON.

use serde::{Deserialize, Serialize};

/// Error text returned when a request line cannot be decoded.
pub const INVALID_REQUEST: &str = "invalid request format";

/// Error text returned for a well-formed request of an unknown type.
pub const UNKNOWN_REQUEST_TYPE: &str = "unknown request type";

/// What the client wants the daemon to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Post a question and wait for the reply.
    Send,
    /// Report the conversation id of the next inbound message.
    GetChatId,
    /// A type this daemon does not know; answered with an error.
    #[serde(other)]
    Unknown,
}

/// A single request from the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "type")]
    pub kind: RequestKind,
    /// Explicit session name; empty selects by `workdir`.
    #[serde(default)]
    pub session: String,
    #[serde(default)]
    pub message: String,
    /// Seconds to wait; 0 means the daemon default.
    #[serde(default)]
    pub timeout: u64,
    #[serde(default)]
    pub workdir: String,
}

impl Request {
    pub fn send(
        session: impl Into<String>,
        message: impl Into<String>,
        timeout: u64,
        workdir: impl Into<String>,
    ) -> Self {
        Self {
            kind: RequestKind::Send,
            session: session.into(),
            message: message.into(),
            timeout,
            workdir: workdir.into(),
        }
    }

    pub fn get_chat_id(timeout: u64) -> Self {
        Self {
            kind: RequestKind::GetChatId,
            session: String::new(),
            message: String::new(),
            timeout,
            workdir: String::new(),
        }
    }
}

/// The daemon's answer to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default)]
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn reply(reply: impl Into<String>) -> Self {
        Self {
            success: true,
            reply: reply.into(),
            ..Default::default()
        }
    }

    pub fn chat_id(chat_id: i64) -> Self {
        Self {
            success: true,
            chat_id: Some(chat_id),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }
}
