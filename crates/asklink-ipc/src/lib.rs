// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local transport between the `asklink` CLI and the daemon.
//!
//! One newline-terminated JSON request and one response per Unix socket
//! connection. See [`protocol`] for the wire types.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::IpcClient;
pub use protocol::{INVALID_REQUEST, Request, RequestKind, Response, UNKNOWN_REQUEST_TYPE};
pub use server::{IpcServer, RequestHandler};
