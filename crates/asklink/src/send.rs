// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `asklink send` command implementation.
//!
//! Posts a question through the running daemon and prints the human's
//! answer on stdout. When the daemon cannot be reached the safe default
//! reply is printed instead, so a calling agent always gets an answer.

use std::io::{BufRead, IsTerminal};

use asklink_core::{AsklinkError, NO_REPLY_SENTINEL};
use asklink_ipc::{IpcClient, Request};

/// Options for one `send` invocation.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub session: Option<String>,
    pub timeout: Option<u64>,
}

/// Runs `asklink send`.
pub async fn run_send(
    socket_path: &str,
    args: &[String],
    options: SendOptions,
) -> Result<(), AsklinkError> {
    let stdin = std::io::stdin();
    let piped = if args.is_empty() && !stdin.is_terminal() {
        Some(stdin.lock())
    } else {
        None
    };
    let message = compose_message(args, piped)?;

    let client = IpcClient::new(socket_path);
    let reply = ask(&client, message, options).await?;
    println!("{reply}");
    Ok(())
}

/// Sends the question and returns the text to print.
///
/// A missing daemon or a broken connection yields [`NO_REPLY_SENTINEL`];
/// a request the daemon rejected is an error.
pub async fn ask(
    client: &IpcClient,
    message: String,
    options: SendOptions,
) -> Result<String, AsklinkError> {
    if !client.is_running().await {
        return Ok(NO_REPLY_SENTINEL.to_string());
    }

    let workdir = std::env::current_dir()
        .map(|d| d.to_string_lossy().into_owned())
        .unwrap_or_default();
    let request = Request::send(
        options.session.unwrap_or_default(),
        message,
        options.timeout.unwrap_or(0),
        workdir,
    );

    let response = match client.send(&request).await {
        Ok(response) => response,
        Err(_) => return Ok(NO_REPLY_SENTINEL.to_string()),
    };

    if !response.success {
        return Err(AsklinkError::Internal(format!(
            "send failed: {}",
            response.error.unwrap_or_default()
        )));
    }
    Ok(response.reply)
}

/// Builds the question from the arguments, or from piped input when there
/// are none.
pub fn compose_message<R: BufRead>(
    args: &[String],
    piped: Option<R>,
) -> Result<String, AsklinkError> {
    let message = if !args.is_empty() {
        args.join(" ")
    } else if let Some(input) = piped {
        let lines = input
            .lines()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AsklinkError::Internal(format!("reading stdin: {e}")))?;
        lines.join("\n")
    } else {
        String::new()
    };

    if message.trim().is_empty() {
        return Err(AsklinkError::Config(
            "message required: asklink send \"your message\" or echo \"message\" | asklink send"
                .to_string(),
        ));
    }
    Ok(message)
}
