// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `asklink status` command implementation.
//!
//! Probes the daemon socket and reports whether the daemon is running.

use std::io::IsTerminal;

use asklink_core::AsklinkError;
use asklink_ipc::IpcClient;
use serde::Serialize;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub status: String,
    pub socket_path: String,
}

impl StatusResponse {
    fn new(running: bool, socket_path: &str) -> Self {
        Self {
            running,
            status: status_line(running).to_string(),
            socket_path: socket_path.to_string(),
        }
    }
}

fn status_line(running: bool) -> &'static str {
    if running {
        "daemon is running"
    } else {
        "daemon is not running"
    }
}

/// Run the `asklink status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(socket_path: &str, json: bool, plain: bool) -> Result<(), AsklinkError> {
    let running = IpcClient::new(socket_path).is_running().await;

    if json {
        let status_resp = StatusResponse::new(running, socket_path);
        println!(
            "{}",
            serde_json::to_string_pretty(&status_resp).unwrap_or_else(|_| "{}".to_string())
        );
        return Ok(());
    }

    let use_color = !plain && std::io::stdout().is_terminal();
    if running {
        print_status_running(use_color);
    } else {
        print_status_offline(socket_path, use_color);
    }
    Ok(())
}

/// Print running status with optional colors.
fn print_status_running(use_color: bool) {
    if use_color {
        use colored::Colorize;
        println!("{} {}", "✓".green(), status_line(true).green());
    } else {
        println!("{}", status_line(true));
    }
}

/// Print offline status with optional colors.
fn print_status_offline(socket_path: &str, use_color: bool) {
    if use_color {
        use colored::Colorize;
        println!("{} {}", "✗".red(), status_line(false).red());
        println!("  socket: {socket_path}");
        println!("  start with: asklink serve");
    } else {
        println!("{}", status_line(false));
    }
}
