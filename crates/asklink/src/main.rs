// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! asklink - ask a human on Telegram from the command line.
//!
//! This is the binary entry point for both the daemon (`serve`) and the
//! client commands that talk to it.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod init;
mod prompt;
mod send;
mod serve;
mod session_cmd;
mod status;

use std::path::{Path, PathBuf};

use asklink_config::AsklinkConfig;
use asklink_core::AsklinkError;
use clap::{Parser, Subcommand};

/// asklink - ask a human on Telegram and wait for the answer.
#[derive(Parser, Debug)]
#[command(name = "asklink", version, about, long_about = None)]
struct Cli {
    /// Config file path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Session name; defaults to the session of the working directory.
    #[arg(long, global = true)]
    session: Option<String>,

    /// Timeout in seconds; 0 or absent uses the configured default.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the daemon.
    Serve,
    /// Send a message and wait for the reply.
    Send {
        /// Message text; read from stdin when omitted.
        message: Vec<String>,
    },
    /// Check if the daemon is running.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// List configured sessions.
    List,
    /// Manage sessions.
    Session {
        #[command(subcommand)]
        action: SessionCommands,
    },
    /// Initialize configuration.
    Init(init::InitArgs),
}

/// Session subcommands.
#[derive(Subcommand, Debug)]
enum SessionCommands {
    /// Create a new session.
    Create {
        /// Unique session name.
        #[arg(long)]
        name: Option<String>,
        /// Telegram chat the session posts to.
        #[arg(long, allow_hyphen_values = true)]
        chat_id: Option<i64>,
        /// Working directory that selects the session.
        #[arg(long)]
        working_dir: Option<String>,
        /// Ask the running daemon for the chat of the next message.
        #[arg(long)]
        detect_chat: bool,
    },
    /// Edit an existing session.
    Edit {
        /// Session to edit.
        #[arg(value_name = "SESSION")]
        target: String,
        /// New session name.
        #[arg(long)]
        name: Option<String>,
        /// New Telegram chat ID.
        #[arg(long, allow_hyphen_values = true)]
        chat_id: Option<i64>,
        /// New working directory.
        #[arg(long)]
        working_dir: Option<String>,
    },
    /// Delete a session.
    Delete {
        /// Session to delete.
        #[arg(value_name = "SESSION")]
        target: String,
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        force: bool,
    },
    /// List configured sessions.
    List,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AsklinkError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Some(Commands::Serve) => serve::run_serve(load_config(config_path)).await,
        Some(Commands::Send { message }) => {
            let options = send::SendOptions {
                session: cli.session,
                timeout: cli.timeout,
            };
            send::run_send(&socket_path(config_path), &message, options).await
        }
        Some(Commands::Status { json, plain }) => {
            status::run_status(&socket_path(config_path), json, plain).await
        }
        Some(Commands::List) => {
            print!("{}", session_cmd::format_sessions(&load_config(config_path)));
            Ok(())
        }
        Some(Commands::Session { action }) => {
            run_session(action, load_config(config_path), config_path, cli.timeout).await
        }
        Some(Commands::Init(args)) => init::run_init(args, cli.timeout, config_path).await,
        None => {
            println!("asklink: use --help for available commands");
            Ok(())
        }
    }
}

async fn run_session(
    action: SessionCommands,
    config: AsklinkConfig,
    config_path: Option<&Path>,
    timeout: Option<u64>,
) -> Result<(), AsklinkError> {
    match action {
        SessionCommands::Create {
            name,
            chat_id,
            working_dir,
            detect_chat,
        } => {
            let input = session_cmd::CreateInput {
                name,
                chat_id,
                working_dir,
            };
            session_cmd::run_create(config, config_path, input, detect_chat, timeout).await
        }
        SessionCommands::Edit {
            target,
            name,
            chat_id,
            working_dir,
        } => {
            let input = session_cmd::EditInput {
                name,
                chat_id,
                working_dir,
            };
            session_cmd::run_edit(config, config_path, &target, input)
        }
        SessionCommands::Delete { target, force } => {
            session_cmd::run_delete(config, config_path, &target, force)
        }
        SessionCommands::List => {
            print!("{}", session_cmd::format_sessions(&config));
            Ok(())
        }
    }
}

/// Loads and validates the configuration, exiting with rendered
/// diagnostics when it is invalid.
fn load_config(config_path: Option<&Path>) -> AsklinkConfig {
    match asklink_config::load_and_validate(config_path) {
        Ok(config) => config,
        Err(errors) => {
            asklink_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

/// Socket the client commands connect to.
///
/// An unreadable config falls back to the default socket so `send` can
/// still answer with the safe default.
fn socket_path(config_path: Option<&Path>) -> String {
    match asklink_config::load_and_validate(config_path) {
        Ok(config) => config.daemon.socket_path,
        Err(errors) => {
            asklink_config::render_errors(&errors);
            asklink_config::DaemonConfig::default().socket_path
        }
    }
}
