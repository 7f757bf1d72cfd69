// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `asklink session` and `asklink list` command implementations.
//!
//! Sessions map a name and a working directory to a Telegram chat. These
//! commands edit the `[[sessions]]` table of the config file; a running
//! daemon picks the changes up on restart.

use std::io::{BufRead, Write};
use std::path::Path;

use asklink_config::{AsklinkConfig, SessionConfig, save_config, writable_config_path};
use asklink_core::AsklinkError;
use asklink_ipc::{IpcClient, Request};

use crate::prompt::Prompter;

/// Values given on the command line for `session create`.
#[derive(Debug, Clone, Default)]
pub struct CreateInput {
    pub name: Option<String>,
    pub chat_id: Option<i64>,
    pub working_dir: Option<String>,
}

/// Values given on the command line for `session edit`.
#[derive(Debug, Clone, Default)]
pub struct EditInput {
    pub name: Option<String>,
    pub chat_id: Option<i64>,
    pub working_dir: Option<String>,
}

impl EditInput {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.chat_id.is_none() && self.working_dir.is_none()
    }
}

/// Renders the configured sessions for `list`.
pub fn format_sessions(config: &AsklinkConfig) -> String {
    if config.sessions.is_empty() {
        return "no sessions configured\n".to_string();
    }
    config
        .sessions
        .iter()
        .map(|s| {
            format!(
                "{}\n  chat_id: {}\n  working_dir: {}\n",
                s.name, s.chat_id, s.working_dir
            )
        })
        .collect()
}

/// Adds a session, prompting for anything not given.
pub fn create_session<R: BufRead, W: Write>(
    config: &mut AsklinkConfig,
    input: CreateInput,
    prompter: &mut Prompter<R, W>,
) -> Result<SessionConfig, AsklinkError> {
    let name = session_name(input.name, prompter)?;
    ensure_unique(config, &name)?;

    let chat_id = match input.chat_id {
        Some(id) => id,
        None => parse_chat_id(&prompter.ask("Chat ID")?)?,
    };
    if chat_id == 0 {
        return Err(AsklinkError::Config("chat ID is required".to_string()));
    }

    let working_dir = match input.working_dir {
        Some(dir) => dir,
        None => prompter.ask("Working directory")?,
    };
    if working_dir.is_empty() {
        return Err(AsklinkError::Config(
            "working directory is required".to_string(),
        ));
    }

    let session = SessionConfig {
        name,
        chat_id,
        working_dir,
    };
    config.sessions.push(session.clone());
    Ok(session)
}

/// Changes a session from flags, or interactively when no flag is given.
///
/// Returns the session's name after the edit.
pub fn edit_session<R: BufRead, W: Write>(
    config: &mut AsklinkConfig,
    target: &str,
    input: EditInput,
    prompter: &mut Prompter<R, W>,
) -> Result<String, AsklinkError> {
    let current = config
        .find_session_by_name(target)
        .cloned()
        .ok_or_else(|| AsklinkError::SessionNotFound {
            selector: target.to_string(),
        })?;

    let updated = if input.is_empty() {
        let mut updated = current.clone();

        let name = prompter.ask(&format!("Name [{}]", current.name))?;
        if !name.is_empty() {
            updated.name = name;
        }
        let chat_id = prompter.ask(&format!("Chat ID [{}]", current.chat_id))?;
        if !chat_id.is_empty() {
            updated.chat_id = parse_chat_id(&chat_id)?;
        }
        let working_dir = prompter.ask(&format!("Working directory [{}]", current.working_dir))?;
        if !working_dir.is_empty() {
            updated.working_dir = working_dir;
        }
        updated
    } else {
        SessionConfig {
            name: input.name.unwrap_or(current.name.clone()),
            chat_id: input.chat_id.unwrap_or(current.chat_id),
            working_dir: input.working_dir.unwrap_or(current.working_dir.clone()),
        }
    };

    if updated.name != current.name {
        ensure_unique(config, &updated.name)?;
    }

    let name = updated.name.clone();
    if let Some(slot) = config.find_session_by_name_mut(target) {
        *slot = updated;
    }
    Ok(name)
}

/// Removes a session after confirmation. Returns whether it was removed.
pub fn delete_session<R: BufRead, W: Write>(
    config: &mut AsklinkConfig,
    target: &str,
    force: bool,
    prompter: &mut Prompter<R, W>,
) -> Result<bool, AsklinkError> {
    if config.find_session_by_name(target).is_none() {
        return Err(AsklinkError::SessionNotFound {
            selector: target.to_string(),
        });
    }

    if !force && !prompter.confirm(&format!("Delete session {target:?}?"))? {
        prompter.say("cancelled")?;
        return Ok(false);
    }

    config.remove_session(target);
    Ok(true)
}

/// Runs `session create`, asking the daemon for the chat when `detect_chat` is set.
pub async fn run_create(
    mut config: AsklinkConfig,
    config_path: Option<&Path>,
    mut input: CreateInput,
    detect_chat: bool,
    timeout: Option<u64>,
) -> Result<(), AsklinkError> {
    let mut prompter = Prompter::stdio();

    if detect_chat && input.chat_id.is_none() {
        let name = session_name(input.name.take(), &mut prompter)?;
        ensure_unique(&config, &name)?;
        input.name = Some(name);

        let client = IpcClient::new(&config.daemon.socket_path);
        input.chat_id = Some(detect_chat_id(&client, timeout, &mut prompter).await?);
    }

    let session = create_session(&mut config, input, &mut prompter)?;
    save_config(&config, &writable_config_path(config_path))?;
    println!("session {:?} created", session.name);
    Ok(())
}

/// Runs `session edit`.
pub fn run_edit(
    mut config: AsklinkConfig,
    config_path: Option<&Path>,
    target: &str,
    input: EditInput,
) -> Result<(), AsklinkError> {
    let name = edit_session(&mut config, target, input, &mut Prompter::stdio())?;
    save_config(&config, &writable_config_path(config_path))?;
    println!("session {name:?} updated");
    Ok(())
}

/// Runs `session delete`.
pub fn run_delete(
    mut config: AsklinkConfig,
    config_path: Option<&Path>,
    target: &str,
    force: bool,
) -> Result<(), AsklinkError> {
    if delete_session(&mut config, target, force, &mut Prompter::stdio())? {
        save_config(&config, &writable_config_path(config_path))?;
        println!("session {target:?} deleted");
    }
    Ok(())
}

/// Asks the running daemon for the conversation of the next inbound message.
async fn detect_chat_id<R: BufRead, W: Write>(
    client: &IpcClient,
    timeout: Option<u64>,
    prompter: &mut Prompter<R, W>,
) -> Result<i64, AsklinkError> {
    if !client.is_running().await {
        return Err(AsklinkError::Config(
            "daemon is not running, start it with `asklink serve` to detect the chat".to_string(),
        ));
    }

    prompter.say("Send a message in the target chat now...")?;
    let response = client.send(&Request::get_chat_id(timeout.unwrap_or(0))).await?;

    match response.chat_id {
        Some(chat_id) if response.success => {
            prompter.say(&format!("Detected chat ID: {chat_id}"))?;
            Ok(chat_id)
        }
        _ => Err(AsklinkError::Internal(format!(
            "chat detection failed: {}",
            response.error.unwrap_or_default()
        ))),
    }
}

fn session_name<R: BufRead, W: Write>(
    given: Option<String>,
    prompter: &mut Prompter<R, W>,
) -> Result<String, AsklinkError> {
    let name = match given {
        Some(name) => name,
        None => prompter.ask("Session name")?,
    };
    if name.trim().is_empty() {
        return Err(AsklinkError::Config("session name is required".to_string()));
    }
    Ok(name)
}

fn ensure_unique(config: &AsklinkConfig, name: &str) -> Result<(), AsklinkError> {
    if config.find_session_by_name(name).is_some() {
        return Err(AsklinkError::Config(format!(
            "session {name:?} already exists"
        )));
    }
    Ok(())
}

pub(crate) fn parse_chat_id(input: &str) -> Result<i64, AsklinkError> {
    input
        .trim()
        .parse::<i64>()
        .map_err(|_| AsklinkError::Config(format!("invalid chat ID: {input}")))
}
