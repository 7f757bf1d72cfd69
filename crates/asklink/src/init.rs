// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `asklink init` command implementation.
//!
//! Writes a first configuration from flags, prompting for whatever is
//! missing. A Telegram username or a group chat is resolved from the bot's
//! recent updates, so the user must message the bot before running it.

use std::io::{BufRead, Write};
use std::path::Path;

use async_trait::async_trait;
use asklink_config::{AsklinkConfig, SessionConfig, save_config, writable_config_path};
use asklink_core::AsklinkError;
use asklink_telegram::{Bot, setup};

use crate::prompt::{Prompter, ask_secret};
use crate::session_cmd::parse_chat_id;

const DEFAULT_SESSION_NAME: &str = "default";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Flags accepted by `init`. The timeout comes from the global `--timeout`.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct InitArgs {
    /// Telegram bot token from @BotFather.
    #[arg(long)]
    pub token: Option<String>,

    /// Your numeric Telegram user ID.
    #[arg(long)]
    pub user_id: Option<u64>,

    /// Your Telegram username (e.g. @username), resolved via the bot.
    #[arg(long)]
    pub username: Option<String>,

    /// Name of the first session.
    #[arg(long)]
    pub session_name: Option<String>,

    /// Chat the first session posts to.
    #[arg(long, allow_hyphen_values = true)]
    pub chat_id: Option<i64>,

    /// Working directory of the first session.
    #[arg(long)]
    pub working_dir: Option<String>,
}

/// Looks up chats the bot has seen.
#[async_trait]
pub trait ChatDirectory: Send + Sync {
    async fn resolve_username(&self, username: &str) -> Result<u64, AsklinkError>;
    async fn detect_group_chat(&self) -> Result<i64, AsklinkError>;
}

/// [`ChatDirectory`] backed by the bot's pending updates.
pub struct TelegramDirectory {
    bot: Bot,
}

impl TelegramDirectory {
    pub fn new(token: &str) -> Self {
        Self {
            bot: Bot::new(token),
        }
    }
}

#[async_trait]
impl ChatDirectory for TelegramDirectory {
    async fn resolve_username(&self, username: &str) -> Result<u64, AsklinkError> {
        setup::resolve_username(&self.bot, username).await
    }

    async fn detect_group_chat(&self) -> Result<i64, AsklinkError> {
        setup::detect_group_chat(&self.bot).await
    }
}

/// Runs `asklink init` on the terminal.
pub async fn run_init(
    args: InitArgs,
    timeout: Option<u64>,
    config_path: Option<&Path>,
) -> Result<(), AsklinkError> {
    let token = match args.token.clone() {
        Some(token) => token,
        None => ask_secret("Bot token (from @BotFather)")?,
    };
    if token.is_empty() {
        return Err(AsklinkError::Config("bot token is required".to_string()));
    }

    let cwd = std::env::current_dir()
        .map(|d| d.to_string_lossy().into_owned())
        .unwrap_or_default();
    let directory = TelegramDirectory::new(&token);
    let mut prompter = Prompter::stdio();

    let config = build_config(args, token, timeout, &cwd, &directory, &mut prompter).await?;

    let path = writable_config_path(config_path);
    save_config(&config, &path)?;
    println!("Created {}", path.display());
    println!("\nConfiguration complete. Run 'asklink serve' to start the daemon.");
    Ok(())
}

/// Assembles the first configuration, prompting for missing values.
pub async fn build_config<R: BufRead, W: Write>(
    args: InitArgs,
    token: String,
    timeout: Option<u64>,
    cwd: &str,
    directory: &dyn ChatDirectory,
    prompter: &mut Prompter<R, W>,
) -> Result<AsklinkConfig, AsklinkError> {
    let user_id = match (args.user_id, args.username.as_deref()) {
        (Some(id), _) => id,
        (None, Some(username)) => directory.resolve_username(username).await?,
        (None, None) => ask_user_id(directory, prompter).await?,
    };
    if user_id == 0 {
        return Err(AsklinkError::Config("user ID is required".to_string()));
    }
    prompter.say(&format!("User ID: {user_id}"))?;

    let session_name = match args.session_name {
        Some(name) => name,
        None => prompter.ask("Session name (e.g., myproject)")?,
    };
    let session_name = if session_name.is_empty() {
        DEFAULT_SESSION_NAME.to_string()
    } else {
        session_name
    };

    let chat_id = match args.chat_id {
        Some(id) => id,
        None => ask_chat_id(user_id, directory, prompter).await?,
    };

    let working_dir = match args.working_dir {
        Some(dir) => dir,
        None => {
            let answer = prompter.ask(&format!("Working directory [{cwd}]"))?;
            if answer.is_empty() {
                cwd.to_string()
            } else {
                answer
            }
        }
    };

    let timeout = match timeout {
        Some(secs) => secs,
        None => {
            let answer = prompter.ask(&format!("Timeout in seconds [{DEFAULT_TIMEOUT_SECS}]"))?;
            if answer.is_empty() {
                DEFAULT_TIMEOUT_SECS
            } else {
                answer
                    .parse()
                    .map_err(|_| AsklinkError::Config(format!("invalid timeout: {answer}")))?
            }
        }
    };
    if timeout == 0 {
        return Err(AsklinkError::Config(
            "timeout must be greater than 0".to_string(),
        ));
    }

    let mut config = AsklinkConfig::default();
    config.telegram.bot_token = Some(token);
    config.telegram.allowed_users = vec![user_id.to_string()];
    config.daemon.default_timeout_secs = timeout;
    config.sessions.push(SessionConfig {
        name: session_name,
        chat_id,
        working_dir,
    });
    Ok(config)
}

async fn ask_user_id<R: BufRead, W: Write>(
    directory: &dyn ChatDirectory,
    prompter: &mut Prompter<R, W>,
) -> Result<u64, AsklinkError> {
    let input = prompter.ask("Your Telegram user ID or @username")?;
    if input.starts_with('@') {
        prompter.say("\nTo resolve the username, send /start to your bot first.")?;
        prompter.ask("Press Enter after sending /start to the bot")?;
        return directory.resolve_username(&input).await;
    }
    input
        .parse()
        .map_err(|_| AsklinkError::Config(format!("invalid user ID: {input}")))
}

async fn ask_chat_id<R: BufRead, W: Write>(
    user_id: u64,
    directory: &dyn ChatDirectory,
    prompter: &mut Prompter<R, W>,
) -> Result<i64, AsklinkError> {
    prompter.say("\nChat ID options:")?;
    prompter.say(&format!("  - Press Enter to use the private chat ({user_id})"))?;
    prompter.say("  - Type 'group' to detect a group (add the bot and send a message there first)")?;
    prompter.say("  - Enter a chat ID directly")?;

    let input = prompter.ask("Chat ID")?;
    if input.is_empty() {
        return i64::try_from(user_id)
            .map_err(|_| AsklinkError::Config(format!("invalid user ID: {user_id}")));
    }
    if input.eq_ignore_ascii_case("group") {
        let chat_id = directory.detect_group_chat().await?;
        prompter.say(&format!("Detected group chat ID: {chat_id}"))?;
        return Ok(chat_id);
    }
    parse_chat_id(&input)
}
