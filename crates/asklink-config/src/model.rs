// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for asklink.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::path::{Path, PathBuf};
use std::time::Duration;

use asklink_core::ConversationId;
use serde::{Deserialize, Serialize};

/// Name of the per-user configuration directory under the XDG config dir.
pub const CONFIG_DIR_NAME: &str = "asklink";

/// Name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "asklink.toml";

/// Name of the daemon socket file.
pub const SOCKET_FILE_NAME: &str = "asklink.sock";

/// Top-level asklink configuration.
///
/// Loaded from TOML files with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AsklinkConfig {
    /// Daemon runtime settings.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Telegram bot integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Sessions mapping a name and working directory to a chat.
    #[serde(default)]
    pub sessions: Vec<SessionConfig>,
}

impl AsklinkConfig {
    /// Finds a session by its exact name.
    pub fn find_session_by_name(&self, name: &str) -> Option<&SessionConfig> {
        self.sessions.iter().find(|s| s.name == name)
    }

    /// Finds a session whose working directory equals `work_dir`.
    ///
    /// Trailing separators are ignored on both sides.
    pub fn find_session_by_work_dir(&self, work_dir: &Path) -> Option<&SessionConfig> {
        let wanted = normalize_dir(work_dir);
        self.sessions
            .iter()
            .find(|s| normalize_dir(Path::new(&s.working_dir)) == wanted)
    }

    /// Mutable lookup by name, used by `session edit`.
    pub fn find_session_by_name_mut(&mut self, name: &str) -> Option<&mut SessionConfig> {
        self.sessions.iter_mut().find(|s| s.name == name)
    }

    /// Removes a session by name, returning it if it existed.
    pub fn remove_session(&mut self, name: &str) -> Option<SessionConfig> {
        let idx = self.sessions.iter().position(|s| s.name == name)?;
        Some(self.sessions.remove(idx))
    }
}

fn normalize_dir(path: &Path) -> PathBuf {
    path.components().collect()
}

/// Daemon runtime configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Path of the Unix socket the daemon listens on.
    #[serde(default = "default_socket_path")]
    pub socket_path: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds a `send` waits for a reply when the caller gives no timeout.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Seconds a chat capture waits when the caller gives no timeout.
    #[serde(default = "default_capture_timeout_secs")]
    pub capture_timeout_secs: u64,

    /// Post "daemon started/stopped" notices to every configured session chat.
    #[serde(default = "default_notify_lifecycle")]
    pub notify_lifecycle: bool,
}

impl DaemonConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture_timeout_secs)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            log_level: default_log_level(),
            default_timeout_secs: default_timeout_secs(),
            capture_timeout_secs: default_capture_timeout_secs(),
            notify_lifecycle: default_notify_lifecycle(),
        }
    }
}

/// Directory holding the user's config file and, by default, the socket.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(CONFIG_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Path of the user's config file.
pub fn default_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

fn default_socket_path() -> String {
    config_dir()
        .join(SOCKET_FILE_NAME)
        .to_string_lossy()
        .into_owned()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_capture_timeout_secs() -> u64 {
    60
}

fn default_notify_lifecycle() -> bool {
    true
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required by `serve`.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Telegram user IDs or usernames whose messages are accepted.
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

/// A named mapping from a working directory to a Telegram chat.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Unique session name, used by `--session`.
    pub name: String,

    /// Chat the questions for this session are posted to.
    pub chat_id: i64,

    /// Working directory that selects this session when no name is given.
    #[serde(default)]
    pub working_dir: String,
}

impl SessionConfig {
    pub fn conversation(&self) -> ConversationId {
        ConversationId(self.chat_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(name: &str, chat_id: i64, dir: &str) -> SessionConfig {
        SessionConfig {
            name: name.to_string(),
            chat_id,
            working_dir: dir.to_string(),
        }
    }

    #[test]
    fn find_session_by_name_and_dir() {
        let config = AsklinkConfig {
            sessions: vec![
                session("api", 1, "/work/api"),
                session("web", 2, "/work/web"),
            ],
            ..Default::default()
        };

        assert_eq!(config.find_session_by_name("web").unwrap().chat_id, 2);
        assert!(config.find_session_by_name("nope").is_none());
        assert_eq!(
            config
                .find_session_by_work_dir(Path::new("/work/api"))
                .unwrap()
                .name,
            "api"
        );
        assert!(config
            .find_session_by_work_dir(Path::new("/work/api/sub"))
            .is_none());
    }

    #[test]
    fn work_dir_match_ignores_trailing_separator() {
        let config = AsklinkConfig {
            sessions: vec![session("api", 1, "/work/api/")],
            ..Default::default()
        };
        assert!(config
            .find_session_by_work_dir(Path::new("/work/api"))
            .is_some());
    }

    #[test]
    fn remove_session_returns_removed_entry() {
        let mut config = AsklinkConfig {
            sessions: vec![session("api", 1, "/a"), session("web", 2, "/b")],
            ..Default::default()
        };
        let removed = config.remove_session("api").unwrap();
        assert_eq!(removed.chat_id, 1);
        assert_eq!(config.sessions.len(), 1);
        assert!(config.remove_session("api").is_none());
    }

    #[test]
    fn daemon_durations() {
        let daemon = DaemonConfig::default();
        assert_eq!(daemon.default_timeout(), Duration::from_secs(300));
        assert_eq!(daemon.capture_timeout(), Duration::from_secs(60));
        assert!(daemon.socket_path.ends_with(SOCKET_FILE_NAME));
    }
}
