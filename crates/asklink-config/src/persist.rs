// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Writing the configuration back to disk for `init` and `session` commands.

use std::path::Path;

use asklink_core::AsklinkError;
use tracing::debug;

use crate::model::AsklinkConfig;

/// Serializes `config` as TOML and writes it to `path`.
///
/// A missing parent directory is created owner-only (0700); an existing one
/// keeps its permissions. On Unix the file is 0600 since it holds the bot
/// token.
pub fn save_config(config: &AsklinkConfig, path: &Path) -> Result<(), AsklinkError> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| AsklinkError::Config(format!("failed to serialize config: {e}")))?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_private_dir(parent)?;
    }

    std::fs::write(path, content).map_err(|e| {
        AsklinkError::Config(format!("failed to write {}: {e}", path.display()))
    })?;
    restrict_permissions(path, 0o600)?;

    debug!(path = %path.display(), "config saved");
    Ok(())
}

/// Creates `dir` (and parents) restricted to the owner on Unix.
///
/// An existing directory is left untouched.
pub fn create_private_dir(dir: &Path) -> Result<(), AsklinkError> {
    if dir.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|e| {
        AsklinkError::Config(format!("failed to create {}: {e}", dir.display()))
    })?;
    restrict_permissions(dir, 0o700)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) -> Result<(), AsklinkError> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|e| {
        AsklinkError::Config(format!(
            "failed to set permissions on {}: {e}",
            path.display()
        ))
    })
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path, _mode: u32) -> Result<(), AsklinkError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;
    use crate::model::SessionConfig;

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("asklink.toml");

        let mut config = AsklinkConfig::default();
        config.telegram.bot_token = Some("123:abc".into());
        config.telegram.allowed_users = vec!["4242".into()];
        config.sessions.push(SessionConfig {
            name: "api".into(),
            chat_id: 4242,
            working_dir: "/work/api".into(),
        });

        save_config(&config, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let loaded = load_config_from_str(&content).unwrap();
        assert_eq!(loaded.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(loaded.sessions, config.sessions);
    }

    #[cfg(unix)]
    #[test]
    fn saved_config_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asklink.toml");
        save_config(&AsklinkConfig::default(), &path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn created_parent_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("asklink");
        save_config(&AsklinkConfig::default(), &parent.join("asklink.toml")).unwrap();

        let mode = std::fs::metadata(&parent).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[cfg(unix)]
    #[test]
    fn existing_parent_keeps_its_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("project");
        std::fs::create_dir(&project).unwrap();
        std::fs::set_permissions(&project, std::fs::Permissions::from_mode(0o755)).unwrap();

        save_config(&AsklinkConfig::default(), &project.join("asklink.toml")).unwrap();

        let mode = std::fs::metadata(&project).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
