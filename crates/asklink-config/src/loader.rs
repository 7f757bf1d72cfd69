// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./asklink.toml` > `~/.config/asklink/asklink.toml`, with
//! environment variable overrides via the `ASKLINK_` prefix and the
//! conventional `TELEGRAM_BOT_TOKEN`.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::{AsklinkConfig, default_config_path};

/// Environment variable accepted as an alternative to `ASKLINK_TELEGRAM_BOT_TOKEN`.
pub const BOT_TOKEN_ENV_VAR: &str = "TELEGRAM_BOT_TOKEN";

/// Load configuration from the standard lookup paths with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `~/.config/asklink/asklink.toml` (user config)
/// 3. `./asklink.toml` (local directory)
/// 4. `ASKLINK_*` environment variables
/// 5. `TELEGRAM_BOT_TOKEN`
pub fn load_config() -> Result<AsklinkConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<AsklinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AsklinkConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
///
/// Unlike the default lookup, a missing file is an error here: the user
/// named it explicitly.
pub fn load_config_from_path(path: &Path) -> Result<AsklinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AsklinkConfig::default()))
        .merge(Toml::file_exact(path))
        .merge(env_provider())
        .merge(bot_token_provider())
        .extract()
}

/// Build the Figment used for default config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(AsklinkConfig::default()))
        .merge(Toml::file(default_config_path()))
        .merge(Toml::file("asklink.toml"))
        .merge(env_provider())
        .merge(bot_token_provider())
}

/// Environment provider using explicit `map()` for section-to-dot mapping.
///
/// `Env::split("_")` would turn `ASKLINK_TELEGRAM_BOT_TOKEN` into
/// `telegram.bot.token`; only the first underscore separates the section.
fn env_provider() -> Env {
    Env::prefixed("ASKLINK_").map(|key| {
        let mapped = key
            .as_str()
            .replacen("daemon_", "daemon.", 1)
            .replacen("telegram_", "telegram.", 1);
        mapped.into()
    })
}

fn bot_token_provider() -> Env {
    Env::raw()
        .only(&[BOT_TOKEN_ENV_VAR])
        .map(|_| "telegram.bot_token".into())
}
