// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for asklink.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), user and local file lookup, environment variable
//! overrides, miette diagnostics with typo suggestions, and saving edits
//! made by the `init` and `session` commands.
//!
//! # Usage
//!
//! ```no_run
//! use asklink_config::load_and_validate;
//!
//! let config = load_and_validate(None).expect("config errors");
//! println!("socket: {}", config.daemon.socket_path);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod persist;
pub mod validation;

use std::path::{Path, PathBuf};

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{AsklinkConfig, DaemonConfig, SessionConfig, TelegramConfig, default_config_path};
pub use persist::save_config;

/// Load configuration and validate it.
///
/// With `explicit_path` set only that file is read (plus env overrides);
/// otherwise the standard lookup applies. Figment errors are converted to
/// miette diagnostics with typo suggestions.
pub fn load_and_validate(explicit_path: Option<&Path>) -> Result<AsklinkConfig, Vec<ConfigError>> {
    let loaded = match explicit_path {
        Some(path) => loader::load_config_from_path(path),
        None => loader::load_config(),
    };

    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let toml_sources = collect_toml_sources(explicit_path);
            Err(diagnostic::figment_to_config_errors(err, &toml_sources))
        }
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<AsklinkConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// The file edits should be written to: the explicit path, else the user config.
pub fn writable_config_path(explicit_path: Option<&Path>) -> PathBuf {
    explicit_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path)
}

/// Collect TOML source file contents for error span resolution.
fn collect_toml_sources(explicit_path: Option<&Path>) -> Vec<(String, String)> {
    let candidates: Vec<PathBuf> = match explicit_path {
        Some(path) => vec![path.to_path_buf()],
        None => {
            let local = std::env::current_dir()
                .map(|d| d.join("asklink.toml"))
                .unwrap_or_else(|_| PathBuf::from("asklink.toml"));
            vec![local, default_config_path()]
        }
    };

    candidates
        .into_iter()
        .filter_map(|path| {
            std::fs::read_to_string(&path)
                .ok()
                .map(|content| (path.display().to_string(), content))
        })
        .collect()
}
