// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as unique session names and non-zero timeouts.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::AsklinkConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or every collected error
/// (does not fail fast).
pub fn validate_config(config: &AsklinkConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.daemon.socket_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "daemon.socket_path must not be empty".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.daemon.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "daemon.log_level `{}` is not one of {}",
                config.daemon.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.daemon.default_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "daemon.default_timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.daemon.capture_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "daemon.capture_timeout_secs must be greater than 0".to_string(),
        });
    }

    let mut seen_names = HashSet::new();
    for (i, session) in config.sessions.iter().enumerate() {
        if session.name.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("sessions[{i}].name must not be empty"),
            });
        } else if !seen_names.insert(session.name.as_str()) {
            errors.push(ConfigError::Validation {
                message: format!("duplicate session name `{}` in [[sessions]]", session.name),
            });
        }

        if session.chat_id == 0 {
            errors.push(ConfigError::Validation {
                message: format!("sessions[{i}].chat_id must not be 0"),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SessionConfig;

    fn session(name: &str, chat_id: i64) -> SessionConfig {
        SessionConfig {
            name: name.to_string(),
            chat_id,
            working_dir: "/tmp".to_string(),
        }
    }

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&AsklinkConfig::default()).is_ok());
    }

    #[test]
    fn zero_timeout_fails_validation() {
        let mut config = AsklinkConfig::default();
        config.daemon.default_timeout_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "default_timeout_secs"));
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = AsklinkConfig::default();
        config.daemon.log_level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "log_level"));
    }

    #[test]
    fn duplicate_session_names_fail_validation() {
        let mut config = AsklinkConfig::default();
        config.sessions = vec![session("api", 1), session("api", 2)];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "duplicate session name `api`"));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = AsklinkConfig::default();
        config.daemon.capture_timeout_secs = 0;
        config.sessions = vec![session("", 0)];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(has_message(&errors, "sessions[0].name"));
        assert!(has_message(&errors, "sessions[0].chat_id"));
    }

    #[test]
    fn negative_group_chat_ids_are_valid() {
        let mut config = AsklinkConfig::default();
        config.sessions = vec![session("team", -1001234567890)];
        assert!(validate_config(&config).is_ok());
    }
}
