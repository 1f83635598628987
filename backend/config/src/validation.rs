//! Config validation with field paths and user-friendly messages.

use thiserror::Error;

use crate::schema::StatusKeeperConfig;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// All errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Emit every finding through `tracing`.
    pub fn log(&self) {
        for warning in &self.warnings {
            tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
        }
        for error in &self.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// What the running command needs from the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationScope {
    /// Database access only (`stats`).
    Storage,
    /// A full gateway session (`serve`).
    Gateway,
    /// REST-only command registration (`register-commands`).
    Commands,
}

/// Validate the config for `scope` and return a report of all errors and warnings.
///
/// Storage is checked for every scope; Discord settings only when the scope talks to Discord.
pub fn validate(config: &StatusKeeperConfig, scope: ValidationScope) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_storage(config, &mut report);
    match scope {
        ValidationScope::Storage => {}
        ValidationScope::Gateway => validate_gateway(config, &mut report),
        ValidationScope::Commands => validate_commands(config, &mut report),
    }
    report
}

fn validate_token(config: &StatusKeeperConfig, report: &mut ValidationReport) {
    if config.discord.token.as_deref().map(str::trim).map(str::is_empty).unwrap_or(true) {
        report.error("discord.token", "Discord bot token is required");
    }
}

fn validate_commands(config: &StatusKeeperConfig, report: &mut ValidationReport) {
    validate_token(config, report);
    match config.discord.application_id {
        None => report.error("discord.applicationId", "applicationId is required to register commands"),
        Some(0) => report.error("discord.applicationId", "applicationId must be non-zero"),
        Some(_) => {}
    }
}

fn validate_gateway(config: &StatusKeeperConfig, report: &mut ValidationReport) {
    validate_token(config, report);
    let discord = &config.discord;
    match discord.application_id {
        None => report.warn(
            "discord.applicationId",
            "No application id; /statusstats will not be registered",
        ),
        Some(0) => report.error("discord.applicationId", "applicationId must be non-zero"),
        Some(_) => {}
    }
    match discord.log_channel_id {
        None => report.warn(
            "discord.logChannelId",
            "No log channel; status changes will not be announced",
        ),
        Some(0) => report.error("discord.logChannelId", "logChannelId must be non-zero"),
        Some(_) => {}
    }
}

fn validate_storage(config: &StatusKeeperConfig, report: &mut ValidationReport) {
    match config.storage.path.as_deref().map(str::trim) {
        None | Some("") => report.error("storage.path", "Storage path cannot be empty"),
        Some(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> StatusKeeperConfig {
        let mut cfg = StatusKeeperConfig::default();
        cfg.discord.token = Some("token".into());
        cfg.discord.application_id = Some(1);
        cfg.discord.log_channel_id = Some(2);
        cfg.storage.path = Some("status.db".into());
        cfg
    }

    #[test]
    fn complete_config_is_clean() {
        for scope in [ValidationScope::Storage, ValidationScope::Gateway, ValidationScope::Commands] {
            let report = validate(&complete(), scope);
            assert!(report.is_valid(), "{scope:?}");
            assert!(report.warnings.is_empty(), "{scope:?}");
        }
    }

    #[test]
    fn missing_token_is_an_error_for_discord_scopes() {
        let mut cfg = complete();
        cfg.discord.token = Some("  ".into());

        let report = validate(&cfg, ValidationScope::Gateway);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "discord.token");
        assert!(!validate(&cfg, ValidationScope::Commands).is_valid());
    }

    #[test]
    fn storage_scope_ignores_discord_settings() {
        let mut cfg = complete();
        cfg.discord = Default::default();
        let report = validate(&cfg, ValidationScope::Storage);
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn missing_ids_only_warn_for_gateway() {
        let mut cfg = complete();
        cfg.discord.application_id = None;
        cfg.discord.log_channel_id = None;
        let report = validate(&cfg, ValidationScope::Gateway);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn command_registration_needs_application_id() {
        let mut cfg = complete();
        cfg.discord.application_id = None;
        let report = validate(&cfg, ValidationScope::Commands);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "discord.applicationId");
    }

    #[test]
    fn zero_ids_are_errors() {
        let mut cfg = complete();
        cfg.discord.log_channel_id = Some(0);
        assert!(!validate(&cfg, ValidationScope::Gateway).is_valid());
    }

    #[test]
    fn empty_storage_path_is_an_error_everywhere() {
        let mut cfg = complete();
        cfg.storage.path = Some(String::new());
        for scope in [ValidationScope::Storage, ValidationScope::Gateway, ValidationScope::Commands] {
            let report = validate(&cfg, scope);
            assert!(!report.is_valid(), "{scope:?}");
            assert_eq!(report.errors[0].path, "storage.path");
        }
    }
}
