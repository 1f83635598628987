//! `statuskeeper-config`: StatusKeeper runtime configuration management.
//!
//! Provides:
//! - Typed config schema (Discord credentials, storage, logging)
//! - YAML reading with `${ENV_VAR}` substitution
//! - Fixed env var overrides
//! - Default value application
//! - Validation and redaction for safe logging

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

// Re-export most-used types at crate root.
pub use defaults::apply_all_defaults;
pub use env::{apply_env_overrides, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_raw_config};
pub use redact::redact;
pub use schema::{DiscordConfig, LoggingConfig, StatusKeeperConfig, StorageConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport, ValidationScope};

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

/// Load, substitute env vars, then apply overrides and defaults.
///
/// This is the main entry point for loading a config at runtime. It runs before
/// the logger exists, so validation is left to the caller (see [`validate`]).
pub async fn load_and_prepare(path: &Path) -> Result<StatusKeeperConfig> {
    load_and_prepare_with(path, &std::env::vars().collect()).await
}

/// [`load_and_prepare`] against an explicit environment.
pub async fn load_and_prepare_with(
    path: &Path,
    env: &HashMap<String, String>,
) -> Result<StatusKeeperConfig> {
    let value = load_raw_config(path).await?;

    // Substitute ${VAR} env vars.
    let value = resolve_env_vars_with(&value, env).context("Failed to resolve env vars in config")?;

    let config: StatusKeeperConfig =
        serde_json::from_value(value).context("Failed to deserialize config")?;

    let config = env::apply_env_overrides_with(config, env);
    Ok(apply_all_defaults(config))
}
