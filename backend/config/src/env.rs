//! Environment variable substitution and overrides for config values.
//!
//! `${VAR_NAME}` in any string value is replaced at load time. Only uppercase
//! `[A-Z_][A-Z0-9_]*` names are matched, and `$${VAR}` yields a literal `${VAR}`.
//! After parsing, a fixed set of env vars overrides individual fields.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::schema::StatusKeeperConfig;

/// `$${NAME}` (escaped) or `${NAME}`.
static ENV_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env reference pattern"));

pub const ENV_TOKEN: &str = "DISCORD_TOKEN";
pub const ENV_APPLICATION_ID: &str = "STATUSKEEPER_APPLICATION_ID";
pub const ENV_LOG_CHANNEL_ID: &str = "STATUSKEEPER_LOG_CHANNEL_ID";
pub const ENV_DB: &str = "STATUSKEEPER_DB";
pub const ENV_LOG_LEVEL: &str = "STATUSKEEPER_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "STATUSKEEPER_LOG_DIR";

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references in a config value tree from the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value, MissingEnvVarError> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute env vars using a provided map (useful for testing).
pub fn resolve_env_vars_with(
    value: &Value,
    env: &HashMap<String, String>,
) -> Result<Value, MissingEnvVarError> {
    substitute(value, env, "")
}

fn substitute(
    value: &Value,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<Value, MissingEnvVarError> {
    Ok(match value {
        Value::String(s) => Value::String(substitute_str(s, env, path)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| substitute(v, env, &format!("{path}[{i}]")))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, v) in map {
                let child = if path.is_empty() { key.clone() } else { format!("{path}.{key}") };
                out.insert(key.clone(), substitute(v, env, &child)?);
            }
            Value::Object(out)
        }
        other => other.clone(),
    })
}

fn substitute_str(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String, MissingEnvVarError> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }

    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for caps in ENV_REF.captures_iter(s) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        out.push_str(&s[last..whole.start()]);
        last = whole.end();

        let escaped = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        if escaped {
            out.push_str(&format!("${{{}}}", name.as_str()));
            continue;
        }
        match env.get(name.as_str()) {
            Some(val) if !val.is_empty() => out.push_str(val),
            _ => {
                return Err(MissingEnvVarError {
                    var_name: name.as_str().to_string(),
                    config_path: path.to_string(),
                })
            }
        }
    }
    out.push_str(&s[last..]);
    Ok(out)
}

/// Apply fixed env var overrides on top of a parsed config.
pub fn apply_env_overrides(config: StatusKeeperConfig) -> StatusKeeperConfig {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

pub fn apply_env_overrides_with(
    mut config: StatusKeeperConfig,
    env: &HashMap<String, String>,
) -> StatusKeeperConfig {
    let get = |key: &str| env.get(key).filter(|v| !v.trim().is_empty()).cloned();

    if let Some(token) = get(ENV_TOKEN) {
        config.discord.token = Some(token);
    }
    if let Some(id) = get(ENV_APPLICATION_ID) {
        match id.trim().parse() {
            Ok(id) => config.discord.application_id = Some(id),
            Err(_) => tracing::warn!(var = ENV_APPLICATION_ID, "Ignoring non-numeric application id"),
        }
    }
    if let Some(id) = get(ENV_LOG_CHANNEL_ID) {
        match id.trim().parse() {
            Ok(id) => config.discord.log_channel_id = Some(id),
            Err(_) => tracing::warn!(var = ENV_LOG_CHANNEL_ID, "Ignoring non-numeric log channel id"),
        }
    }
    if let Some(path) = get(ENV_DB) {
        config.storage.path = Some(path);
    }
    if let Some(level) = get(ENV_LOG_LEVEL) {
        config.logging.level = Some(level);
    }
    if let Some(dir) = get(ENV_LOG_DIR) {
        config.logging.dir = Some(dir);
    }
    config
}
