//! Config file discovery and reading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the StatusKeeper config directory.
/// Priority: `STATUSKEEPER_CONFIG_DIR` env > `~/.statuskeeper/` > `./.statuskeeper`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("STATUSKEEPER_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".statuskeeper"),
        None => PathBuf::from(".statuskeeper"),
    }
}

/// Resolve the full path to the main config file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read the YAML config as an untyped tree, ready for env substitution.
///
/// Returns an empty object if the file doesn't exist (first run).
pub async fn load_raw_config(path: &Path) -> Result<Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Value::Object(serde_json::Map::new()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let value: Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    // An empty file parses as null.
    Ok(if value.is_null() { Value::Object(serde_json::Map::new()) } else { value })
}
