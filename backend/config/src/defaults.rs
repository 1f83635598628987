//! Config defaults: fills unset values after loading.

use crate::schema::StatusKeeperConfig;

/// Default SQLite database path.
pub const DEFAULT_DB_PATH: &str = "status.db";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: StatusKeeperConfig) -> StatusKeeperConfig {
    let config = apply_storage_defaults(config);
    apply_logging_defaults(config)
}

fn apply_storage_defaults(mut config: StatusKeeperConfig) -> StatusKeeperConfig {
    if config.storage.path.is_none() {
        config.storage.path = Some(DEFAULT_DB_PATH.to_string());
    }
    config
}

fn apply_logging_defaults(mut config: StatusKeeperConfig) -> StatusKeeperConfig {
    if config.logging.level.is_none() {
        config.logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    config
}
