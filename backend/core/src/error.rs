use thiserror::Error;

/// Top-level error type for the StatusKeeper runtime.
#[derive(Debug, Error)]
pub enum KeeperError {
    #[error("unknown presence status: {0}")]
    UnknownStatus(String),

    #[error("invalid user id: {0}")]
    InvalidUserId(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("channel closed: {0}")]
    ChannelClosed(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
