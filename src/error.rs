use thiserror::Error;

/// Failures of the generative model collaborator. Always recovered by the caller.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generative model is disabled")]
    Disabled,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("empty response from model")]
    Empty,
}

/// Failures of the per-user memory store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("memory io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("memory encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Failures of the conversation log.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("conversation log error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Log(#[from] LogError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}
