use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<u64>,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),

    #[error("Invalid task file: {0}")]
    InvalidTask(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Sync failed: {0}")]
    SyncFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SyncError {
    /// True when a caller may branch on "file absent" rather than abort.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
