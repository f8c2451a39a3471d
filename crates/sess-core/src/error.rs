//! Error types for sess-core

use thiserror::Error;

/// Main error type for sess-core
#[derive(Error, Debug)]
pub enum Error {
    /// The store was built with missing or invalid options
    #[error("Configuration error: {0}")]
    Config(String),

    /// A write was attempted with an unusable session id
    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database connection lock poisoned")]
    LockPoisoned,

    #[error("Invalid expiry timestamp: {0}")]
    InvalidExpiry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error came from the backing storage rather than from setup
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Json(_) | Self::LockPoisoned | Self::InvalidExpiry(_)
        )
    }
}

/// Result type alias for sess-core
pub type Result<T> = std::result::Result<T, Error>;
