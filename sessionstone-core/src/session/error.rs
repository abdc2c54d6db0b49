//! Session error type

use std::time::Duration;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors raised by stores, coders and the session middleware
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    /// The store has no live record for the requested key
    #[error("session not found")]
    NotFound,
    #[error("store error: {0}")]
    Store(String),
    #[error("codec error: {0}")]
    Codec(String),
    #[error("invalid session configuration: {0}")]
    Config(String),
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("sqlite pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// True when the error means "no such session" rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::NotFound)
    }
}
