//! Error types shared across the engine
//!
//! None of these are fatal to a running session: callers log them and fall
//! back to local state or defaults.

use thiserror::Error;

/// Local key/value storage failures
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write key `{key}`: {reason}")]
    Write { key: String, reason: String },
    #[error("failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Remote progress store failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("server returned HTTP {0}")]
    Status(u16),
    #[error("malformed response body: {0}")]
    Malformed(String),
    #[error("server rejected request: {}", .0.as_deref().unwrap_or("no message"))]
    Rejected(Option<String>),
}

/// Configuration parse/validation failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
