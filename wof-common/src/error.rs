//! Common error types for WOF

use thiserror::Error;

/// Common result type for WOF operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across WOF crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Encoded payload could not be decoded to bytes
    #[error("Payload decode error: {0}")]
    Payload(String),
}
