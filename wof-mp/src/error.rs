//! Error types for wof-mp
//!
//! Only `MediaCreation` ever reaches the user (as a poster-image fallback).
//! Teardown and capacity problems are warnings: they are logged and emitted
//! as pool events, never returned.

use thiserror::Error;

/// Main error type for wof-mp
#[derive(Error, Debug)]
pub enum Error {
    /// Payload is not playable media; caller falls back to the poster image
    #[error("Media creation error: {0}")]
    MediaCreation(String),

    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the shared library (config, payload decoding)
    #[error(transparent)]
    Common(#[from] wof_common::Error),

    /// Card was released while its player was being prepared
    #[error("Card {0} was released before its player was ready")]
    Released(String),

    /// Pool has been shut down
    #[error("Media player pool is shutting down")]
    ShuttingDown,

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using wof-mp Error
pub type Result<T> = std::result::Result<T, Error>;
