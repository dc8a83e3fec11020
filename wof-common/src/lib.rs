//! # WOF Common Library
//!
//! Shared code for the WOF client crates including:
//! - Error types
//! - Bootstrap configuration loading (TOML + environment)
//! - Pool event types and the EventBus
//! - Outfit record models
//! - Encoded media payload decoding

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod payload;

pub use error::{Error, Result};
pub use events::{EventBus, EvictionReason, PoolEvent, TeardownStage};
pub use models::CardId;
