//! # WOF Media Player Pool (wof-mp)
//!
//! Bounded pool of media players for auto-playing video cards in the outfit
//! feeds.
//!
//! **Purpose:** Cap the number of live players (playback session + temp
//! file) while a feed scrolls, keep the visible card's player available,
//! evict least recently used hidden players first, and release every
//! resource the pool created.
//!
//! **Architecture:** One `MediaPlayerPool` owned by the composition root,
//! preparation on the blocking pool, symphonia container probing, periodic
//! idle sweep.

pub mod config;
pub mod error;
pub mod feed;
pub mod media;
pub mod pool;

pub use config::{Config, ConfigOverrides, PoolConfig};
pub use error::{Error, Result};
pub use pool::{HandleSnapshot, HandleState, MediaHandle, MediaPlayerPool};
pub use wof_common::CardId;
