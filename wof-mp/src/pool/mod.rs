//! Bounded media player pool
//!
//! - `player_pool`: the pool and its public operations
//! - `handle`: caller-facing handles and the pool-owned entries behind them
//! - `eviction`: least-recently-used candidate selection
//! - `sweeper`: periodic capacity + idle sweep

pub mod eviction;
pub mod handle;
pub mod player_pool;
mod sweeper;

pub use handle::{HandleSnapshot, HandleState, MediaHandle};
pub use player_pool::{MediaPlayerPool, SweepReport};
