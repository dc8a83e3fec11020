//! Pool event types and EventBus
//!
//! The media player pool reports lifecycle changes through a broadcast
//! channel instead of a global notification center. Each subscriber owns its
//! receiver; dropping the receiver is the unsubscription.

use crate::models::CardId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Why the pool tore a handle down on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionReason {
    /// Live count exceeded capacity; least recently used non-visible handle chosen
    Capacity,
    /// Non-visible handle sat unused longer than the idle limit
    Idle,
    /// System-wide low memory; visibility ignored
    MemoryPressure,
    /// Preparation finished after every caller had stopped waiting
    Abandoned,
    /// Pool shutdown
    Shutdown,
}

/// Pool lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PoolEvent {
    /// A handle was returned from `acquire`
    HandleAcquired {
        card_id: CardId,
        /// True when an existing live handle was reused
        reused: bool,
        /// Live handles after the acquire
        live_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The pool evicted a handle
    HandleEvicted {
        card_id: CardId,
        reason: EvictionReason,
        /// Time since the handle was last used
        idle_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The caller released a handle explicitly
    HandleReleased {
        card_id: CardId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Payload could not be turned into a playable handle
    ///
    /// The card should fall back to its poster image.
    MediaCreationFailed {
        card_id: CardId,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// `acquire` went past nominal capacity because every live handle was visible
    CapacityOverrun {
        card_id: CardId,
        live_count: usize,
        capacity: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Best-effort teardown step failed (logged, never propagated)
    TeardownFailed {
        card_id: CardId,
        stage: TeardownStage,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Memory pressure sweep completed
    MemoryPressure {
        evicted: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Teardown step that can fail without blocking eviction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownStage {
    StopPlayback,
    DeleteArtifact,
}

impl PoolEvent {
    /// Card the event refers to (None for pool-wide events)
    pub fn card_id(&self) -> Option<&CardId> {
        match self {
            PoolEvent::HandleAcquired { card_id, .. }
            | PoolEvent::HandleEvicted { card_id, .. }
            | PoolEvent::HandleReleased { card_id, .. }
            | PoolEvent::MediaCreationFailed { card_id, .. }
            | PoolEvent::CapacityOverrun { card_id, .. }
            | PoolEvent::TeardownFailed { card_id, .. } => Some(card_id),
            PoolEvent::MemoryPressure { .. } => None,
        }
    }
}

/// Broadcast bus for pool events
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PoolEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all current subscribers
    ///
    /// Having no subscribers is not an error; the event is dropped.
    pub fn emit(&self, event: PoolEvent) {
        let _ = self.tx.send(event);
    }
}
