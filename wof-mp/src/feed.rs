//! Feed scroll replay
//!
//! Drives a `MediaPlayerPool` the way a feed view does while the user
//! scrolls: the card arriving on screen is acquired and played while the
//! card leaving is paused and hidden. Cards that fall more than
//! `release_window` positions behind are released. Cards whose payload
//! cannot be played fall back to their poster image.

use crate::error::{Error, Result};
use crate::pool::MediaPlayerPool;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wof_common::models::Outfit;
use wof_common::payload::decode_payload;
use wof_common::{CardId, EvictionReason, PoolEvent};

/// Counts reported at the end of a replay
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedSummary {
    pub cards: usize,
    /// Cards that got a playing player
    pub played: usize,
    /// Cards shown as a poster image instead
    pub fallbacks: usize,
    pub released: usize,
    pub events: EventTally,
}

/// Pool events observed during a replay
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventTally {
    pub acquired: usize,
    pub reused: usize,
    pub evicted_capacity: usize,
    pub evicted_idle: usize,
    pub evicted_other: usize,
    pub creation_failures: usize,
    pub capacity_overruns: usize,
    pub teardown_failures: usize,
    /// Events dropped because the collector fell behind
    pub lagged: u64,
}

impl EventTally {
    fn record(&mut self, event: &PoolEvent) {
        match event {
            PoolEvent::HandleAcquired { reused: true, .. } => self.reused += 1,
            PoolEvent::HandleAcquired { reused: false, .. } => self.acquired += 1,
            PoolEvent::HandleEvicted { reason, .. } => match reason {
                EvictionReason::Capacity => self.evicted_capacity += 1,
                EvictionReason::Idle => self.evicted_idle += 1,
                _ => self.evicted_other += 1,
            },
            PoolEvent::MediaCreationFailed { .. } => self.creation_failures += 1,
            PoolEvent::CapacityOverrun { .. } => self.capacity_overruns += 1,
            PoolEvent::TeardownFailed { .. } => self.teardown_failures += 1,
            PoolEvent::HandleReleased { .. } | PoolEvent::MemoryPressure { .. } => {}
        }
    }
}

/// Collects pool events on a background task until stopped
struct EventCollector {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<EventTally>,
}

impl EventCollector {
    fn spawn(mut rx: broadcast::Receiver<PoolEvent>) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let mut tally = EventTally::default();
            loop {
                tokio::select! {
                    biased;
                    received = rx.recv() => match received {
                        Ok(event) => tally.record(&event),
                        Err(broadcast::error::RecvError::Lagged(n)) => tally.lagged += n,
                        Err(broadcast::error::RecvError::Closed) => return tally,
                    },
                    _ = &mut stop_rx => break,
                }
            }
            // Drain whatever was emitted before the stop signal
            loop {
                match rx.try_recv() {
                    Ok(event) => tally.record(&event),
                    Err(broadcast::error::TryRecvError::Lagged(n)) => tally.lagged += n,
                    Err(_) => break,
                }
            }
            tally
        });
        Self { stop_tx, task }
    }

    async fn finish(self) -> EventTally {
        let _ = self.stop_tx.send(());
        match self.task.await {
            Ok(tally) => tally,
            Err(e) => {
                warn!("Event collector ended abnormally: {}", e);
                EventTally::default()
            }
        }
    }
}

/// One scroll pass over a feed
pub struct ScrollSession {
    pool: MediaPlayerPool,
    release_window: usize,
    dwell: Duration,
}

impl ScrollSession {
    /// `dwell` is how long each card stays on screen
    pub fn new(pool: MediaPlayerPool, release_window: usize, dwell: Duration) -> Self {
        Self {
            pool,
            release_window,
            dwell,
        }
    }

    /// Scroll through `outfits` top to bottom, then shut the pool down
    ///
    /// The pool is shut down and the event tally collected even when the
    /// scroll stops early on an error.
    pub async fn run(&self, outfits: &[Outfit]) -> Result<FeedSummary> {
        let collector = EventCollector::spawn(self.pool.subscribe());
        let mut summary = FeedSummary {
            cards: outfits.len(),
            ..Default::default()
        };

        let scrolled = self.scroll(outfits, &mut summary).await;

        self.pool.shutdown().await;
        summary.events = collector.finish().await;

        if let Err(e) = scrolled {
            warn!(
                "Feed replay stopped: {} ({} played, {} fallback(s) before stopping)",
                e, summary.played, summary.fallbacks
            );
            return Err(e);
        }

        info!(
            "Feed replay finished: {} card(s), {} played, {} fallback(s), {} released",
            summary.cards, summary.played, summary.fallbacks, summary.released
        );
        Ok(summary)
    }

    async fn scroll(&self, outfits: &[Outfit], summary: &mut FeedSummary) -> Result<()> {
        let ids: Vec<CardId> = outfits.iter().map(Outfit::card_id).collect();
        for (index, outfit) in outfits.iter().enumerate() {
            if index > 0 {
                self.scroll_away(&ids[index - 1]).await;
            }
            if index > self.release_window {
                let gone = &ids[index - self.release_window - 1];
                if self.pool.release(gone).await {
                    debug!("Released {} (scrolled out of window)", gone);
                    summary.released += 1;
                }
            }

            if self.show(&ids[index], outfit).await? {
                summary.played += 1;
            } else {
                summary.fallbacks += 1;
            }

            if !self.dwell.is_zero() {
                tokio::time::sleep(self.dwell).await;
            }
        }
        if let Some(last) = ids.last() {
            self.scroll_away(last).await;
        }
        Ok(())
    }

    /// Bring a card on screen; false means it fell back to its poster
    async fn show(&self, id: &CardId, outfit: &Outfit) -> Result<bool> {
        let payload = match decode_payload(&outfit.image_data) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("{}: undecodable payload, fallback to poster ({})", id, e);
                return Ok(false);
            }
        };

        let declares_image = payload.declares_image();
        match self.pool.acquire(id.clone(), payload.bytes).await {
            Ok(handle) => {
                self.pool.mark_visible(id).await;
                self.pool.play(id).await;
                debug!("{}: playing {}", id, handle.path().display());
                Ok(true)
            }
            Err(Error::MediaCreation(message)) => {
                if declares_image {
                    debug!("{}: still image, showing poster", id);
                } else {
                    info!("{}: fallback to poster ({})", id, message);
                }
                Ok(false)
            }
            Err(Error::Released(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn scroll_away(&self, id: &CardId) {
        if self.pool.contains(id).await {
            self.pool.pause(id).await;
            self.pool.mark_hidden(id).await;
        }
    }
}
