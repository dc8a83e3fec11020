//! Media Player Pool
//!
//! Bounds the number of live players (session + temp artifact) no matter how
//! many feed cards ask for one, keeps visible cards' players available, and
//! evicts least recently used hidden players first.
//!
//! All entry mutation goes through one `RwLock` owned by the pool. Timer
//! ticks and preparation completions take the same lock, so capacity and
//! eviction order are only ever evaluated by one writer at a time. The lock
//! is never held while a payload is written to disk or probed.

use super::eviction::{self, Candidate};
use super::handle::{Entry, HandleSnapshot, HandleState, MediaHandle};
use super::sweeper::Sweeper;
use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::media::{
    sniff, ContainerFormat, MediaBackend, PayloadKind, PreparedSession, SymphoniaBackend,
    TempArtifact,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot, Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use wof_common::{CardId, EventBus, EvictionReason, PoolEvent};

/// Why an in-flight acquire did not produce a handle
#[derive(Debug, Clone)]
enum AcquireFailure {
    Creation(String),
    Released,
    ShuttingDown,
    /// Every acquiring caller went away before the player was ready
    Abandoned,
}

type AcquireOutcome = std::result::Result<MediaHandle, AcquireFailure>;

/// Preparation in progress for one card id
struct PendingAcquire {
    waiters: Vec<oneshot::Sender<AcquireOutcome>>,
    /// `release` arrived while preparing; tear the result down
    released: bool,
}

#[derive(Default)]
struct PoolState {
    entries: HashMap<CardId, Entry>,
    pending: HashMap<CardId, PendingAcquire>,
    use_seq: u64,
}

impl PoolState {
    fn next_seq(&mut self) -> u64 {
        self.use_seq += 1;
        self.use_seq
    }

    fn candidates(&self) -> impl Iterator<Item = Candidate<'_>> {
        self.entries.values().map(|entry| Candidate {
            id: entry.id(),
            visible: entry.visible,
            last_used_at: entry.last_used_at,
            last_used_seq: entry.last_used_seq,
        })
    }

    fn all_visible(&self) -> bool {
        self.entries.values().all(|e| e.visible)
    }
}

/// Ids evicted by one sweep pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub capacity_evicted: Vec<CardId>,
    pub idle_evicted: Vec<CardId>,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.capacity_evicted.len() + self.idle_evicted.len()
    }
}

pub(crate) struct PoolInner {
    config: PoolConfig,
    temp_dir: PathBuf,
    backend: Arc<dyn MediaBackend>,
    state: RwLock<PoolState>,
    events: EventBus,
    shutting_down: AtomicBool,
    sweeper: Mutex<Option<Sweeper>>,
}

/// Bounded pool of media players keyed by card id
///
/// Cloning is cheap and yields another reference to the same pool. Build one
/// pool in the composition root and hand clones to the views that need it.
#[derive(Clone)]
pub struct MediaPlayerPool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for MediaPlayerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPlayerPool")
            .field("capacity", &self.inner.config.capacity)
            .field("backend", &self.inner.backend.name())
            .field("temp_dir", &self.inner.temp_dir)
            .finish()
    }
}

impl MediaPlayerPool {
    /// Create a pool with the symphonia backend
    pub fn new(config: PoolConfig) -> Result<Self> {
        Self::with_backend(config, Arc::new(SymphoniaBackend::new()))
    }

    /// Create a pool with a custom playback backend
    ///
    /// Validates the config and creates the temp artifact directory. The
    /// background sweep is not started; see `start_sweeper`.
    pub fn with_backend(config: PoolConfig, backend: Arc<dyn MediaBackend>) -> Result<Self> {
        config.validate()?;

        let temp_dir = config.temp_dir();
        std::fs::create_dir_all(&temp_dir)?;

        info!(
            "Media player pool created: capacity={}, max_idle={}s, backend={}, temp_dir={}",
            config.capacity,
            config.max_idle_secs,
            backend.name(),
            temp_dir.display()
        );

        let events = EventBus::new(config.event_capacity);
        Ok(Self {
            inner: Arc::new(PoolInner {
                config,
                temp_dir,
                backend,
                state: RwLock::new(PoolState::default()),
                events,
                shutting_down: AtomicBool::new(false),
                sweeper: Mutex::new(None),
            }),
        })
    }

    /// Start the periodic capacity + idle sweep
    ///
    /// Idempotent. Stops on `shutdown` or when the last pool clone is dropped.
    pub async fn start_sweeper(&self) {
        let mut sweeper = self.inner.sweeper.lock().await;
        if sweeper.is_some() {
            return;
        }
        *sweeper = Some(Sweeper::spawn(
            Arc::downgrade(&self.inner),
            self.inner.config.sweep_interval(),
        ));
        debug!(
            "Sweeper started (interval={}s)",
            self.inner.config.sweep_interval_secs
        );
    }

    /// Get a player for `id`, creating one from `source_bytes` if needed
    ///
    /// A live handle for `id` is returned as-is (and counts as a use).
    /// Otherwise the payload is prepared off the caller's task; concurrent
    /// acquires of the same id share that preparation. Capacity is soft: if
    /// every live handle is visible the new handle is still admitted.
    ///
    /// # Errors
    /// - `MediaCreation`: payload is a still image or not playable media
    /// - `Released`: the id was released while its player was being prepared
    /// - `ShuttingDown`: the pool is shutting down
    pub async fn acquire(
        &self,
        id: impl Into<CardId>,
        source_bytes: Vec<u8>,
    ) -> Result<MediaHandle> {
        let id = id.into();
        if self.inner.is_shutting_down() {
            return Err(Error::ShuttingDown);
        }

        let rx = {
            let mut state = self.inner.state.write().await;

            let seq = state.next_seq();
            if let Some(entry) = state.entries.get_mut(&id) {
                entry.touch(Instant::now(), seq);
                let handle = entry.handle().clone();
                let live_count = state.entries.len();
                debug!("Reusing live player for {}", id);
                self.inner.events.emit(PoolEvent::HandleAcquired {
                    card_id: id,
                    reused: true,
                    live_count,
                    timestamp: chrono::Utc::now(),
                });
                return Ok(handle);
            }

            let (tx, rx) = oneshot::channel();
            if let Some(pending) = state.pending.get_mut(&id) {
                debug!("Joining in-flight preparation for {}", id);
                pending.released = false;
                pending.waiters.push(tx);
            } else {
                let format = match sniff(&source_bytes) {
                    PayloadKind::Container(format) => format,
                    PayloadKind::Image(image) => {
                        return Err(self.inner.creation_failed(
                            &id,
                            format!("payload is a still image ({:?})", image),
                        ));
                    }
                    PayloadKind::Unknown => {
                        return Err(self
                            .inner
                            .creation_failed(&id, "unrecognised media container".to_string()));
                    }
                };

                state.pending.insert(
                    id.clone(),
                    PendingAcquire {
                        waiters: vec![tx],
                        released: false,
                    },
                );
                let inner = Arc::clone(&self.inner);
                let card_id = id.clone();
                tokio::spawn(async move {
                    inner.prepare_and_admit(card_id, format, source_bytes).await;
                });
            }
            rx
        };

        match rx.await {
            Ok(Ok(handle)) => Ok(handle),
            Ok(Err(AcquireFailure::Creation(message))) => Err(Error::MediaCreation(message)),
            Ok(Err(AcquireFailure::Released)) => Err(Error::Released(id.to_string())),
            Ok(Err(AcquireFailure::ShuttingDown)) => Err(Error::ShuttingDown),
            Ok(Err(AcquireFailure::Abandoned)) | Err(_) => Err(Error::Internal(format!(
                "preparation for {} ended without a result",
                id
            ))),
        }
    }

    /// Flag the card as on screen; playback is unchanged
    ///
    /// Returns false (and does nothing) for unknown ids.
    pub async fn mark_visible(&self, id: &CardId) -> bool {
        self.set_visible(id, true).await
    }

    /// Flag the card as off screen; playback is unchanged
    pub async fn mark_hidden(&self, id: &CardId) -> bool {
        self.set_visible(id, false).await
    }

    async fn set_visible(&self, id: &CardId, visible: bool) -> bool {
        let mut state = self.inner.state.write().await;
        match state.entries.get_mut(id) {
            Some(entry) => {
                entry.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Start playback under the configured policy (muted by default)
    ///
    /// Counts as a use. Returns false for unknown ids. A session that refuses
    /// to play is logged and keeps its previous state.
    pub async fn play(&self, id: &CardId) -> bool {
        let mut state = self.inner.state.write().await;
        let seq = state.next_seq();
        let Some(entry) = state.entries.get_mut(id) else {
            return false;
        };
        if let Err(e) = entry.play(&self.inner.config.playback, Instant::now(), seq) {
            warn!("Failed to start playback for {}: {}", id, e);
        }
        true
    }

    /// Pause playback. Returns false for unknown ids.
    pub async fn pause(&self, id: &CardId) -> bool {
        let mut state = self.inner.state.write().await;
        let Some(entry) = state.entries.get_mut(id) else {
            return false;
        };
        if let Err(e) = entry.pause() {
            warn!("Failed to pause playback for {}: {}", id, e);
        }
        true
    }

    /// Mark a use without changing playback
    pub async fn touch(&self, id: &CardId) -> bool {
        let mut state = self.inner.state.write().await;
        let seq = state.next_seq();
        match state.entries.get_mut(id) {
            Some(entry) => {
                entry.touch(Instant::now(), seq);
                true
            }
            None => false,
        }
    }

    /// Tear down the player for a card that left the feed for good
    ///
    /// Ignores visibility. Idempotent: returns false when there was nothing
    /// live to release. A preparation still in flight for `id` is torn down
    /// as soon as it finishes.
    pub async fn release(&self, id: &CardId) -> bool {
        let mut state = self.inner.state.write().await;

        if let Some(pending) = state.pending.get_mut(id) {
            debug!("Release requested for {} while preparing", id);
            pending.released = true;
        }

        match state.entries.remove(id) {
            Some(mut entry) => {
                self.inner.teardown(&mut entry);
                debug!("Released player for {}", id);
                self.inner.events.emit(PoolEvent::HandleReleased {
                    card_id: id.clone(),
                    timestamp: chrono::Utc::now(),
                });
                true
            }
            None => false,
        }
    }

    /// Evict least recently used hidden handles until within capacity
    pub async fn evict_excess(&self) -> Vec<CardId> {
        let mut state = self.inner.state.write().await;
        self.inner.evict_excess_locked(&mut state)
    }

    /// Capacity pass followed by idle eviction of hidden handles
    pub async fn sweep(&self) -> SweepReport {
        self.inner.sweep().await
    }

    /// Evict every handle, visible or not
    ///
    /// Callers re-acquire the cards that are still on screen.
    pub async fn handle_memory_pressure(&self) -> usize {
        let mut state = self.inner.state.write().await;
        let ids: Vec<CardId> = state.entries.keys().cloned().collect();
        let evicted = self
            .inner
            .evict_ids(&mut state, ids, EvictionReason::MemoryPressure)
            .len();

        warn!("Memory pressure: evicted {} player(s)", evicted);
        self.inner.events.emit(PoolEvent::MemoryPressure {
            evicted,
            timestamp: chrono::Utc::now(),
        });
        evicted
    }

    /// Stop the sweeper and tear down every handle
    ///
    /// Later `acquire` calls fail with `ShuttingDown`; preparations still in
    /// flight are torn down when they finish.
    pub async fn shutdown(&self) {
        if self.inner.shutting_down.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(sweeper) = self.inner.sweeper.lock().await.take() {
            sweeper.stop().await;
        }

        let mut state = self.inner.state.write().await;
        for pending in state.pending.values_mut() {
            pending.released = true;
        }
        let ids: Vec<CardId> = state.entries.keys().cloned().collect();
        let evicted = self.inner.evict_ids(&mut state, ids, EvictionReason::Shutdown);
        info!(
            "Media player pool shut down ({} player(s) released)",
            evicted.len()
        );
    }

    /// Subscribe to pool events; drop the receiver to unsubscribe
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.inner.events.subscribe()
    }

    pub fn capacity(&self) -> usize {
        self.inner.config.capacity
    }

    pub fn temp_dir(&self) -> &Path {
        &self.inner.temp_dir
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.is_shutting_down()
    }

    /// Number of live (non-evicted) handles
    pub async fn live_count(&self) -> usize {
        self.inner.state.read().await.entries.len()
    }

    /// Number of preparations in flight
    pub async fn pending_count(&self) -> usize {
        self.inner.state.read().await.pending.len()
    }

    pub async fn contains(&self, id: &CardId) -> bool {
        self.inner.state.read().await.entries.contains_key(id)
    }

    /// State of a live handle (None when unknown or evicted)
    pub async fn state(&self, id: &CardId) -> Option<HandleState> {
        let state = self.inner.state.read().await;
        state.entries.get(id).map(|e| e.state())
    }

    pub async fn is_visible(&self, id: &CardId) -> Option<bool> {
        let state = self.inner.state.read().await;
        state.entries.get(id).map(|e| e.visible)
    }

    /// Live handles sorted by id
    pub async fn snapshot(&self) -> Vec<HandleSnapshot> {
        let state = self.inner.state.read().await;
        let now = Instant::now();
        let mut snapshots: Vec<HandleSnapshot> =
            state.entries.values().map(|e| e.snapshot(now)).collect();
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        snapshots
    }
}

impl PoolInner {
    fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Log + emit a creation failure and build the caller's error
    fn creation_failed(&self, id: &CardId, message: String) -> Error {
        debug!("Cannot create player for {}: {}", id, message);
        self.events.emit(PoolEvent::MediaCreationFailed {
            card_id: id.clone(),
            message: message.clone(),
            timestamp: chrono::Utc::now(),
        });
        Error::MediaCreation(message)
    }

    /// Write the artifact, build the session, then admit it under the lock
    ///
    /// Runs detached from the acquiring caller so an abandoned acquire still
    /// completes and gets cleaned up.
    async fn prepare_and_admit(
        self: Arc<Self>,
        id: CardId,
        format: ContainerFormat,
        bytes: Vec<u8>,
    ) {
        let backend = Arc::clone(&self.backend);
        let temp_dir = self.temp_dir.clone();
        let prepared = tokio::task::spawn_blocking(move || {
            prepare_blocking(backend.as_ref(), &temp_dir, &bytes, format)
        })
        .await
        .unwrap_or_else(|e| Err(Error::Internal(format!("preparation task failed: {}", e))));

        let mut state = self.state.write().await;
        let Some(pending) = state.pending.remove(&id) else {
            warn!("Preparation finished for {} with no pending record", id);
            return;
        };

        let (artifact, prepared) = match prepared {
            Ok(ok) => ok,
            Err(e) => {
                let message = match e {
                    Error::MediaCreation(message) => message,
                    other => other.to_string(),
                };
                let _ = self.creation_failed(&id, message.clone());
                for waiter in pending.waiters {
                    let _ = waiter.send(Err(AcquireFailure::Creation(message.clone())));
                }
                return;
            }
        };

        let seq = state.next_seq();
        let mut entry = Entry::new(
            id.clone(),
            prepared.session,
            artifact,
            prepared.info,
            Instant::now(),
            seq,
        );

        let waiters: Vec<_> = pending
            .waiters
            .into_iter()
            .filter(|w| !w.is_closed())
            .collect();

        if pending.released || self.is_shutting_down() || waiters.is_empty() {
            let failure = if self.is_shutting_down() {
                AcquireFailure::ShuttingDown
            } else if pending.released {
                AcquireFailure::Released
            } else {
                AcquireFailure::Abandoned
            };
            self.discard_fresh(&mut entry, &failure);
            for waiter in waiters {
                let _ = waiter.send(Err(failure.clone()));
            }
            return;
        }

        self.make_room_for(&mut state, &id);

        let handle = entry.handle().clone();
        state.entries.insert(id.clone(), entry);
        let live_count = state.entries.len();

        debug!("Admitted player for {} (live={})", id, live_count);
        self.events.emit(PoolEvent::HandleAcquired {
            card_id: id.clone(),
            reused: false,
            live_count,
            timestamp: chrono::Utc::now(),
        });

        let mut delivered = 0;
        for waiter in waiters {
            if waiter.send(Ok(handle.clone())).is_ok() {
                delivered += 1;
            }
        }

        if delivered == 0 {
            // Every caller went away between the check above and delivery
            if let Some(mut entry) = state.entries.remove(&id) {
                self.discard_fresh(&mut entry, &AcquireFailure::Abandoned);
            }
        }
    }

    /// Tear down a handle that was prepared but never handed out
    fn discard_fresh(&self, entry: &mut Entry, failure: &AcquireFailure) {
        debug!(
            "Discarding freshly prepared player for {} ({:?})",
            entry.id(),
            failure
        );
        self.teardown(entry);
        if matches!(failure, AcquireFailure::Abandoned) {
            self.events.emit(PoolEvent::HandleEvicted {
                card_id: entry.id().clone(),
                reason: EvictionReason::Abandoned,
                idle_ms: 0,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Free one slot for `incoming`, warning when only visible handles remain
    fn make_room_for(&self, state: &mut PoolState, incoming: &CardId) {
        let capacity = self.config.capacity;
        let live = state.entries.len();
        if live < capacity {
            return;
        }

        let ids = eviction::select_for_capacity(state.candidates(), live + 1, capacity);
        self.evict_ids(state, ids, EvictionReason::Capacity);

        let live = state.entries.len();
        if live >= capacity && state.all_visible() {
            warn!(
                "Capacity overrun admitting {}: {} live player(s), all visible (capacity {})",
                incoming, live, capacity
            );
            self.events.emit(PoolEvent::CapacityOverrun {
                card_id: incoming.clone(),
                live_count: live + 1,
                capacity,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    fn evict_excess_locked(&self, state: &mut PoolState) -> Vec<CardId> {
        let live = state.entries.len();
        let ids = eviction::select_for_capacity(state.candidates(), live, self.config.capacity);
        self.evict_ids(state, ids, EvictionReason::Capacity)
    }

    pub(crate) async fn sweep(&self) -> SweepReport {
        let mut state = self.state.write().await;
        let capacity_evicted = self.evict_excess_locked(&mut state);

        let idle =
            eviction::select_idle(state.candidates(), Instant::now(), self.config.max_idle());
        let idle_evicted = self.evict_ids(&mut state, idle, EvictionReason::Idle);

        let report = SweepReport {
            capacity_evicted,
            idle_evicted,
        };
        if report.total() > 0 {
            debug!(
                "Sweep evicted {} player(s) (capacity={:?}, idle={:?})",
                report.total(),
                report.capacity_evicted,
                report.idle_evicted
            );
        }
        report
    }

    /// Remove and tear down `ids`; returns the ids actually evicted
    fn evict_ids(
        &self,
        state: &mut PoolState,
        ids: Vec<CardId>,
        reason: EvictionReason,
    ) -> Vec<CardId> {
        let now = Instant::now();
        let mut evicted = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(mut entry) = state.entries.remove(&id) else {
                continue;
            };
            let idle = entry.idle(now);
            self.teardown(&mut entry);
            debug!("Evicted player for {} ({:?}, idle {:?})", id, reason, idle);
            self.events.emit(PoolEvent::HandleEvicted {
                card_id: id.clone(),
                reason,
                idle_ms: idle.as_millis() as u64,
                timestamp: chrono::Utc::now(),
            });
            evicted.push(id);
        }
        evicted
    }

    /// Best-effort teardown; failures are logged and emitted, never returned
    fn teardown(&self, entry: &mut Entry) {
        for failure in entry.teardown() {
            warn!(
                "Teardown of {} failed at {:?}: {}",
                entry.id(),
                failure.stage,
                failure.message
            );
            self.events.emit(PoolEvent::TeardownFailed {
                card_id: entry.id().clone(),
                stage: failure.stage,
                message: failure.message,
                timestamp: chrono::Utc::now(),
            });
        }
    }
}

/// Persist the payload and build the session (blocking thread pool)
fn prepare_blocking(
    backend: &dyn MediaBackend,
    temp_dir: &Path,
    bytes: &[u8],
    format: ContainerFormat,
) -> Result<(TempArtifact, PreparedSession)> {
    let mut artifact = TempArtifact::create(temp_dir, bytes, format.extension())
        .map_err(|e| Error::MediaCreation(format!("Failed to write temp artifact: {}", e)))?;

    match backend.prepare(artifact.path(), format) {
        Ok(prepared) => Ok((artifact, prepared)),
        Err(e) => {
            if let Err(rm) = artifact.remove() {
                warn!(
                    "Failed to delete artifact {} after failed preparation: {}",
                    artifact.path().display(),
                    rm
                );
            }
            Err(e)
        }
    }
}
