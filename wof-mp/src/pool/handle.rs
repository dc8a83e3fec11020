//! Media handles
//!
//! `MediaHandle` is what callers hold: a cheap clone pointing at the shared
//! prepared media. The decoder session and the temp artifact live in the
//! pool's `Entry` and are never handed out.

use crate::media::{MediaInfo, PlaybackPolicy, PlaybackSession, TempArtifact};
use crate::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use wof_common::{CardId, TeardownStage};

/// Handle lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleState {
    /// Session built, not yet played (not guaranteed playable until played)
    Prepared,
    Playing,
    Paused,
    /// Resources released; the handle is dead
    Evicted,
}

impl HandleState {
    fn to_u8(self) -> u8 {
        match self {
            HandleState::Prepared => 0,
            HandleState::Playing => 1,
            HandleState::Paused => 2,
            HandleState::Evicted => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => HandleState::Prepared,
            1 => HandleState::Playing,
            2 => HandleState::Paused,
            _ => HandleState::Evicted,
        }
    }
}

struct SharedMedia {
    id: CardId,
    path: PathBuf,
    info: MediaInfo,
    state: AtomicU8,
}

/// Caller-facing reference to a pooled player
#[derive(Clone)]
pub struct MediaHandle {
    shared: Arc<SharedMedia>,
}

impl MediaHandle {
    fn new(id: CardId, path: PathBuf, info: MediaInfo) -> Self {
        Self {
            shared: Arc::new(SharedMedia {
                id,
                path,
                info,
                state: AtomicU8::new(HandleState::Prepared.to_u8()),
            }),
        }
    }

    pub fn id(&self) -> &CardId {
        &self.shared.id
    }

    /// Temp artifact backing this handle (gone once evicted)
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub fn info(&self) -> &MediaInfo {
        &self.shared.info
    }

    pub fn state(&self) -> HandleState {
        HandleState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn is_evicted(&self) -> bool {
        self.state() == HandleState::Evicted
    }

    /// True when both handles point at the same backing resource
    pub fn same_resource(&self, other: &MediaHandle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    fn set_state(&self, state: HandleState) {
        self.shared.state.store(state.to_u8(), Ordering::Release);
    }
}

impl fmt::Debug for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaHandle")
            .field("id", &self.shared.id)
            .field("state", &self.state())
            .field("path", &self.shared.path)
            .finish()
    }
}

/// Point-in-time view of one live entry
#[derive(Debug, Clone, PartialEq)]
pub struct HandleSnapshot {
    pub id: CardId,
    pub state: HandleState,
    pub visible: bool,
    /// Time since last use
    pub idle: Duration,
    pub path: PathBuf,
}

/// One failed best-effort teardown step
#[derive(Debug, Clone)]
pub(crate) struct TeardownFailure {
    pub stage: TeardownStage,
    pub message: String,
}

/// Pool-owned entry: exclusive owner of the session and artifact
pub(crate) struct Entry {
    handle: MediaHandle,
    session: Box<dyn PlaybackSession>,
    artifact: TempArtifact,
    pub visible: bool,
    pub last_used_at: Instant,
    /// Monotonic use counter; breaks ties between equal timestamps
    pub last_used_seq: u64,
}

impl Entry {
    pub fn new(
        id: CardId,
        session: Box<dyn PlaybackSession>,
        artifact: TempArtifact,
        info: MediaInfo,
        now: Instant,
        seq: u64,
    ) -> Self {
        let handle = MediaHandle::new(id, artifact.path().to_path_buf(), info);
        Self {
            handle,
            session,
            artifact,
            visible: false,
            last_used_at: now,
            last_used_seq: seq,
        }
    }

    pub fn handle(&self) -> &MediaHandle {
        &self.handle
    }

    pub fn id(&self) -> &CardId {
        self.handle.id()
    }

    pub fn state(&self) -> HandleState {
        self.handle.state()
    }

    pub fn touch(&mut self, now: Instant, seq: u64) {
        self.last_used_at = now;
        self.last_used_seq = seq;
    }

    pub fn idle(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_used_at)
    }

    pub fn play(&mut self, policy: &PlaybackPolicy, now: Instant, seq: u64) -> Result<()> {
        self.session.play(policy)?;
        self.handle.set_state(HandleState::Playing);
        self.touch(now, seq);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.session.pause()?;
        self.handle.set_state(HandleState::Paused);
        Ok(())
    }

    pub fn snapshot(&self, now: Instant) -> HandleSnapshot {
        HandleSnapshot {
            id: self.id().clone(),
            state: self.state(),
            visible: self.visible,
            idle: self.idle(now),
            path: self.artifact.path().to_path_buf(),
        }
    }

    /// Stop the session and delete the artifact
    ///
    /// Every step runs even if an earlier one failed. Failures are returned
    /// for logging; the handle is marked evicted regardless.
    pub fn teardown(&mut self) -> Vec<TeardownFailure> {
        let mut failures = Vec::new();
        if self.state() == HandleState::Evicted {
            return failures;
        }

        if let Err(e) = self.session.stop() {
            failures.push(TeardownFailure {
                stage: TeardownStage::StopPlayback,
                message: e.to_string(),
            });
        }
        if let Err(e) = self.artifact.remove() {
            failures.push(TeardownFailure {
                stage: TeardownStage::DeleteArtifact,
                message: format!("{}: {}", self.artifact.path().display(), e),
            });
        }
        self.handle.set_state(HandleState::Evicted);
        failures
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("handle", &self.handle)
            .field("visible", &self.visible)
            .field("last_used_seq", &self.last_used_seq)
            .finish()
    }
}
