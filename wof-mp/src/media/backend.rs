//! Playback backend seam
//!
//! The pool never talks to a decoder directly. A `MediaBackend` builds a
//! `PlaybackSession` against a temp artifact; the pool owns the session
//! exclusively and drives it through play/pause/stop.

use super::sniff::ContainerFormat;
use crate::error::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Playback configuration applied on `play`
///
/// Defaults keep feed autoplay cheap: muted, 2 Mbps peak bitrate, 720p cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PlaybackPolicy {
    #[serde(default = "default_muted")]
    pub muted: bool,

    /// Peak bitrate in bits per second (None = unlimited)
    #[serde(default = "default_peak_bitrate")]
    pub peak_bitrate: Option<u64>,

    #[serde(default = "default_max_width")]
    pub max_width: Option<u32>,

    #[serde(default = "default_max_height")]
    pub max_height: Option<u32>,
}

fn default_muted() -> bool {
    true
}

fn default_peak_bitrate() -> Option<u64> {
    Some(2_000_000)
}

fn default_max_width() -> Option<u32> {
    Some(1280)
}

fn default_max_height() -> Option<u32> {
    Some(720)
}

impl Default for PlaybackPolicy {
    fn default() -> Self {
        Self {
            muted: default_muted(),
            peak_bitrate: default_peak_bitrate(),
            max_width: default_max_width(),
            max_height: default_max_height(),
        }
    }
}

/// What the backend learned about the media while preparing it
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub container: ContainerFormat,
    pub track_count: usize,
    /// Longest track duration, when the container reports one
    pub duration: Option<Duration>,
    pub byte_len: usize,
}

/// A prepared decoder/playback object bound to one artifact
pub trait PlaybackSession: Send + Sync {
    /// Start or resume playback under `policy`
    fn play(&mut self, policy: &PlaybackPolicy) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    /// Stop playback and release decoder resources
    ///
    /// Called exactly once during teardown. Must not block on the artifact.
    fn stop(&mut self) -> Result<()>;

    fn is_playing(&self) -> bool;
}

/// Session plus media description returned by `MediaBackend::prepare`
pub struct PreparedSession {
    pub session: Box<dyn PlaybackSession>,
    pub info: MediaInfo,
}

impl std::fmt::Debug for PreparedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedSession")
            .field("info", &self.info)
            .field("playing", &self.session.is_playing())
            .finish()
    }
}

/// Builds playback sessions from temp artifacts
///
/// `prepare` runs on the blocking thread pool and may do file I/O and
/// container parsing.
pub trait MediaBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Build a session for the artifact at `path`
    ///
    /// # Errors
    /// `Error::MediaCreation` when the artifact is not playable media.
    fn prepare(&self, path: &Path, format: ContainerFormat) -> Result<PreparedSession>;
}
