//! Symphonia-backed media backend
//!
//! Probes the temp artifact with symphonia's format registry. A payload is
//! playable when a container reader can be built for it and it exposes at
//! least one track. Frames are rendered by the platform player, so the
//! session here only owns the opened reader and the playback flags.

use super::backend::{MediaBackend, MediaInfo, PlaybackPolicy, PlaybackSession, PreparedSession};
use super::sniff::ContainerFormat;
use crate::error::{Error, Result};
use std::fs::File;
use std::path::Path;
use std::time::Duration;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Default backend: container probe via symphonia
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaBackend;

impl SymphoniaBackend {
    pub fn new() -> Self {
        Self
    }
}

impl MediaBackend for SymphoniaBackend {
    fn name(&self) -> &'static str {
        "symphonia"
    }

    fn prepare(&self, path: &Path, format: ContainerFormat) -> Result<PreparedSession> {
        let file = File::open(path).map_err(|e| {
            Error::MediaCreation(format!("Failed to open artifact {}: {}", path.display(), e))
        })?;
        let byte_len = file.metadata().map(|m| m.len() as usize).unwrap_or(0);

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        hint.with_extension(format.extension());

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::MediaCreation(format!("Failed to probe container: {}", e)))?;

        let reader = probed.format;
        let tracks = reader.tracks();
        if tracks.is_empty() {
            return Err(Error::MediaCreation("Container has no tracks".to_string()));
        }

        let duration = tracks
            .iter()
            .filter_map(|track| {
                let time_base = track.codec_params.time_base?;
                let n_frames = track.codec_params.n_frames?;
                let time = time_base.calc_time(n_frames);
                Some(Duration::from_secs_f64(time.seconds as f64 + time.frac))
            })
            .max();

        let info = MediaInfo {
            container: format,
            track_count: tracks.len(),
            duration,
            byte_len,
        };

        debug!(
            "Probed {}: container={:?}, tracks={}, duration={:?}",
            path.display(),
            info.container,
            info.track_count,
            info.duration
        );

        Ok(PreparedSession {
            session: Box::new(SymphoniaSession {
                reader: Some(reader),
                playing: false,
                applied: None,
            }),
            info,
        })
    }
}

/// Session holding an opened container reader
struct SymphoniaSession {
    reader: Option<Box<dyn FormatReader>>,
    playing: bool,
    applied: Option<PlaybackPolicy>,
}

impl PlaybackSession for SymphoniaSession {
    fn play(&mut self, policy: &PlaybackPolicy) -> Result<()> {
        if self.reader.is_none() {
            return Err(Error::Internal("play on a stopped session".to_string()));
        }
        if self.applied.as_ref() != Some(policy) {
            debug!(
                "Applying playback policy: muted={}, peak_bitrate={:?}, max={:?}x{:?}",
                policy.muted, policy.peak_bitrate, policy.max_width, policy.max_height
            );
            self.applied = Some(*policy);
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.playing = false;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.playing = false;
        self.applied = None;
        // Dropping the reader closes the artifact file handle
        self.reader = None;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}
