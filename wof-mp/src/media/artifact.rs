//! Scoped temporary media artifacts
//!
//! Decoders read from a path, so every handle persists its payload into the
//! pool-owned temp directory. Names are random and unique per artifact;
//! deletion happens exactly once, whichever of `remove()` or `Drop` comes
//! first.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// File name prefix for pool artifacts
const ARTIFACT_PREFIX: &str = "wof-card-";

/// Temp file holding one handle's source bytes
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    temp_path: Option<TempPath>,
}

impl TempArtifact {
    /// Write `bytes` into a new uniquely named file under `dir`
    ///
    /// Creates `dir` if needed. The file handle is closed before returning so
    /// the decoder can open the path itself.
    pub fn create(dir: &Path, bytes: &[u8], extension: &str) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;

        let suffix = format!(".{}", extension);
        let mut file = tempfile::Builder::new()
            .prefix(ARTIFACT_PREFIX)
            .suffix(&suffix)
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        let temp_path = file.into_temp_path();
        Ok(Self {
            path: temp_path.to_path_buf(),
            temp_path: Some(temp_path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file
    ///
    /// Returns `Ok(true)` when this call deleted it and `Ok(false)` when it
    /// was already removed through this artifact. A file deleted behind the
    /// pool's back surfaces as `Err(NotFound)` once; later calls are no-ops.
    pub fn remove(&mut self) -> io::Result<bool> {
        match self.temp_path.take() {
            Some(temp_path) => temp_path.close().map(|_| true),
            None => Ok(false),
        }
    }
}
