//! Screenshot artifacts.
//!
//! Each checkpoint has a fixed file name under the artifact directory, so a
//! run always produces the same set of paths. Writes overwrite. A capture that
//! cannot be taken, is not a decodable image, or cannot be written is an
//! [`HarnessError::ArtifactWriteFault`].

use crate::driver::Driver;
use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the JSON run manifest
pub const MANIFEST_FILE: &str = "synthualizer_report.json";

/// Named capture points in the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    /// After the first load settles
    Initial,
    /// After the waveform click
    WaveformSelected,
    /// While the note is held
    NoteHeld,
    /// After the cutoff change
    CutoffAdjusted,
    /// End of the interactive stages
    Final,
}

impl Checkpoint {
    /// All checkpoints in protocol order
    pub const ALL: [Self; 5] = [
        Self::Initial,
        Self::WaveformSelected,
        Self::NoteHeld,
        Self::CutoffAdjusted,
        Self::Final,
    ];

    /// Fixed file name for this checkpoint
    #[must_use]
    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::Initial => "synthualizer_initial.png",
            Self::WaveformSelected => "synthualizer_square_selected.png",
            Self::NoteHeld => "synthualizer_playing_note.png",
            Self::CutoffAdjusted => "synthualizer_cutoff_adjusted.png",
            Self::Final => "synthualizer_final.png",
        }
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::WaveformSelected => "waveform selected",
            Self::NoteHeld => "note held",
            Self::CutoffAdjusted => "cutoff adjusted",
            Self::Final => "final",
        };
        f.write_str(name)
    }
}

/// A screenshot written to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Which checkpoint produced it
    pub checkpoint: Checkpoint,
    /// Where it was written
    pub path: PathBuf,
    /// Size in bytes
    pub bytes: usize,
    /// Image width
    pub width: u32,
    /// Image height
    pub height: u32,
    /// Hex SHA-256 of the file contents
    pub sha256: String,
}

/// Writes screenshots to a directory
#[derive(Debug, Clone)]
pub struct ArtifactSink {
    dir: PathBuf,
}

impl ArtifactSink {
    /// Full-page captures into `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Artifact directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Destination path for a checkpoint
    #[must_use]
    pub fn path_for(&self, checkpoint: Checkpoint) -> PathBuf {
        self.dir.join(checkpoint.file_name())
    }

    /// Manifest destination
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Take a screenshot and write it to the checkpoint's path
    pub async fn capture<D: Driver + ?Sized>(
        &self,
        driver: &D,
        checkpoint: Checkpoint,
    ) -> HarnessResult<Artifact> {
        let path = self.path_for(checkpoint);
        let shot = driver
            .screenshot(true)
            .await
            .map_err(|e| HarnessError::artifact(&path, e.to_string()))?;
        if shot.data.is_empty() {
            return Err(HarnessError::artifact(&path, "screenshot is empty"));
        }
        let decoded = image::load_from_memory(&shot.data)
            .map_err(|e| HarnessError::artifact(&path, format!("not a valid image: {e}")))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| HarnessError::artifact(&path, e.to_string()))?;
        tokio::fs::write(&path, &shot.data)
            .await
            .map_err(|e| HarnessError::artifact(&path, e.to_string()))?;

        let digest = Sha256::digest(&shot.data);
        let artifact = Artifact {
            checkpoint,
            path,
            bytes: shot.size_bytes(),
            width: decoded.width(),
            height: decoded.height(),
            sha256: format!("{digest:x}"),
        };
        info!(checkpoint = %checkpoint, path = %artifact.path.display(), bytes = artifact.bytes, "artifact written");
        Ok(artifact)
    }

    /// Write a JSON manifest next to the screenshots
    pub async fn write_manifest<T: Serialize + Sync>(&self, report: &T) -> HarnessResult<PathBuf> {
        let path = self.manifest_path();
        let json = serde_json::to_string_pretty(report)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }
}
