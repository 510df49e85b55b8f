//! Per-request render inputs and their on-disk layout.

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use uuid::Uuid;

/// Server-generated identifier namespacing one render's temporary files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

/// Role a temporary file plays in a render; each role has a fixed filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactRole {
    Image,
    Audio,
    Subtitles,
    Output,
}

impl ArtifactRole {
    pub const fn suffix(self) -> &'static str {
        match self {
            ArtifactRole::Image => "_img.jpg",
            ArtifactRole::Audio => "_audio.mp3",
            ArtifactRole::Subtitles => "_subs.ass",
            ArtifactRole::Output => "_out.mp4",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ArtifactRole::Image => "image",
            ArtifactRole::Audio => "audio",
            ArtifactRole::Subtitles => "subtitles",
            ArtifactRole::Output => "output",
        }
    }

    pub fn file_name(self, run_id: RunId) -> String {
        format!("{run_id}{}", self.suffix())
    }
}

/// Validated inputs for a single render.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub run_id: RunId,
    pub image: Bytes,
    pub audio: Bytes,
    pub subtitles: Option<Bytes>,
}

impl RenderRequest {
    /// Build a request and assign it a fresh run identifier.
    pub fn new(image: Bytes, audio: Bytes, subtitles: Option<Bytes>) -> Self {
        Self {
            run_id: RunId::new(),
            image,
            audio,
            subtitles,
        }
    }
}

/// Paths a render reads from and writes to, derived from its run identifier.
///
/// The set of paths is fixed at construction; the encoder only reads the
/// input paths and only writes [`StagedArtifacts::output_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifacts {
    run_id: RunId,
    image_path: PathBuf,
    audio_path: PathBuf,
    subtitle_path: Option<PathBuf>,
    output_path: PathBuf,
}

impl StagedArtifacts {
    pub fn layout(root: &Path, run_id: RunId, with_subtitles: bool) -> Self {
        let path_for = |role: ArtifactRole| root.join(role.file_name(run_id));
        Self {
            run_id,
            image_path: path_for(ArtifactRole::Image),
            audio_path: path_for(ArtifactRole::Audio),
            subtitle_path: with_subtitles.then(|| path_for(ArtifactRole::Subtitles)),
            output_path: path_for(ArtifactRole::Output),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    pub fn subtitle_path(&self) -> Option<&Path> {
        self.subtitle_path.as_deref()
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}
