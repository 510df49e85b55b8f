//! Shared scratch storage for render artifacts.

use std::io;
use std::path::{Path, PathBuf};

use tokio::{fs, io::AsyncWriteExt};

use crate::domain::artifacts::{RunId, StagedArtifacts};

/// Filesystem directory holding every in-flight render's temporary files.
///
/// The directory is a namespace only: filenames are keyed by [`RunId`], so
/// concurrent renders never touch each other's files and nothing is ever
/// overwritten.
#[derive(Debug)]
pub struct ArtifactStorage {
    root: PathBuf,
}

impl ArtifactStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self, run_id: RunId, with_subtitles: bool) -> StagedArtifacts {
        StagedArtifacts::layout(&self.root, run_id, with_subtitles)
    }

    /// Write `data` verbatim to a path that must not exist yet.
    pub async fn write_new(&self, path: &Path, data: &[u8]) -> Result<u64, io::Error> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(data.len() as u64)
    }
}
