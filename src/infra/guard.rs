//! Scoped cleanup of a render's temporary files.
//!
//! [`ArtifactGuard`] owns every path a request has bound and removes them when
//! it goes out of scope, whichever way the request ends. The rendered output can
//! be detached into an [`OutputGuard`] so it outlives the inputs until the
//! response body has been handed off.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::artifacts::RunId;

const SOURCE: &str = "stillframe::cleanup";

/// When a successful render's output file is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputCleanup {
    /// Delete once the response body has been fully streamed (or abandoned).
    #[default]
    AfterResponse,
    /// Leave successful outputs for an out-of-band reaper; inputs are still removed eagerly.
    ExternalReaper,
}

impl OutputCleanup {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputCleanup::AfterResponse => "after_response",
            OutputCleanup::ExternalReaper => "external_reaper",
        }
    }
}

impl std::str::FromStr for OutputCleanup {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "after_response" => Ok(OutputCleanup::AfterResponse),
            "external_reaper" => Ok(OutputCleanup::ExternalReaper),
            other => Err(format!(
                "unknown output cleanup policy `{other}` (expected after_response or external_reaper)"
            )),
        }
    }
}

/// Removes every tracked path on drop.
#[derive(Debug)]
pub struct ArtifactGuard {
    run_id: RunId,
    tracked: Vec<PathBuf>,
    output: Option<PathBuf>,
}

impl ArtifactGuard {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            tracked: Vec::with_capacity(3),
            output: None,
        }
    }

    /// Register an input path. Call before writing so partial files are covered.
    pub fn track(&mut self, path: &Path) {
        self.tracked.push(path.to_path_buf());
    }

    /// Register the encoder's output path.
    pub fn track_output(&mut self, path: &Path) {
        self.output = Some(path.to_path_buf());
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> impl Iterator<Item = &Path> {
        self.tracked.iter().chain(self.output.iter()).map(PathBuf::as_path)
    }

    /// Detach the output path from this guard, handing its removal to the returned guard.
    pub fn release_output(&mut self, policy: OutputCleanup) -> Option<OutputGuard> {
        self.output.take().map(|path| OutputGuard {
            run_id: self.run_id,
            path,
            policy,
        })
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        for path in self.tracked.drain(..).chain(self.output.take()) {
            remove_artifact(self.run_id, &path);
        }
    }
}

/// Owns a rendered output file until the response no longer needs it.
#[derive(Debug)]
pub struct OutputGuard {
    run_id: RunId,
    path: PathBuf,
    policy: OutputCleanup,
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        match self.policy {
            OutputCleanup::AfterResponse => remove_artifact(self.run_id, &self.path),
            OutputCleanup::ExternalReaper => debug!(
                target = SOURCE,
                run_id = %self.run_id,
                path = %self.path.display(),
                "leaving rendered output for external reaper"
            ),
        }
    }
}

/// Remove a single file, logging instead of failing.
fn remove_artifact(run_id: RunId, path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(
            target = SOURCE,
            run_id = %run_id,
            path = %path.display(),
            "removed temporary artifact"
        ),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            metrics::counter!("stillframe_cleanup_failed_total").increment(1);
            warn!(
                target = SOURCE,
                run_id = %run_id,
                path = %path.display(),
                error = %err,
                "cleanup failed"
            );
        }
    }
}
