//! Turning uploaded parts into files on shared storage.

use bytes::Bytes;
use tracing::info;

use crate::{
    domain::artifacts::{ArtifactRole, RenderRequest, StagedArtifacts},
    infra::{guard::ArtifactGuard, storage::ArtifactStorage},
};

use super::error::RenderError;

const SOURCE: &str = "stillframe::render::stage";

/// Raw parts collected from an upload, before validation.
#[derive(Debug, Default, Clone)]
pub struct UploadParts {
    pub image: Option<Bytes>,
    pub audio: Option<Bytes>,
    pub subtitles: Option<Bytes>,
}

impl UploadParts {
    /// Check required parts are present. Performs no I/O.
    pub fn into_request(self) -> Result<RenderRequest, RenderError> {
        let image = self.image.ok_or_else(|| RenderError::missing("image"))?;
        let audio = self.audio.ok_or_else(|| RenderError::missing("audio"))?;
        Ok(RenderRequest::new(image, audio, self.subtitles))
    }
}

/// Write each part of `request` to its namespaced path.
///
/// Every path is registered with `guard` before its write begins, so a
/// failure part-way through leaves nothing the guard does not know about.
pub async fn stage(
    storage: &ArtifactStorage,
    request: &RenderRequest,
    guard: &mut ArtifactGuard,
) -> Result<StagedArtifacts, RenderError> {
    let run_id = request.run_id;
    let artifacts = storage.layout(run_id, request.subtitles.is_some());

    let mut parts = vec![
        (ArtifactRole::Image, artifacts.image_path(), &request.image),
        (ArtifactRole::Audio, artifacts.audio_path(), &request.audio),
    ];
    if let (Some(path), Some(data)) = (artifacts.subtitle_path(), request.subtitles.as_ref()) {
        parts.push((ArtifactRole::Subtitles, path, data));
    }

    for (role, path, data) in parts {
        guard.track(path);
        let written = storage
            .write_new(path, data)
            .await
            .map_err(|err| RenderError::staging(role.as_str(), err))?;
        info!(
            target = SOURCE,
            run_id = %run_id,
            role = role.as_str(),
            bytes = written,
            "staged artifact"
        );
    }

    if request.subtitles.is_none() {
        info!(target = SOURCE, run_id = %run_id, "no subtitles supplied");
    }

    Ok(artifacts)
}
