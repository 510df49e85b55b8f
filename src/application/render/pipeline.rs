use std::{io, path::Path, sync::Arc};

use bytes::{Bytes, BytesMut};
use futures::{Stream, stream};
use tokio::{fs::File, io::AsyncReadExt};
use tracing::{info, warn};

use crate::{
    domain::artifacts::{RenderRequest, RunId},
    infra::{
        guard::{ArtifactGuard, OutputCleanup, OutputGuard},
        storage::ArtifactStorage,
    },
};

use super::{error::RenderError, executor::FfmpegExecutor, stage::stage};

const SOURCE: &str = "stillframe::render::pipeline";
const READ_CHUNK_BYTES: usize = 64 * 1024;

/// Stage → encode → hand off, with cleanup on every exit path.
///
/// Holds no per-request state; one instance is shared by all requests.
#[derive(Debug)]
pub struct RenderPipeline {
    storage: Arc<ArtifactStorage>,
    executor: FfmpegExecutor,
    output_cleanup: OutputCleanup,
}

impl RenderPipeline {
    pub fn new(
        storage: Arc<ArtifactStorage>,
        executor: FfmpegExecutor,
        output_cleanup: OutputCleanup,
    ) -> Self {
        Self {
            storage,
            executor,
            output_cleanup,
        }
    }

    /// Render one request.
    ///
    /// Input files are removed before this returns, whatever the result. On
    /// success the output file is owned by the returned [`RenderedVideo`].
    pub async fn render(&self, request: RenderRequest) -> Result<RenderedVideo, RenderError> {
        let run_id = request.run_id;
        let mut guard = ArtifactGuard::new(run_id);

        let result = self.render_guarded(&request, &mut guard).await;
        match &result {
            Ok(video) => {
                metrics::counter!("stillframe_render_total", "outcome" => "success").increment(1);
                info!(
                    target = SOURCE,
                    run_id = %run_id,
                    size_bytes = video.size_bytes,
                    output_cleanup = self.output_cleanup.as_str(),
                    "render succeeded"
                );
            }
            Err(err) => {
                metrics::counter!("stillframe_render_total", "outcome" => "failure").increment(1);
                metrics::counter!("stillframe_render_failed_total", "reason" => err.reason())
                    .increment(1);
                warn!(
                    target = SOURCE,
                    run_id = %run_id,
                    reason = err.reason(),
                    error = %err,
                    "render failed"
                );
            }
        }

        result
    }

    async fn render_guarded(
        &self,
        request: &RenderRequest,
        guard: &mut ArtifactGuard,
    ) -> Result<RenderedVideo, RenderError> {
        let artifacts = stage(&self.storage, request, guard).await?;
        guard.track_output(artifacts.output_path());

        let encoded = self.executor.execute(&artifacts).await?;

        let file = File::open(&encoded.path).await.map_err(|err| {
            RenderError::unexpected(format!("rendered output could not be opened: {err}"))
        })?;
        let output = guard
            .release_output(self.output_cleanup)
            .ok_or_else(|| RenderError::unexpected("output path was not tracked"))?;

        Ok(RenderedVideo {
            run_id: request.run_id,
            size_bytes: encoded.size_bytes,
            file,
            guard: output,
        })
    }
}

/// A successful render, ready to stream.
///
/// Dropping it (or the stream built from it) releases the output file
/// according to the configured [`OutputCleanup`] policy.
#[derive(Debug)]
pub struct RenderedVideo {
    pub run_id: RunId,
    pub size_bytes: u64,
    file: File,
    guard: OutputGuard,
}

impl RenderedVideo {
    /// Suggested download name for the caller.
    pub fn download_name(&self) -> String {
        format!("video_{}.mp4", self.run_id)
    }

    /// Stream the file's bytes; the output guard drops once the stream is exhausted or abandoned.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static {
        stream::try_unfold(
            (self.file, self.guard),
            |(mut file, guard)| async move {
                let mut chunk = BytesMut::with_capacity(READ_CHUNK_BYTES);
                let read = file.read_buf(&mut chunk).await?;
                if read == 0 {
                    return Ok(None);
                }
                Ok(Some((chunk.freeze(), (file, guard))))
            },
        )
    }

    /// Copy the rendered file to `destination`, then release the output.
    pub async fn persist_to(mut self, destination: &Path) -> Result<u64, io::Error> {
        let mut target = File::create(destination).await?;
        let copied = tokio::io::copy(&mut self.file, &mut target).await?;
        target.sync_all().await?;
        Ok(copied)
    }
}
