//! Multipart render payload parsing.

use axum::extract::{Multipart, multipart::MultipartError};
use axum::http::StatusCode;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::application::render::{RenderError, UploadParts};

const SOURCE: &str = "stillframe::http::multipart";

const IMAGE_FIELD: &str = "image";
const AUDIO_FIELD: &str = "audio";
const SUBTITLES_FIELD: &str = "subtitles";

/// Drain the multipart body into memory. Unknown parts are skipped and the
/// first occurrence of a repeated part wins. Presence of the required parts
/// is checked later by [`UploadParts::into_request`].
pub async fn read_render_parts(multipart: &mut Multipart) -> Result<UploadParts, RenderError> {
    let mut parts = UploadParts::default();

    while let Some(field) = multipart.next_field().await.map_err(map_multipart_error)? {
        let slot = match field.name() {
            Some(IMAGE_FIELD) => &mut parts.image,
            Some(AUDIO_FIELD) => &mut parts.audio,
            Some(SUBTITLES_FIELD) => &mut parts.subtitles,
            other => {
                debug!(target = SOURCE, field = ?other, "ignoring unknown multipart field");
                continue;
            }
        };

        let data: Bytes = field.bytes().await.map_err(map_multipart_error)?;
        if slot.is_none() {
            *slot = Some(data);
        }
    }

    Ok(parts)
}

fn map_multipart_error(err: MultipartError) -> RenderError {
    let status = err.status();
    warn!(
        target = SOURCE,
        status = status.as_u16(),
        error = %err,
        "failed to read multipart payload"
    );

    match status {
        StatusCode::PAYLOAD_TOO_LARGE => RenderError::PayloadTooLarge,
        _ => RenderError::invalid_payload(err.body_text()),
    }
}
