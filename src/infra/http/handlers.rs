use axum::{
    Json,
    body::Body,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::warn;

use crate::application::render::{RenderError, RenderedVideo};

use super::{RenderState, multipart::read_render_parts};

const SOURCE: &str = "stillframe::http::render";
const VIDEO_CONTENT_TYPE: &str = "video/mp4";

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "ffmpeg": "ready" }))
}

pub async fn render(
    State(state): State<RenderState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, RenderError> {
    let mut multipart = multipart.map_err(|rejection| {
        record_rejection(RenderError::invalid_payload(rejection.body_text()))
    })?;

    let parts = read_render_parts(&mut multipart)
        .await
        .map_err(record_rejection)?;
    let request = parts.into_request().map_err(record_rejection)?;

    let video = state.pipeline.render(request).await?;
    Ok(video_response(video))
}

/// Failures caught before the pipeline runs still count as failed renders.
fn record_rejection(err: RenderError) -> RenderError {
    metrics::counter!("stillframe_render_total", "outcome" => "failure").increment(1);
    metrics::counter!("stillframe_render_failed_total", "reason" => err.reason()).increment(1);
    warn!(target = SOURCE, reason = err.reason(), error = %err, "render request rejected");
    err
}

fn video_response(video: RenderedVideo) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", video.download_name());
    let length = video.size_bytes;

    let mut response = Response::new(Body::from_stream(video.into_stream()));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(VIDEO_CONTENT_TYPE));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(CONTENT_DISPOSITION, value);
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(length));

    response
}

pub async fn fallback() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found" })),
    )
        .into_response()
}
