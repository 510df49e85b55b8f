use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::application::{error::ErrorReport, render::RenderError};

const SOURCE: &str = "stillframe::http::render";

/// JSON envelope for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

pub mod messages {
    pub const MISSING_INPUT: &str = "Missing image or audio file";
    pub const INVALID_PAYLOAD: &str = "Invalid multipart payload";
    pub const PAYLOAD_TOO_LARGE: &str = "Upload exceeds the configured size limit";
    pub const STAGING_FAILED: &str = "Failed to store uploaded files";
    pub const ENCODING_FAILED: &str = "FFmpeg processing failed";
}

fn status_for(error: &RenderError) -> StatusCode {
    match error {
        RenderError::MissingInput { .. } | RenderError::InvalidPayload { .. } => {
            StatusCode::BAD_REQUEST
        }
        RenderError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        RenderError::StagingFailed { .. }
        | RenderError::EncodingFailed { .. }
        | RenderError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn body_for(error: &RenderError) -> ErrorBody {
    match error {
        RenderError::MissingInput { .. } => ErrorBody::new(messages::MISSING_INPUT),
        RenderError::InvalidPayload { .. } => ErrorBody::new(messages::INVALID_PAYLOAD),
        RenderError::PayloadTooLarge => ErrorBody::new(messages::PAYLOAD_TOO_LARGE),
        RenderError::StagingFailed { .. } => ErrorBody::new(messages::STAGING_FAILED),
        RenderError::EncodingFailed { details } => {
            ErrorBody::new(messages::ENCODING_FAILED).with_details(details.clone())
        }
        RenderError::Unexpected(message) => ErrorBody::new(message.clone()),
    }
}

impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let body = body_for(&self);
        let report = ErrorReport::from_error(SOURCE, status, &self);
        let mut response = (status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}
