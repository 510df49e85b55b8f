use std::io;

use thiserror::Error;

/// Every way a render request can fail.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("missing required `{part}` part")]
    MissingInput { part: &'static str },
    #[error("multipart payload could not be parsed: {detail}")]
    InvalidPayload { detail: String },
    #[error("request body exceeds the configured upload limit")]
    PayloadTooLarge,
    #[error("failed to stage `{role}` artifact")]
    StagingFailed {
        role: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("encoder failed: {details}")]
    EncodingFailed { details: String },
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl RenderError {
    pub fn missing(part: &'static str) -> Self {
        Self::MissingInput { part }
    }

    pub fn invalid_payload(detail: impl Into<String>) -> Self {
        Self::InvalidPayload {
            detail: detail.into(),
        }
    }

    pub fn staging(role: &'static str, source: io::Error) -> Self {
        Self::StagingFailed { role, source }
    }

    pub fn encoding(details: impl Into<String>) -> Self {
        Self::EncodingFailed {
            details: details.into(),
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Short label used for metrics and structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            RenderError::MissingInput { .. } => "missing_input",
            RenderError::InvalidPayload { .. } => "invalid_payload",
            RenderError::PayloadTooLarge => "payload_too_large",
            RenderError::StagingFailed { .. } => "staging_failed",
            RenderError::EncodingFailed { .. } => "encoding_failed",
            RenderError::Unexpected(_) => "unexpected",
        }
    }
}
