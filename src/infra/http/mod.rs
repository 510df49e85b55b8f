use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
};

use crate::application::render::RenderPipeline;

mod error;
mod handlers;
mod middleware;
mod multipart;

pub use middleware::{REQUEST_ID_HEADER, RequestContext};

use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct RenderState {
    pub pipeline: Arc<RenderPipeline>,
}

impl RenderState {
    pub fn new(pipeline: Arc<RenderPipeline>) -> Self {
        Self { pipeline }
    }
}

/// Build the service router. `body_limit` caps the whole request body in bytes.
pub fn build_router(state: RenderState, body_limit: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/render", post(handlers::render))
        .fallback(handlers::fallback)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(from_fn(log_responses))
        .layer(from_fn(set_request_context))
}
