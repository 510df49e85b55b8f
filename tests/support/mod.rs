//! Shared fixtures for router-level tests: a fake encoder and hand-built multipart bodies.

#![allow(dead_code)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, header::CONTENT_TYPE},
};
use stillframe::{
    application::render::{FfmpegExecutor, RenderPipeline},
    infra::{
        guard::OutputCleanup,
        http::{RenderState, build_router},
        storage::ArtifactStorage,
    },
};
use tempfile::TempDir;

pub const BOUNDARY: &str = "stillframe-test-boundary";
pub const RENDERED: &[u8] = b"rendered-video";
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// A scratch workspace holding the storage root, the fake encoder and its argument log.
pub struct Harness {
    pub dir: TempDir,
    pub storage: PathBuf,
    pub args_log: PathBuf,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_storage_name("storage")
    }

    pub fn with_storage_name(name: &str) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let storage = dir.path().join(name);
        let args_log = dir.path().join("args.log");
        Self {
            dir,
            storage,
            args_log,
        }
    }

    /// An encoder that logs its arguments one per line and writes a fixed payload to its last one.
    pub fn succeeding_encoder(&self) -> PathBuf {
        self.script(
            "fake-ffmpeg",
            &format!(
                r#"#!/bin/sh
for arg in "$@"; do printf '%s\n' "$arg"; done > "{log}"
for last; do :; done
printf 'rendered-video' > "$last"
echo "video:1kB audio:1kB muxing overhead: 0.5%" >&2
"#,
                log = self.args_log.display()
            ),
        )
    }

    /// An encoder that rejects its input the way ffmpeg does for a corrupt file.
    pub fn failing_encoder(&self) -> PathBuf {
        self.script(
            "broken-ffmpeg",
            &format!(
                r#"#!/bin/sh
for arg in "$@"; do printf '%s\n' "$arg"; done > "{log}"
echo "Invalid data found when processing input" >&2
exit 1
"#,
                log = self.args_log.display()
            ),
        )
    }

    /// An encoder that writes part of its output and then hangs.
    pub fn stalling_encoder(&self) -> PathBuf {
        self.script(
            "stalling-ffmpeg",
            r#"#!/bin/sh
for last; do :; done
printf 'partial' > "$last"
exec sleep 30
"#,
        )
    }

    pub fn missing_encoder(&self) -> PathBuf {
        self.dir.path().join("no-such-ffmpeg")
    }

    pub fn router(&self, encoder: PathBuf, cleanup: OutputCleanup) -> Router {
        self.router_with_limit(encoder, cleanup, DEFAULT_BODY_LIMIT)
    }

    pub fn router_with_limit(
        &self,
        encoder: PathBuf,
        cleanup: OutputCleanup,
        body_limit: usize,
    ) -> Router {
        self.build(encoder, cleanup, body_limit, None)
    }

    pub fn router_with_timeout(&self, encoder: PathBuf, timeout: Duration) -> Router {
        self.build(
            encoder,
            OutputCleanup::AfterResponse,
            DEFAULT_BODY_LIMIT,
            Some(timeout),
        )
    }

    fn build(
        &self,
        encoder: PathBuf,
        cleanup: OutputCleanup,
        body_limit: usize,
        timeout: Option<Duration>,
    ) -> Router {
        let storage = ArtifactStorage::new(self.storage.clone()).expect("storage");
        let pipeline = RenderPipeline::new(
            Arc::new(storage),
            FfmpegExecutor::new(encoder, timeout),
            cleanup,
        );
        build_router(RenderState::new(Arc::new(pipeline)), body_limit)
    }

    pub fn logged_args(&self) -> Option<Vec<String>> {
        let logged = fs::read_to_string(&self.args_log).ok()?;
        Some(logged.lines().map(str::to_string).collect())
    }

    pub fn storage_entries(&self) -> Vec<String> {
        storage_entries(&self.storage)
    }

    fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, body).expect("write script");
        let mut perms = fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("set perms");
        path
    }
}

pub fn storage_entries(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(root)
        .expect("read storage")
        .map(|entry| {
            entry
                .expect("dir entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}

/// Encode `(field, data)` pairs as a multipart/form-data body.
pub fn multipart_body(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{name}.bin\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn render_request(parts: &[(&str, &[u8])]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/render")
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .expect("request should build")
}
