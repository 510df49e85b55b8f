#![cfg(unix)]

mod support;

use std::{collections::HashSet, sync::OnceLock};

use axum::http::StatusCode;
use http_body_util::BodyExt;
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use serial_test::serial;
use stillframe::infra::{guard::OutputCleanup, telemetry};
use tower::ServiceExt;

use support::{Harness, render_request};

fn snapshotter() -> &'static Snapshotter {
    static SNAPSHOTTER: OnceLock<Snapshotter> = OnceLock::new();
    SNAPSHOTTER.get_or_init(|| {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        recorder
            .install()
            .expect("debug metrics recorder should install in this test process");
        telemetry::describe_metrics();
        snapshotter
    })
}

fn counter(name: &str, label: (&str, &str)) -> u64 {
    snapshotter()
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(composite_key, _, _, value)| {
            let key = composite_key.key();
            let labelled = key
                .labels()
                .any(|l| l.key() == label.0 && l.value() == label.1);
            match value {
                DebugValue::Counter(count) if key.name() == name && labelled => Some(count),
                _ => None,
            }
        })
        .sum()
}

#[tokio::test]
#[serial]
async fn successful_render_records_outcome_and_encode_time() {
    snapshotter();
    let harness = Harness::new();
    let app = harness.router(harness.succeeding_encoder(), OutputCleanup::AfterResponse);

    let response = app
        .oneshot(render_request(&[("image", &b"jpeg"[..]), ("audio", &b"mp3"[..])]))
        .await
        .expect("router should respond");
    assert_eq!(response.status(), StatusCode::OK);
    let _ = response.into_body().collect().await.expect("body");

    let names: HashSet<String> = snapshotter()
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();
    assert!(names.contains("stillframe_encode_ms"), "missing encode histogram");
    assert!(counter("stillframe_render_total", ("outcome", "success")) >= 1);
}

#[tokio::test]
#[serial]
async fn failures_are_labelled_by_reason() {
    snapshotter();
    let harness = Harness::new();

    let app = harness.router(harness.failing_encoder(), OutputCleanup::AfterResponse);
    let response = app
        .oneshot(render_request(&[("image", &b"jpeg"[..]), ("audio", &b"mp3"[..])]))
        .await
        .expect("router should respond");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let app = harness.router(harness.failing_encoder(), OutputCleanup::AfterResponse);
    let response = app
        .oneshot(render_request(&[("image", &b"jpeg"[..])]))
        .await
        .expect("router should respond");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(counter("stillframe_render_failed_total", ("reason", "encoding_failed")) >= 1);
    assert!(counter("stillframe_render_failed_total", ("reason", "missing_input")) >= 1);
    assert!(counter("stillframe_render_total", ("outcome", "failure")) >= 2);
}
