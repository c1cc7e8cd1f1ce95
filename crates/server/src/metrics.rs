//! Prometheus metrics for the whoisit server.
//!
//! Covers the upload path and the analysis pipeline. The `/metrics` endpoint is
//! unauthenticated and should only be reachable by the scraper.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Upload metrics
pub static UPLOADS_ACCEPTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "whoisit_uploads_accepted_total",
        "Total number of images stored and answered with a URL",
    )
    .expect("metric creation failed")
});

pub static UPLOAD_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "whoisit_upload_errors_total",
            "Total number of rejected or failed uploads by kind",
        ),
        &["kind"],
    )
    .expect("metric creation failed")
});

pub static METADATA_WRITE_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "whoisit_upload_metadata_write_failures_total",
        "Uploads answered successfully whose upload record could not be written",
    )
    .expect("metric creation failed")
});

pub static UPLOAD_BYTES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "whoisit_upload_bytes_total",
        "Total decoded image bytes written to the object store",
    )
    .expect("metric creation failed")
});

// Analysis metrics
pub static ANALYSIS_BATCHES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "whoisit_analysis_batches_total",
            "Total number of notification batches handled, by result",
        ),
        &["result"],
    )
    .expect("metric creation failed")
});

pub static OBJECTS_ANALYZED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "whoisit_objects_analyzed_total",
        "Total number of stored images sent to the recognition service",
    )
    .expect("metric creation failed")
});

pub static IDENTITIES_MERGED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "whoisit_identities_merged_total",
        "Total number of merge updates applied to the identity index",
    )
    .expect("metric creation failed")
});

pub static UNRECOGNIZED_FACES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "whoisit_unrecognized_faces_total",
        "Total number of detected faces that matched no known identity",
    )
    .expect("metric creation failed")
});

pub static ANALYSIS_BATCH_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "whoisit_analysis_batch_duration_seconds",
            "Time taken to recognize and merge one notification batch",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
    )
    .expect("metric creation failed")
});

static REGISTER: Once = Once::new();

/// Register all metrics with the global registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        REGISTRY
            .register(Box::new(UPLOADS_ACCEPTED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPLOAD_ERRORS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(METADATA_WRITE_FAILURES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPLOAD_BYTES.clone()))
            .expect("metric registration failed");

        REGISTRY
            .register(Box::new(ANALYSIS_BATCHES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(OBJECTS_ANALYZED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(IDENTITIES_MERGED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UNRECOGNIZED_FACES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ANALYSIS_BATCH_DURATION.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Helper to record upload errors by kind.
pub fn record_upload_error(kind: &str) {
    UPLOAD_ERRORS.with_label_values(&[kind]).inc();
}

/// Helper to record the outcome of an analysis batch.
pub fn record_batch(result: &str) {
    ANALYSIS_BATCHES.with_label_values(&[result]).inc();
}
