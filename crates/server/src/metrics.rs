//! Prometheus metrics for the splice server.
//!
//! Metrics carry no fingerprints or file names, only aggregate counts.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static CHUNKS_RECEIVED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "splice_chunks_received_total",
        "Total number of chunks stored",
    )
    .expect("metric creation failed")
});

pub static CHUNK_BYTES_RECEIVED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "splice_chunk_bytes_received_total",
        "Total bytes of stored chunks",
    )
    .expect("metric creation failed")
});

pub static RESUME_QUERIES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "splice_resume_queries_total",
        "Total number of resume queries answered",
    )
    .expect("metric creation failed")
});

pub static MERGES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("splice_merges_total", "Total merges by outcome"),
        &["outcome"],
    )
    .expect("metric creation failed")
});

pub static MERGE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "splice_merge_duration_seconds",
            "Time taken to merge a chunk namespace",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
    )
    .expect("metric creation failed")
});

pub static UPLOAD_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "splice_upload_errors_total",
            "Total upload protocol errors by error code",
        ),
        &["error_type"],
    )
    .expect("metric creation failed")
});

static REGISTER: Once = Once::new();

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        REGISTRY
            .register(Box::new(CHUNKS_RECEIVED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CHUNK_BYTES_RECEIVED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(RESUME_QUERIES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(MERGES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(MERGE_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPLOAD_ERRORS.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics
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

/// Count an upload protocol error under its API error code.
pub fn record_upload_error(error_type: &str) {
    UPLOAD_ERRORS.with_label_values(&[error_type]).inc();
}

/// Count a finished merge.
pub fn record_merge(outcome: &str, seconds: f64) {
    MERGES.with_label_values(&[outcome]).inc();
    MERGE_DURATION.observe(seconds);
}
