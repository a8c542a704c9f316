//! Capability discovery, health and landing endpoints.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;
use splice_core::hash::DigestAlgorithm;
use splice_core::{DEFAULT_CHUNK_SIZE, DEFAULT_SAMPLE_WINDOW, MIN_CHUNK_SIZE};

/// Capabilities response.
#[derive(Debug, Serialize)]
pub struct CapabilitiesResponse {
    /// Maximum chunk size in bytes.
    pub max_chunk_size: u64,
    /// Minimum chunk size clients should use.
    pub min_chunk_size: u64,
    /// Default chunk size in bytes.
    pub default_chunk_size: u64,
    /// Default fingerprint sample window in bytes.
    pub default_sample_window: u64,
    /// Accepted fingerprint lengths in hex characters.
    pub fingerprint_lengths: [usize; 2],
    /// Whether resume is supported.
    pub supports_resume: bool,
    /// API version.
    pub api_version: &'static str,
}

/// GET /v1/capabilities
pub async fn get_capabilities(
    State(state): State<AppState>,
) -> ApiResult<Json<CapabilitiesResponse>> {
    Ok(Json(CapabilitiesResponse {
        max_chunk_size: state.config.server.max_chunk_size,
        min_chunk_size: MIN_CHUNK_SIZE,
        default_chunk_size: DEFAULT_CHUNK_SIZE.min(state.config.server.max_chunk_size),
        default_sample_window: DEFAULT_SAMPLE_WINDOW,
        fingerprint_lengths: [
            DigestAlgorithm::Md5.hex_len(),
            DigestAlgorithm::Sha256.hex_len(),
        ],
        supports_resume: true,
        api_version: "v1",
    }))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub storage: &'static str,
}

/// GET /v1/health
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.storage.health_check().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        storage: state.storage.backend_name(),
    }))
}

/// Landing response.
#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub endpoints: &'static [&'static str],
}

const ENDPOINTS: &[&str] = &[
    "POST /upload?fileHash=<fingerprint>&index=<i>",
    "GET /upload/chunks?fileHash=<fingerprint>",
    "POST /upload/merge",
    "GET /assets",
    "GET /assets/{name}",
    "GET /v1/capabilities",
    "GET /v1/health",
];

/// GET /
pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        service: "splice",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ENDPOINTS,
    })
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("no such endpoint".to_string())
}
