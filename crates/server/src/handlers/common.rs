//! Shared handler helpers.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use futures::StreamExt;

/// Room for multipart boundaries and part headers on top of the chunk itself.
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Multipart field carrying the chunk bytes.
pub const CHUNK_FIELD: &str = "file";

/// Read a chunk body from either a `multipart/form-data` request (field
/// `file`) or a raw request body.
///
/// Bodies larger than the configured maximum chunk size are rejected with
/// 413 before anything is stored.
pub async fn read_chunk_body(state: &AppState, req: Request) -> ApiResult<Bytes> {
    let limit = state.max_chunk_size();

    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    let is_multipart = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let data = if is_multipart {
        if declared.is_some_and(|len| len > limit.saturating_add(MULTIPART_OVERHEAD)) {
            return Err(too_large(limit));
        }
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        let mut chunk = None;
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            if field.name() == Some(CHUNK_FIELD) {
                chunk = Some(field.bytes().await.map_err(multipart_error)?);
                break;
            }
        }
        chunk.ok_or_else(|| {
            ApiError::BadRequest(format!("multipart body has no \"{CHUNK_FIELD}\" field"))
        })?
    } else {
        if declared.is_some_and(|len| len > limit) {
            return Err(too_large(limit));
        }
        read_raw_body(req, declared, limit).await?
    };

    if data.len() > limit {
        return Err(too_large(limit));
    }
    Ok(data)
}

/// Collect a raw body, stopping with 413 as soon as it passes `limit`.
/// Chunked bodies carry no `Content-Length`, so the count is kept here.
async fn read_raw_body(req: Request, declared: Option<usize>, limit: usize) -> ApiResult<Bytes> {
    let mut stream = req.into_body().into_data_stream();
    let mut data = Vec::with_capacity(declared.unwrap_or(0).min(limit));
    while let Some(piece) = stream.next().await {
        let piece =
            piece.map_err(|e| ApiError::BadRequest(format!("failed to read chunk: {e}")))?;
        if data.len() + piece.len() > limit {
            return Err(too_large(limit));
        }
        data.extend_from_slice(&piece);
    }
    Ok(Bytes::from(data))
}

fn too_large(limit: usize) -> ApiError {
    ApiError::PayloadTooLarge(format!("chunk exceeds maximum of {limit} bytes"))
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::BadRequest(e.body_text())
    }
}
