//! Chunk upload, resume query and merge endpoints.

use crate::error::{ApiError, ApiResult};
use crate::handlers::common::read_chunk_body;
use crate::metrics::{CHUNK_BYTES_RECEIVED, CHUNKS_RECEIVED, RESUME_QUERIES, record_merge};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, Request, State};
use splice_core::Fingerprint;
use splice_core::protocol::{
    ChunkAck, MergeRequest, MergeResponse, ResumeQuery, ResumeResponse, StoredChunk,
    UploadChunkQuery,
};
use splice_storage::{UploadError, parse_chunk_request};
use std::time::Instant;
use tracing::instrument;

/// Upper bound of a merge request body.
const MAX_MERGE_BODY_SIZE: usize = 64 * 1024;

/// POST /upload?fileHash=<fp>&index=<i>
///
/// Parameters are validated before the body is read, so a malformed request
/// never touches storage.
#[instrument(skip_all, fields(fingerprint, index))]
pub async fn upload_chunk(
    State(state): State<AppState>,
    Query(query): Query<UploadChunkQuery>,
    req: Request,
) -> ApiResult<Json<ChunkAck>> {
    let (fingerprint, index) =
        parse_chunk_request(query.fingerprint.as_deref(), query.index.as_deref())?;
    let span = tracing::Span::current();
    span.record("fingerprint", fingerprint.as_str());
    span.record("index", index);

    let data = read_chunk_body(&state, req).await?;
    let size = data.len() as u64;
    state.chunks.put_chunk(&fingerprint, index, data).await?;

    CHUNKS_RECEIVED.inc();
    CHUNK_BYTES_RECEIVED.inc_by(size);
    tracing::debug!(size, "chunk accepted");
    Ok(Json(ChunkAck::stored(index)))
}

/// GET /upload/chunks?fileHash=<fp>[&format=objects]
///
/// Resume query. Never creates the namespace.
#[instrument(skip_all, fields(fingerprint))]
pub async fn list_chunks(
    State(state): State<AppState>,
    Query(query): Query<ResumeQuery>,
) -> ApiResult<Json<ResumeResponse>> {
    let fingerprint = query
        .fingerprint
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing fileHash".to_string()))?;
    let fingerprint =
        Fingerprint::parse(fingerprint).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    tracing::Span::current().record("fingerprint", fingerprint.as_str());

    let as_objects = match query.format.as_deref() {
        None | Some("") | Some("indices") => false,
        Some("objects") => true,
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "unknown format {other:?}, expected \"indices\" or \"objects\""
            )));
        }
    };

    let indices = state.chunks.resume_query(&fingerprint).await?;
    RESUME_QUERIES.inc();
    tracing::debug!(stored = indices.len(), "resume query answered");

    let data = indices
        .into_iter()
        .map(|index| {
            if as_objects {
                StoredChunk::Object { index }
            } else {
                StoredChunk::Index(index)
            }
        })
        .collect();
    Ok(Json(ResumeResponse {
        success: true,
        data,
    }))
}

/// POST /upload/merge
#[instrument(skip_all, fields(fingerprint, total))]
pub async fn merge_upload(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<MergeResponse>> {
    let bytes = axum::body::to_bytes(req.into_body(), MAX_MERGE_BODY_SIZE)
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read body: {e}")))?;
    let body: MergeRequest = serde_json::from_slice(&bytes)
        .map_err(|e| UploadError::InvalidMergeRequest(format!("invalid JSON: {e}")))?;

    let fingerprint = Fingerprint::parse(&body.fingerprint)
        .map_err(|e| UploadError::InvalidMergeRequest(e.to_string()))?;
    let span = tracing::Span::current();
    span.record("fingerprint", fingerprint.as_str());
    span.record("total", body.total);

    let started = Instant::now();
    let result = state
        .merger
        .merge(&fingerprint, &body.file_name, body.total)
        .await;
    record_merge(
        merge_outcome_label(&result),
        started.elapsed().as_secs_f64(),
    );
    let outcome = result?;

    Ok(Json(MergeResponse {
        success: true,
        message: format!(
            "merged {} chunks ({} bytes) into {}",
            outcome.chunks, outcome.size, outcome.artifact
        ),
        url: outcome.artifact.url(),
    }))
}

fn merge_outcome_label<T>(result: &Result<T, UploadError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(UploadError::IncompleteUpload { .. }) => "incomplete",
        Err(UploadError::CorruptNamespace { .. }) => "corrupt",
        Err(UploadError::MergeFailed { .. }) | Err(UploadError::Lookup { .. }) => "failed",
        Err(_) => "rejected",
    }
}
