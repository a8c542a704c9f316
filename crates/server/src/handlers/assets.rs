//! Read-only access to merged artifacts.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use splice_core::artifact::{ArtifactKind, content_type, format_size};
use splice_core::protocol::{AssetEntry, AssetListResponse};
use splice_core::ArtifactName;
use splice_storage::{ArtifactInfo, list_artifacts, open_artifact};
use time::format_description::well_known::Rfc3339;

/// GET /assets
pub async fn list_assets(State(state): State<AppState>) -> ApiResult<Json<AssetListResponse>> {
    let artifacts = list_artifacts(state.storage.as_ref()).await?;
    Ok(Json(AssetListResponse {
        success: true,
        data: artifacts.iter().map(asset_entry).collect(),
    }))
}

fn asset_entry(info: &ArtifactInfo) -> AssetEntry {
    let kind = info.name.kind();
    AssetEntry {
        name: info.name.to_string(),
        size: info.size,
        formatted_size: format_size(info.size),
        modified: info.modified.and_then(|m| m.format(&Rfc3339).ok()),
        url: info.name.url(),
        is_image: kind == ArtifactKind::Image,
        is_video: kind == ArtifactKind::Video,
        is_audio: kind == ArtifactKind::Audio,
        is_text: kind == ArtifactKind::Text,
    }
}

/// GET /assets/{name}
///
/// Streams the artifact; names that cannot be artifacts are plain 404s.
pub async fn get_asset(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Response> {
    let name = ArtifactName::parse(&name)
        .map_err(|_| ApiError::NotFound(format!("asset not found: {name}")))?;
    let (meta, stream) = open_artifact(state.storage.as_ref(), &name).await?;
    let body_stream = stream.map(|result| result.map_err(|e| std::io::Error::other(e.to_string())));

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, content_type(name.file_name()).to_string()),
            (CONTENT_LENGTH, meta.size.to_string()),
        ],
        Body::from_stream(body_stream),
    )
        .into_response())
}
