//! JSON wire types shared by the server and the client.
//!
//! Field names follow the camelCase convention of browser uploaders
//! (`fileHash`, `fileName`); snake_case aliases are accepted on input.

use serde::{Deserialize, Serialize};

/// Query parameters of `POST /upload`.
///
/// Both fields are optional at the type level so that a missing parameter is
/// reported as an invalid chunk request rather than a generic parse failure.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UploadChunkQuery {
    #[serde(rename = "fileHash", alias = "fingerprint", default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub index: Option<String>,
}

/// Query parameters of `GET /upload/chunks`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResumeQuery {
    #[serde(rename = "fileHash", alias = "fingerprint", default)]
    pub fingerprint: Option<String>,
    /// `objects` renders indices as `{"index": i}` items.
    #[serde(default)]
    pub format: Option<String>,
}

/// Acknowledgement of a stored chunk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkAck {
    pub code: u16,
    pub success: bool,
    pub message: String,
}

impl ChunkAck {
    pub fn stored(index: u32) -> Self {
        Self {
            code: 200,
            success: true,
            message: format!("chunk {index} stored"),
        }
    }
}

/// One entry of a resume-query result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredChunk {
    Index(u32),
    Object { index: u32 },
}

impl StoredChunk {
    pub fn index(self) -> u32 {
        match self {
            Self::Index(i) | Self::Object { index: i } => i,
        }
    }
}

/// Result of a resume query: indices already stored, ascending.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResumeResponse {
    pub success: bool,
    pub data: Vec<StoredChunk>,
}

impl ResumeResponse {
    pub fn indices(&self) -> Vec<u32> {
        self.data.iter().map(|c| c.index()).collect()
    }
}

/// Body of `POST /upload/merge`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MergeRequest {
    #[serde(rename = "fileHash", alias = "fingerprint")]
    pub fingerprint: String,
    #[serde(rename = "fileName", alias = "file_name")]
    pub file_name: String,
    pub total: u32,
}

/// Successful merge result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MergeResponse {
    pub success: bool,
    pub message: String,
    pub url: String,
}

/// Error body returned by every failing endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    /// Stable machine-readable code.
    pub error: String,
}

/// One merged artifact in `GET /assets`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntry {
    pub name: String,
    pub size: u64,
    pub formatted_size: String,
    /// RFC 3339 modification time, if the backend reports one.
    pub modified: Option<String>,
    pub url: String,
    pub is_image: bool,
    pub is_video: bool,
    pub is_audio: bool,
    pub is_text: bool,
}

/// Response of `GET /assets`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetListResponse {
    pub success: bool,
    pub data: Vec<AssetEntry>,
}
