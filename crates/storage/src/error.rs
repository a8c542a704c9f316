//! Storage and upload protocol error types.

use splice_core::Fingerprint;
use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Failures of the chunk store, resume query and merge engine.
///
/// Every variant names the fingerprint (and index, where one applies) so the
/// caller can tell which upload is affected.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid chunk request: {0}")]
    InvalidChunkRequest(String),

    #[error("invalid merge request: {0}")]
    InvalidMergeRequest(String),

    #[error("failed to store chunk {index} of {fingerprint}: {source}")]
    ChunkWrite {
        fingerprint: Fingerprint,
        index: u32,
        #[source]
        source: StorageError,
    },

    #[error("failed to look up chunks of {fingerprint}: {source}")]
    Lookup {
        fingerprint: Fingerprint,
        #[source]
        source: StorageError,
    },

    #[error("incomplete upload for {fingerprint}: expected {expected} chunks, found {found}")]
    IncompleteUpload {
        fingerprint: Fingerprint,
        expected: u32,
        found: u32,
    },

    #[error("corrupt chunk namespace {fingerprint}: {detail}")]
    CorruptNamespace {
        fingerprint: Fingerprint,
        detail: String,
    },

    #[error("merge of {fingerprint} failed: {source}")]
    MergeFailed {
        fingerprint: Fingerprint,
        #[source]
        source: StorageError,
    },
}

/// Result type for upload protocol operations.
pub type UploadResult<T> = std::result::Result<T, UploadError>;
