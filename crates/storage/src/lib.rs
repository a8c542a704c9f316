//! Chunk namespaces, merge engine and object storage for splice.
//!
//! This crate provides:
//! - An object store abstraction with an atomic-write filesystem backend
//! - The chunk store and resume query over per-fingerprint namespaces
//! - The merge engine that reassembles a namespace into an artifact
//! - Per-fingerprint locks that keep merges and chunk writes apart

pub mod artifacts;
pub mod backends;
pub mod chunk_store;
pub mod error;
pub mod index;
pub mod layout;
pub mod locks;
pub mod merge;
pub mod traits;

pub use artifacts::{ArtifactInfo, list_artifacts, open_artifact};
pub use backends::filesystem::FilesystemBackend;
pub use chunk_store::{ChunkStore, parse_chunk_request};
pub use error::{StorageError, StorageResult, UploadError, UploadResult};
pub use index::ChunkIndex;
pub use locks::NamespaceLocks;
pub use merge::{MergeEngine, MergeOutcome};
pub use traits::{ByteStream, ObjectMeta, ObjectStore, StreamingUpload};

use splice_core::config::StorageConfig;
use std::sync::Arc;

/// Create an object store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
    }
}
