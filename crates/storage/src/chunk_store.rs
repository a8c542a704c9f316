//! Chunk persistence and the resume query.

use crate::error::{UploadError, UploadResult};
use crate::index::ChunkIndex;
use crate::layout::{chunk_key, namespace_dir};
use crate::locks::NamespaceLocks;
use crate::traits::ObjectStore;
use bytes::Bytes;
use splice_core::Fingerprint;
use std::sync::Arc;
use tracing::instrument;

/// Validate the raw parameters of a chunk write.
///
/// Both parameters are mandatory; the fingerprint must be a hex digest and
/// the index a non-negative integer that fits in `u32`.
pub fn parse_chunk_request(
    fingerprint: Option<&str>,
    index: Option<&str>,
) -> UploadResult<(Fingerprint, u32)> {
    let fingerprint = fingerprint
        .filter(|s| !s.is_empty())
        .ok_or_else(|| UploadError::InvalidChunkRequest("missing fingerprint".to_string()))?;
    let index = index
        .filter(|s| !s.is_empty())
        .ok_or_else(|| UploadError::InvalidChunkRequest("missing chunk index".to_string()))?;

    let fingerprint = Fingerprint::parse(fingerprint)
        .map_err(|e| UploadError::InvalidChunkRequest(e.to_string()))?;
    let index = index
        .parse::<u32>()
        .map_err(|_| UploadError::InvalidChunkRequest(format!("invalid chunk index {index:?}")))?;
    Ok((fingerprint, index))
}

/// Stores chunk records, one per `(fingerprint, index)`.
#[derive(Clone)]
pub struct ChunkStore {
    store: Arc<dyn ObjectStore>,
    locks: NamespaceLocks,
}

impl ChunkStore {
    pub fn new(store: Arc<dyn ObjectStore>, locks: NamespaceLocks) -> Self {
        Self { store, locks }
    }

    /// Durably store one chunk, creating the namespace on first write.
    ///
    /// Writing an index again replaces the previous record as a whole.
    #[instrument(skip(self, fingerprint, data), fields(fingerprint = %fingerprint, size = data.len()))]
    pub async fn put_chunk(
        &self,
        fingerprint: &Fingerprint,
        index: u32,
        data: Bytes,
    ) -> UploadResult<()> {
        let _guard = self.locks.shared(fingerprint).await;
        self.store
            .put(&chunk_key(fingerprint, index), data)
            .await
            .map_err(|source| UploadError::ChunkWrite {
                fingerprint: fingerprint.clone(),
                index,
                source,
            })?;
        tracing::debug!("chunk stored");
        Ok(())
    }

    /// Read the namespace of `fingerprint` into a [`ChunkIndex`].
    ///
    /// A missing namespace is an empty index; the namespace is never created.
    #[instrument(skip(self, fingerprint), fields(fingerprint = %fingerprint))]
    pub async fn stored_chunks(&self, fingerprint: &Fingerprint) -> UploadResult<ChunkIndex> {
        let _guard = self.locks.shared(fingerprint).await;
        read_index(self.store.as_ref(), fingerprint).await
    }

    /// Resume query: indices already stored for `fingerprint`, ascending.
    pub async fn resume_query(&self, fingerprint: &Fingerprint) -> UploadResult<Vec<u32>> {
        Ok(self.stored_chunks(fingerprint).await?.indices())
    }
}

/// List a namespace without locking. Callers hold the namespace lock.
pub(crate) async fn read_index(
    store: &dyn ObjectStore,
    fingerprint: &Fingerprint,
) -> UploadResult<ChunkIndex> {
    let listing = store
        .list_dir(namespace_dir(fingerprint))
        .await
        .map_err(|source| UploadError::Lookup {
            fingerprint: fingerprint.clone(),
            source,
        })?;
    Ok(match listing {
        Some(names) => ChunkIndex::from_record_names(fingerprint, names),
        None => ChunkIndex::empty(),
    })
}
