//! Reassembly of a chunk namespace into a merged artifact.

use crate::chunk_store::read_index;
use crate::error::{StorageError, UploadError, UploadResult};
use crate::layout::{artifact_key, namespace_dir};
use crate::locks::NamespaceLocks;
use crate::traits::{ObjectStore, StreamingUpload};
use futures::StreamExt;
use splice_core::{ArtifactName, Fingerprint};
use std::sync::Arc;
use tracing::instrument;

/// Result of a successful merge.
#[derive(Clone, Debug)]
pub struct MergeOutcome {
    pub artifact: ArtifactName,
    /// Size of the artifact in bytes.
    pub size: u64,
    /// Number of chunks concatenated.
    pub chunks: u32,
    /// False if the artifact was written but the namespace could not be
    /// removed afterwards.
    pub namespace_removed: bool,
}

/// Concatenates a complete namespace into one artifact.
#[derive(Clone)]
pub struct MergeEngine {
    store: Arc<dyn ObjectStore>,
    locks: NamespaceLocks,
}

impl MergeEngine {
    pub fn new(store: Arc<dyn ObjectStore>, locks: NamespaceLocks) -> Self {
        Self { store, locks }
    }

    /// Merge the chunks of `fingerprint` into `<fingerprint>-<file_name>`.
    ///
    /// Fails with `IncompleteUpload` unless the namespace holds exactly
    /// `total` records covering `0..total`, and with `CorruptNamespace` if an
    /// index is ambiguous. The artifact is written under a temporary name and
    /// only renamed into place when complete. The namespace is deleted only
    /// after that; on any failure it is left untouched for a retry.
    #[instrument(skip(self, fingerprint), fields(fingerprint = %fingerprint))]
    pub async fn merge(
        &self,
        fingerprint: &Fingerprint,
        file_name: &str,
        total: u32,
    ) -> UploadResult<MergeOutcome> {
        let artifact = ArtifactName::new(fingerprint, file_name)
            .map_err(|e| UploadError::InvalidMergeRequest(e.to_string()))?;

        let _guard = self.locks.exclusive(fingerprint).await;

        let index = read_index(self.store.as_ref(), fingerprint).await?;
        let found = index.record_count();
        if found != total as usize {
            return Err(UploadError::IncompleteUpload {
                fingerprint: fingerprint.clone(),
                expected: total,
                found: found as u32,
            });
        }
        if let Some(detail) = index.corruption() {
            return Err(UploadError::CorruptNamespace {
                fingerprint: fingerprint.clone(),
                detail,
            });
        }
        let missing = index.missing(total);
        if !missing.is_empty() {
            tracing::warn!(?missing, "record count matches but indices are not contiguous");
            return Err(UploadError::IncompleteUpload {
                fingerprint: fingerprint.clone(),
                expected: total,
                found: total - missing.len() as u32,
            });
        }

        let merge_failed = |source: StorageError| UploadError::MergeFailed {
            fingerprint: fingerprint.clone(),
            source,
        };

        let mut upload = self
            .store
            .put_stream(artifact_key(&artifact))
            .await
            .map_err(merge_failed)?;

        let namespace = namespace_dir(fingerprint);
        let records: Vec<String> = index
            .ordered_records()
            .map(|(_, name)| format!("{namespace}/{name}"))
            .collect();
        if let Err(source) = self.concatenate(upload.as_mut(), &records).await {
            if let Err(e) = upload.abort().await {
                tracing::warn!(error = %e, "failed to discard partial artifact");
            }
            return Err(merge_failed(source));
        }
        let size = upload.finish().await.map_err(merge_failed)?;

        let namespace_removed = match self.store.delete_dir(namespace).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "artifact written but chunk namespace was not removed");
                false
            }
        };

        tracing::info!(artifact = %artifact, size, chunks = total, "merge complete");
        Ok(MergeOutcome {
            artifact,
            size,
            chunks: total,
            namespace_removed,
        })
    }

    async fn concatenate(
        &self,
        upload: &mut dyn StreamingUpload,
        records: &[String],
    ) -> Result<(), StorageError> {
        for key in records {
            let mut stream = self.store.get_stream(key).await?;
            while let Some(bytes) = stream.next().await {
                upload.write(bytes?).await?;
            }
        }
        Ok(())
    }
}
