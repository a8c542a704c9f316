//! Read-only access to merged artifacts.

use crate::error::{StorageError, StorageResult};
use crate::layout::artifact_key;
use crate::traits::{ByteStream, ObjectMeta, ObjectStore};
use splice_core::ArtifactName;
use time::OffsetDateTime;

/// A merged artifact and its metadata.
#[derive(Clone, Debug)]
pub struct ArtifactInfo {
    pub name: ArtifactName,
    pub size: u64,
    pub modified: Option<OffsetDateTime>,
}

/// List merged artifacts, newest first.
///
/// Only top-level objects that parse as `<fingerprint>-<fileName>` count;
/// chunk namespaces are directories and never appear.
pub async fn list_artifacts(store: &dyn ObjectStore) -> StorageResult<Vec<ArtifactInfo>> {
    let names = store.list_dir("").await?.unwrap_or_default();
    let mut artifacts = Vec::with_capacity(names.len());
    for name in names {
        let Ok(name) = ArtifactName::parse(&name) else {
            tracing::debug!(%name, "skipping non-artifact entry");
            continue;
        };
        // Removed between listing and stat
        let meta = match store.head(artifact_key(&name)).await {
            Ok(meta) => meta,
            Err(StorageError::NotFound(_)) => continue,
            Err(e) => return Err(e),
        };
        artifacts.push(ArtifactInfo {
            name,
            size: meta.size,
            modified: meta.last_modified,
        });
    }
    artifacts.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| a.name.as_str().cmp(b.name.as_str()))
    });
    Ok(artifacts)
}

/// Open an artifact for streaming.
pub async fn open_artifact(
    store: &dyn ObjectStore,
    name: &ArtifactName,
) -> StorageResult<(ObjectMeta, ByteStream)> {
    let key = artifact_key(name);
    let meta = store.head(key).await?;
    let stream = store.get_stream(key).await?;
    Ok((meta, stream))
}
