//! Merge behaviour when the backend fails partway through.

mod common;

use bytes::Bytes;
use common::{FaultyStore, Faults, fingerprint, seeded_bytes};
use splice_storage::{
    ChunkStore, FilesystemBackend, MergeEngine, NamespaceLocks, ObjectStore, UploadError,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tempfile::TempDir;

struct Harness {
    dir: TempDir,
    faulty: Arc<FaultyStore>,
    chunks: ChunkStore,
    merger: MergeEngine,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let backend: Arc<dyn ObjectStore> = Arc::new(FilesystemBackend::new(dir.path()).await.unwrap());
    let faulty = FaultyStore::new(backend);
    let store: Arc<dyn ObjectStore> = faulty.clone();
    let locks = NamespaceLocks::new();
    Harness {
        chunks: ChunkStore::new(store.clone(), locks.clone()),
        merger: MergeEngine::new(store, locks),
        faulty,
        dir,
    }
}

fn top_level_entries(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(root)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn read_failure_mid_merge_leaves_no_artifact_and_keeps_chunks() {
    let h = harness().await;
    let fp = fingerprint('a');
    for i in 0..4u32 {
        h.chunks
            .put_chunk(&fp, i, seeded_bytes(i as u64, 64 * 1024))
            .await
            .unwrap();
    }

    h.faulty.set(Faults {
        fail_read_suffix: Some(format!("{fp}-2")),
        ..Faults::default()
    });
    let err = h.merger.merge(&fp, "video.mp4", 4).await.unwrap_err();
    assert!(matches!(err, UploadError::MergeFailed { .. }), "{err:?}");
    assert_eq!(h.faulty.aborted_uploads.load(Ordering::SeqCst), 1);

    // Only the namespace remains; no artifact and no temp file
    assert_eq!(top_level_entries(h.dir.path()), vec![fp.to_string()]);
    assert_eq!(h.chunks.resume_query(&fp).await.unwrap(), vec![0, 1, 2, 3]);

    // A retry after the fault clears succeeds
    h.faulty.clear();
    let outcome = h.merger.merge(&fp, "video.mp4", 4).await.unwrap();
    assert_eq!(outcome.size, 4 * 64 * 1024);
    assert_eq!(
        top_level_entries(h.dir.path()),
        vec![format!("{fp}-video.mp4")]
    );
}

#[tokio::test]
async fn cancelled_merge_leaves_no_temp_artifact() {
    let h = harness().await;
    let fp = fingerprint('f');
    for i in 0..2u32 {
        h.chunks
            .put_chunk(&fp, i, seeded_bytes(i as u64 + 20, 50_000))
            .await
            .unwrap();
    }

    h.faulty.set(Faults {
        stall_read_suffix: Some(format!("{fp}-1")),
        ..Faults::default()
    });
    let cancelled = tokio::time::timeout(
        Duration::from_millis(200),
        h.merger.merge(&fp, "big.bin", 2),
    )
    .await;
    assert!(cancelled.is_err(), "merge should still be stalled");

    assert_eq!(top_level_entries(h.dir.path()), vec![fp.to_string()]);
    assert_eq!(h.chunks.resume_query(&fp).await.unwrap(), vec![0, 1]);

    // The exclusive lock went with the dropped future
    h.faulty.clear();
    let outcome = h.merger.merge(&fp, "big.bin", 2).await.unwrap();
    assert_eq!(outcome.size, 100_000);
    assert_eq!(top_level_entries(h.dir.path()), vec![format!("{fp}-big.bin")]);
}

#[tokio::test]
async fn write_failure_mid_merge_is_reported_as_merge_failure() {
    let h = harness().await;
    let fp = fingerprint('b');
    for i in 0..3u32 {
        h.chunks
            .put_chunk(&fp, i, Bytes::from(vec![i as u8; 1000]))
            .await
            .unwrap();
    }

    h.faulty.set(Faults {
        fail_write_after: Some(1500),
        ..Faults::default()
    });
    let err = h.merger.merge(&fp, "out.bin", 3).await.unwrap_err();
    assert!(matches!(err, UploadError::MergeFailed { .. }));
    assert!(!h.dir.path().join(format!("{fp}-out.bin")).exists());
    assert_eq!(h.chunks.resume_query(&fp).await.unwrap(), vec![0, 1, 2]);
}

#[tokio::test]
async fn listing_failure_is_a_lookup_error() {
    let h = harness().await;
    let fp = fingerprint('c');
    h.chunks.put_chunk(&fp, 0, Bytes::from("x")).await.unwrap();

    h.faulty.set(Faults {
        fail_list: true,
        ..Faults::default()
    });
    assert!(matches!(
        h.chunks.resume_query(&fp).await,
        Err(UploadError::Lookup { .. })
    ));
    assert!(matches!(
        h.merger.merge(&fp, "x.txt", 1).await,
        Err(UploadError::Lookup { .. })
    ));
}

#[tokio::test]
async fn cleanup_failure_still_reports_success() {
    let h = harness().await;
    let fp = fingerprint('d');
    h.chunks.put_chunk(&fp, 0, Bytes::from("hello")).await.unwrap();

    h.faulty.set(Faults {
        fail_delete_dir: true,
        ..Faults::default()
    });
    let outcome = h.merger.merge(&fp, "hello.txt", 1).await.unwrap();
    assert!(!outcome.namespace_removed);
    assert_eq!(
        std::fs::read(h.dir.path().join(outcome.artifact.as_str())).unwrap(),
        b"hello"
    );
}
