use async_trait::async_trait;
use bytes::Bytes;
use splice_storage::error::{StorageError, StorageResult};
use splice_storage::traits::{ByteStream, ObjectMeta, ObjectStore, StreamingUpload};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Failures a [`FaultyStore`] injects. Every switch is off by default.
#[derive(Clone, Debug, Default)]
pub struct Faults {
    /// `list_dir` fails with an I/O error.
    pub fail_list: bool,
    /// `get_stream` of any key ending in this suffix fails midway.
    pub fail_read_suffix: Option<String>,
    /// `get_stream` of any key ending in this suffix yields one piece and
    /// then never completes.
    pub stall_read_suffix: Option<String>,
    /// Streaming writes fail once this many bytes were written.
    pub fail_write_after: Option<u64>,
    /// `delete_dir` fails.
    pub fail_delete_dir: bool,
}

fn injected(what: &str) -> StorageError {
    StorageError::Io(std::io::Error::other(format!("injected {what} failure")))
}

/// Wraps a real store and injects failures on demand.
#[allow(dead_code)]
pub struct FaultyStore {
    inner: Arc<dyn ObjectStore>,
    faults: Mutex<Faults>,
    pub aborted_uploads: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl FaultyStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            faults: Mutex::new(Faults::default()),
            aborted_uploads: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn set(&self, faults: Faults) {
        *self.faults.lock().unwrap() = faults;
    }

    pub fn clear(&self) {
        self.set(Faults::default());
    }

    fn faults(&self) -> Faults {
        self.faults.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for FaultyStore {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.inner.get(key).await
    }

    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream> {
        let faults = self.faults();
        let fail = faults
            .fail_read_suffix
            .is_some_and(|suffix| key.ends_with(&suffix));
        let stall = faults
            .stall_read_suffix
            .is_some_and(|suffix| key.ends_with(&suffix));
        let mut inner = self.inner.get_stream(key).await?;
        if stall {
            return Ok(Box::pin(async_stream::try_stream! {
                use futures::StreamExt;
                if let Some(first) = inner.next().await {
                    yield first?;
                }
                futures::future::pending::<()>().await;
            }));
        }
        if !fail {
            return Ok(inner);
        }
        Ok(Box::pin(async_stream::try_stream! {
            use futures::StreamExt;
            if let Some(first) = inner.next().await {
                yield first?;
            }
            Err::<(), _>(injected("read"))?;
        }))
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.inner.put(key, data).await
    }

    async fn put_stream(&self, key: &str) -> StorageResult<Box<dyn StreamingUpload>> {
        let inner = self.inner.put_stream(key).await?;
        Ok(Box::new(FaultyUpload {
            inner,
            written: 0,
            fail_after: self.faults().fail_write_after,
            aborted: self.aborted_uploads.clone(),
        }))
    }

    async fn list_dir(&self, dir: &str) -> StorageResult<Option<Vec<String>>> {
        if self.faults().fail_list {
            return Err(injected("list"));
        }
        self.inner.list_dir(dir).await
    }

    async fn delete_dir(&self, dir: &str) -> StorageResult<()> {
        if self.faults().fail_delete_dir {
            return Err(injected("delete"));
        }
        self.inner.delete_dir(dir).await
    }

    fn backend_name(&self) -> &'static str {
        "faulty"
    }
}

struct FaultyUpload {
    inner: Box<dyn StreamingUpload>,
    written: u64,
    fail_after: Option<u64>,
    aborted: Arc<AtomicUsize>,
}

#[async_trait]
impl StreamingUpload for FaultyUpload {
    async fn write(&mut self, data: Bytes) -> StorageResult<()> {
        if self.fail_after.is_some_and(|limit| self.written + data.len() as u64 > limit) {
            return Err(injected("write (disk full)"));
        }
        self.written += data.len() as u64;
        self.inner.write(data).await
    }

    async fn finish(self: Box<Self>) -> StorageResult<u64> {
        self.inner.finish().await
    }

    async fn abort(self: Box<Self>) -> StorageResult<()> {
        self.aborted.fetch_add(1, Ordering::SeqCst);
        self.inner.abort().await
    }
}
