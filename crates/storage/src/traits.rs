//! The object store seam between upload logic and a concrete backend.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// A boxed stream of bytes for streaming reads.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Object store abstraction over a hierarchical key space.
///
/// Keys are `/`-separated relative paths. A "directory" is any key prefix
/// that has objects below it; directories are created implicitly on write.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Whether `key` names a stored object.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Size and modification time of `key`.
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta>;

    /// Whole object in memory. Meant for chunk-sized objects.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Object content in bounded pieces, for merged artifacts.
    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream>;

    /// Put an object atomically. Concurrent puts to the same key leave one
    /// complete payload in place.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Start a streaming upload that only becomes visible on `finish`.
    async fn put_stream(&self, key: &str) -> StorageResult<Box<dyn StreamingUpload>>;

    /// List the names of objects directly inside directory `dir`
    /// (`""` is the root). Subdirectories and in-flight temporary objects are
    /// not included.
    ///
    /// Returns `None` if the directory does not exist. Never creates it.
    async fn list_dir(&self, dir: &str) -> StorageResult<Option<Vec<String>>>;

    /// Remove directory `dir` and everything below it. Missing directories
    /// are not an error.
    async fn delete_dir(&self, dir: &str) -> StorageResult<()>;

    /// Short backend identifier reported by the health endpoint.
    fn backend_name(&self) -> &'static str;

    /// Checked at startup and on every `/v1/health` request.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// What `head` reports.
#[derive(Clone, Debug)]
pub struct ObjectMeta {
    pub size: u64,
    pub last_modified: Option<time::OffsetDateTime>,
}

/// A write in progress; invisible to readers and listings until `finish`.
#[async_trait]
pub trait StreamingUpload: Send {
    /// Append `data`.
    async fn write(&mut self, data: Bytes) -> StorageResult<()>;

    /// Publish the object and return its length.
    async fn finish(self: Box<Self>) -> StorageResult<u64>;

    /// Abort the upload, discarding everything written so far.
    async fn abort(self: Box<Self>) -> StorageResult<()>;
}
