//! Local filesystem storage backend.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ByteStream, ObjectMeta, ObjectStore, StreamingUpload};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Default chunk size for streaming reads (64 KiB).
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Local filesystem object store.
///
/// In-flight writes live next to their final path under a dot-prefixed name
/// and are renamed into place once fully synced. Listings skip dotfiles, so
/// readers never observe a partial object.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend, creating the root if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the full path for a key, with path traversal protection.
    ///
    /// Runs `key_path_sync` on the blocking pool since it canonicalizes and
    /// stats paths.
    async fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        let root = self.root.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || Self::key_path_sync(&root, &key))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!("spawn_blocking failed: {e}")))
            })?
    }

    /// Resolve `key` under `root`, refusing anything that would land outside
    /// it: absolute keys, `..` or `.` components, and symlinks at the key or
    /// at its nearest existing ancestor.
    fn key_path_sync(root: &Path, key: &str) -> StorageResult<PathBuf> {
        if key.starts_with(['/', '\\']) {
            return Err(StorageError::InvalidKey(format!("absolute key: {key}")));
        }
        let all_normal = Path::new(key)
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)));
        if !all_normal {
            return Err(StorageError::InvalidKey(format!("unsafe key: {key}")));
        }

        let root_canonical = root
            .canonicalize()
            .map_err(|e| io_context(e, "canonicalize storage root"))?;
        let path = root.join(key);

        // The key itself if it exists, else the closest ancestor that does;
        // create_dir_all must not follow a symlinked directory out of the root.
        let mut ancestor = path.as_path();
        loop {
            match std::fs::symlink_metadata(ancestor) {
                Ok(meta) => {
                    let resolved = ancestor.canonicalize().map_err(|e| {
                        if meta.file_type().is_symlink() {
                            StorageError::InvalidKey(format!("dangling symlink under key: {key}"))
                        } else {
                            io_context(e, "canonicalize path")
                        }
                    })?;
                    if !resolved.starts_with(&root_canonical) {
                        return Err(StorageError::InvalidKey(format!(
                            "key resolves outside storage root: {key}"
                        )));
                    }
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => match ancestor.parent() {
                    Some(parent) => ancestor = parent,
                    None => return Ok(path),
                },
                Err(e) => return Err(io_context(e, "stat path")),
            }
        }
    }

    /// Ensure parent directory exists.
    async fn ensure_parent(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Hidden sibling path for an in-flight write.
    fn temp_path_for(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        path.with_file_name(format!(".{name}.tmp.{}", Uuid::new_v4()))
    }
}

fn io_context(e: std::io::Error, action: &str) -> StorageError {
    StorageError::Io(std::io::Error::new(e.kind(), format!("failed to {action}: {e}")))
}

fn not_found_or_io(key: &str, e: std::io::Error) -> StorageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(key.to_string())
    } else {
        StorageError::Io(e)
    }
}

#[async_trait]
impl ObjectStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_path(key).await?;
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        let path = self.key_path(key).await?;
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| not_found_or_io(key, e))?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }

        Ok(ObjectMeta {
            size: metadata.len(),
            last_modified: metadata.modified().ok().map(|t| t.into()),
        })
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.key_path(key).await?;
        let data = fs::read(&path).await.map_err(|e| not_found_or_io(key, e))?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream> {
        use tokio::io::AsyncReadExt;

        let path = self.key_path(key).await?;
        let file = fs::File::open(&path)
            .await
            .map_err(|e| not_found_or_io(key, e))?;

        let stream = async_stream::try_stream! {
            let mut file = file;
            let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
            loop {
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                yield Bytes::copy_from_slice(&buf[..n]);
            }
        };

        Ok(Box::pin(stream))
    }

    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let path = self.key_path(key).await?;
        self.ensure_parent(&path).await?;

        let temp_path = Self::temp_path_for(&path);
        let written = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
            fs::rename(&temp_path, &path).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Io(e));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn put_stream(&self, key: &str) -> StorageResult<Box<dyn StreamingUpload>> {
        let path = self.key_path(key).await?;
        self.ensure_parent(&path).await?;

        let temp_path = Self::temp_path_for(&path);
        let file = fs::File::create(&temp_path).await?;

        Ok(Box::new(FilesystemUpload {
            file: Some(file),
            temp_path,
            final_path: path,
            bytes_written: 0,
            settled: false,
        }))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn list_dir(&self, dir: &str) -> StorageResult<Option<Vec<String>>> {
        let path = self.key_path(dir).await?;
        let mut entries = match fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            // file_type() does not follow symlinks; links are never listed
            let file_type = entry.file_type().await?;
            let name = entry.file_name().to_string_lossy().to_string();
            if file_type.is_file() && !name.starts_with('.') {
                names.push(name);
            }
        }
        Ok(Some(names))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete_dir(&self, dir: &str) -> StorageResult<()> {
        if dir.is_empty() {
            return Err(StorageError::InvalidKey(
                "refusing to delete the storage root".to_string(),
            ));
        }
        let path = self.key_path(dir).await?;
        match fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("storage root not accessible: {e}"),
            ))
        })?;

        if !metadata.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("storage root is not a directory: {:?}", self.root),
            )));
        }

        Ok(())
    }
}

/// Streaming upload for filesystem backend.
///
/// Dropping it before `finish` or `abort` (a cancelled request, for one)
/// removes the temp file synchronously.
struct FilesystemUpload {
    file: Option<fs::File>,
    temp_path: PathBuf,
    final_path: PathBuf,
    bytes_written: u64,
    settled: bool,
}

impl FilesystemUpload {
    fn file(&mut self) -> StorageResult<&mut fs::File> {
        self.file.as_mut().ok_or_else(|| {
            StorageError::Io(std::io::Error::other("streaming upload already closed"))
        })
    }
}

#[async_trait]
impl StreamingUpload for FilesystemUpload {
    async fn write(&mut self, data: Bytes) -> StorageResult<()> {
        self.file()?.write_all(&data).await?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> StorageResult<u64> {
        let synced = self.file()?.sync_all().await;
        self.file = None;
        let renamed = match synced {
            Ok(()) => fs::rename(&self.temp_path, &self.final_path).await,
            Err(e) => Err(e),
        };
        self.settled = true;
        if let Err(e) = renamed {
            let _ = fs::remove_file(&self.temp_path).await;
            return Err(StorageError::Io(e));
        }
        Ok(self.bytes_written)
    }

    async fn abort(mut self: Box<Self>) -> StorageResult<()> {
        self.file = None;
        self.settled = true;
        let _ = fs::remove_file(&self.temp_path).await;
        Ok(())
    }
}

impl Drop for FilesystemUpload {
    fn drop(&mut self) {
        if !self.settled {
            self.file = None;
            if let Err(e) = std::fs::remove_file(&self.temp_path)
                && e.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!(path = %self.temp_path.display(), error = %e, "failed to remove abandoned temp file");
            }
        }
    }
}
