//! Client-side upload flow.
//!
//! One run moves through
//! `Fingerprinting -> Chunking -> ResumeCheck -> Uploading -> Merging -> Done`,
//! or ends in `Failed`. The uploader keeps no state between runs: running it
//! again after a failure resumes from whatever the server reports as stored.

use crate::api_client::{TransferError, UploadTransport};
use crate::retry::{RetryPolicy, with_retry};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use splice_core::artifact::validate_file_name;
use splice_core::config::ClientConfig;
use splice_core::{
    ArtifactName, ChunkPlan, ChunkSpan, DigestAlgorithm, Fingerprint, Fingerprinter,
};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;

/// Where an upload run currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadPhase {
    Fingerprinting,
    Chunking,
    ResumeCheck,
    Uploading,
    Merging,
    Done,
    Failed,
}

/// Receives progress of an upload run. All methods default to no-ops.
pub trait UploadObserver: Send + Sync {
    fn phase(&self, _phase: UploadPhase) {}

    /// Called once after the resume check with the planned work.
    fn planned(&self, _total: u32, _already_stored: u32) {}

    fn chunk_uploaded(&self, _index: u32, _bytes: u64) {}
}

/// Observer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl UploadObserver for NoopObserver {}

/// Failures of an upload run.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid upload options: {0}")]
    InvalidOptions(String),

    #[error("failed to read source file: {0}")]
    Read(#[source] splice_core::Error),

    #[error("resume query failed: {0}")]
    LookupFailed(#[source] TransferError),

    #[error("upload of chunk {index} failed: {source}")]
    UploadFailed {
        index: u32,
        #[source]
        source: TransferError,
    },

    #[error("merge failed: {0}")]
    MergeFailed(#[source] TransferError),
}

/// Tunables of an upload run.
#[derive(Clone, Debug)]
pub struct UploadOptions {
    pub chunk_size: u64,
    pub sample_window: u64,
    pub algorithm: DigestAlgorithm,
    /// Chunks in flight at once; 1 uploads strictly in index order.
    pub parallelism: usize,
    /// Treat a failed resume query as "nothing stored yet".
    pub degrade_on_lookup_error: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for UploadOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            sample_window: config.sample_window,
            algorithm: config.algorithm,
            parallelism: config.parallelism,
            degrade_on_lookup_error: config.degrade_on_lookup_error,
        }
    }
}

/// Outcome of a successful run.
#[derive(Clone, Debug)]
pub struct UploadReport {
    pub fingerprint: Fingerprint,
    pub file_name: String,
    pub size: u64,
    pub total_chunks: u32,
    /// Indices sent during this run, ascending.
    pub uploaded: Vec<u32>,
    /// Chunks the server already had.
    pub skipped: u32,
    /// Artifact URL reported by the server.
    pub url: String,
}

/// Drives one file through the upload protocol.
pub struct Uploader<T> {
    transport: T,
    retry: Arc<dyn RetryPolicy>,
    options: UploadOptions,
    observer: Arc<dyn UploadObserver>,
}

impl<T: UploadTransport> Uploader<T> {
    pub fn new(transport: T, retry: Arc<dyn RetryPolicy>, options: UploadOptions) -> Self {
        Self {
            transport,
            retry,
            options,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn UploadObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Compute the fingerprint and size of `path` with the configured sampling.
    pub async fn fingerprint(&self, path: &Path) -> Result<(Fingerprint, u64), UploadError> {
        self.fingerprinter()
            .fingerprint_file(path)
            .await
            .map_err(UploadError::Read)
    }

    /// Upload `path` and merge it as `file_name` (default: the path's file name).
    #[tracing::instrument(skip(self), fields(fingerprint))]
    pub async fn push(
        &self,
        path: &Path,
        file_name: Option<&str>,
    ) -> Result<UploadReport, UploadError> {
        match self.run(path, file_name).await {
            Ok(report) => {
                self.observer.phase(UploadPhase::Done);
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(error = %e, "upload failed");
                self.observer.phase(UploadPhase::Failed);
                Err(e)
            }
        }
    }

    async fn run(&self, path: &Path, file_name: Option<&str>) -> Result<UploadReport, UploadError> {
        if self.options.parallelism == 0 {
            return Err(UploadError::InvalidOptions(
                "parallelism must be at least 1".to_string(),
            ));
        }
        let file_name = match file_name {
            Some(name) => name.to_string(),
            None => path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    UploadError::InvalidOptions(format!(
                        "cannot derive a file name from {}",
                        path.display()
                    ))
                })?
                .to_string(),
        };
        validate_file_name(&file_name).map_err(|e| UploadError::InvalidOptions(e.to_string()))?;

        self.observer.phase(UploadPhase::Fingerprinting);
        let (fingerprint, size) = self.fingerprint(path).await?;
        tracing::Span::current().record("fingerprint", fingerprint.as_str());

        self.observer.phase(UploadPhase::Chunking);
        let plan = ChunkPlan::new(size, self.options.chunk_size)
            .map_err(|e| UploadError::InvalidOptions(e.to_string()))?;

        let mut uploaded = Vec::new();
        let mut skipped = 0;
        if !plan.is_empty() {
            self.observer.phase(UploadPhase::ResumeCheck);
            let stored = self.resume_check(&fingerprint).await?;
            let missing: Vec<ChunkSpan> = plan
                .spans()
                .filter(|span| !stored.contains(&span.index))
                .collect();
            skipped = plan.len() - missing.len() as u32;
            self.observer.planned(plan.len(), skipped);
            tracing::info!(
                total = plan.len(),
                skipped,
                missing = missing.len(),
                "resume check complete"
            );

            self.observer.phase(UploadPhase::Uploading);
            uploaded = if self.options.parallelism == 1 {
                self.upload_sequential(path, &fingerprint, &missing).await?
            } else {
                self.upload_parallel(path, &fingerprint, &missing).await?
            };
        }

        self.observer.phase(UploadPhase::Merging);
        let mut attempts = 0u32;
        let merged = with_retry(self.retry.as_ref(), "merge", || {
            attempts += 1;
            self.transport.merge(&fingerprint, &file_name, plan.len())
        })
        .await;
        let url = match merged {
            Ok(url) => url,
            // An earlier attempt may have merged and lost only its response
            Err(e @ TransferError::Rejected { status: 400, .. }) if attempts > 1 => {
                self.recover_merge(&fingerprint, &file_name, e).await?
            }
            Err(e) => return Err(UploadError::MergeFailed(e)),
        };
        tracing::info!(%url, "upload merged");

        Ok(UploadReport {
            fingerprint,
            file_name,
            size,
            total_chunks: plan.len(),
            uploaded,
            skipped,
            url,
        })
    }

    /// Accept a retried merge that found no chunks if the artifact is served.
    async fn recover_merge(
        &self,
        fingerprint: &Fingerprint,
        file_name: &str,
        cause: TransferError,
    ) -> Result<String, UploadError> {
        let artifact = ArtifactName::new(fingerprint, file_name)
            .map_err(|e| UploadError::InvalidOptions(e.to_string()))?;
        let url = artifact.url();
        match self.transport.artifact_exists(&url).await {
            Ok(true) => {
                tracing::warn!(%url, "merge response was lost; artifact already present");
                Ok(url)
            }
            Ok(false) => Err(UploadError::MergeFailed(cause)),
            Err(e) => {
                tracing::warn!(%url, error = %e, "artifact check after merge retry failed");
                Err(UploadError::MergeFailed(cause))
            }
        }
    }

    fn fingerprinter(&self) -> Fingerprinter {
        Fingerprinter::new(self.options.sample_window, self.options.algorithm)
    }

    async fn resume_check(&self, fingerprint: &Fingerprint) -> Result<BTreeSet<u32>, UploadError> {
        let result = with_retry(self.retry.as_ref(), "resume query", || {
            self.transport.stored_chunks(fingerprint)
        })
        .await;
        match result {
            Ok(indices) => Ok(indices.into_iter().collect()),
            Err(e) if self.options.degrade_on_lookup_error => {
                tracing::warn!(error = %e, "resume query failed, uploading every chunk");
                Ok(BTreeSet::new())
            }
            Err(e) => Err(UploadError::LookupFailed(e)),
        }
    }

    async fn open(path: &Path) -> Result<File, UploadError> {
        File::open(path).await.map_err(|source| {
            UploadError::Read(splice_core::Error::Read {
                what: path.display().to_string(),
                source,
            })
        })
    }

    async fn read_span(file: &mut File, span: &ChunkSpan) -> Result<bytes::Bytes, UploadError> {
        span.read_from(file).await.map_err(|source| {
            UploadError::Read(splice_core::Error::Read {
                what: format!("chunk {}", span.index),
                source,
            })
        })
    }

    async fn send_chunk(
        &self,
        fingerprint: &Fingerprint,
        index: u32,
        data: bytes::Bytes,
    ) -> Result<u64, UploadError> {
        let len = data.len() as u64;
        with_retry(self.retry.as_ref(), "chunk upload", || {
            self.transport.upload_chunk(fingerprint, index, data.clone())
        })
        .await
        .map_err(|source| UploadError::UploadFailed { index, source })?;
        self.observer.chunk_uploaded(index, len);
        Ok(len)
    }

    /// One chunk at a time, ascending; stops at the first failure.
    async fn upload_sequential(
        &self,
        path: &Path,
        fingerprint: &Fingerprint,
        missing: &[ChunkSpan],
    ) -> Result<Vec<u32>, UploadError> {
        let mut file = Self::open(path).await?;
        let mut uploaded = Vec::with_capacity(missing.len());
        for span in missing {
            let data = Self::read_span(&mut file, span).await?;
            self.send_chunk(fingerprint, span.index, data).await?;
            uploaded.push(span.index);
        }
        Ok(uploaded)
    }

    /// Up to `parallelism` chunks in flight. The first failure stops
    /// scheduling and drops the transfers still in flight.
    async fn upload_parallel(
        &self,
        path: &Path,
        fingerprint: &Fingerprint,
        missing: &[ChunkSpan],
    ) -> Result<Vec<u32>, UploadError> {
        let mut file = Self::open(path).await?;
        let mut in_flight = FuturesUnordered::new();
        let mut uploaded = Vec::with_capacity(missing.len());

        for span in missing {
            let data = Self::read_span(&mut file, span).await?;
            let index = span.index;
            in_flight.push(async move {
                self.send_chunk(fingerprint, index, data).await.map(|_| index)
            });

            if in_flight.len() >= self.options.parallelism
                && let Some(result) = in_flight.next().await
            {
                uploaded.push(result?);
            }
        }

        while let Some(result) = in_flight.next().await {
            uploaded.push(result?);
        }

        uploaded.sort_unstable();
        Ok(uploaded)
    }
}
