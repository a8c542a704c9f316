//! Client side of splice: the HTTP transport, retry policies and the
//! resumable upload orchestrator used by `splicectl`.

pub mod api_client;
pub mod config;
pub mod orchestrator;
pub mod retry;

pub use api_client::{ApiClient, TransferError, UploadTransport};
pub use orchestrator::{
    NoopObserver, UploadError, UploadObserver, UploadOptions, UploadPhase, UploadReport, Uploader,
};
pub use retry::{ExponentialBackoff, NoRetry, RetryPolicy};
