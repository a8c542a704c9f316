//! HTTP client for the splice upload API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use splice_core::Fingerprint;
use splice_core::protocol::{
    AssetEntry, AssetListResponse, ChunkAck, ErrorBody, MergeRequest, MergeResponse,
    ResumeResponse,
};
use std::time::Duration;

/// Why a single request failed.
///
/// The split lets retry logic tell a stalled or dropped transfer apart from a
/// request the server will never accept.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("server reported failure: {0}")]
    Application(String),
}

impl TransferError {
    /// Whether sending the same request again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) | Self::Server { .. } => true,
            Self::Rejected { status, .. } => {
                *status == StatusCode::REQUEST_TIMEOUT.as_u16()
                    || *status == StatusCode::TOO_MANY_REQUESTS.as_u16()
            }
            Self::Application(_) => false,
        }
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }

    fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|e| e.message)
            .unwrap_or_else(|_| body.to_string());
        if status.is_server_error() {
            Self::Server {
                status: status.as_u16(),
                message,
            }
        } else {
            Self::Rejected {
                status: status.as_u16(),
                message,
            }
        }
    }
}

/// The protocol calls the upload orchestrator needs.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Resume query: indices already stored for `fingerprint`.
    async fn stored_chunks(&self, fingerprint: &Fingerprint) -> Result<Vec<u32>, TransferError>;

    /// Store one chunk.
    async fn upload_chunk(
        &self,
        fingerprint: &Fingerprint,
        index: u32,
        data: Bytes,
    ) -> Result<(), TransferError>;

    /// Merge all chunks into `file_name`; returns the artifact URL.
    async fn merge(
        &self,
        fingerprint: &Fingerprint,
        file_name: &str,
        total: u32,
    ) -> Result<String, TransferError>;

    /// Whether the artifact at `url` (as returned by a merge) is served.
    async fn artifact_exists(&self, url: &str) -> Result<bool, TransferError>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url).context("invalid server URL")?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, TransferError> {
        self.base_url
            .join(path)
            .map_err(|e| TransferError::Transport(format!("failed to build API URL: {e}")))
    }

    /// Send a request and decode a JSON body.
    ///
    /// Non-success statuses and `success: false` bodies both become errors.
    async fn send_json<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, TransferError> {
        let response = req.send().await.map_err(TransferError::from_reqwest)?;
        let status = response.status();
        let body = response.text().await.map_err(TransferError::from_reqwest)?;
        if !status.is_success() {
            return Err(TransferError::from_status(status, &body));
        }

        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| TransferError::Application(format!("invalid response body: {e}")))?;
        if value.get("success") == Some(&serde_json::Value::Bool(false)) {
            let message = value
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("no message")
                .to_string();
            return Err(TransferError::Application(message));
        }
        serde_json::from_value(value)
            .map_err(|e| TransferError::Application(format!("unexpected response: {e}")))
    }

    /// Raw `/v1/health` document.
    pub async fn health(&self) -> Result<serde_json::Value, TransferError> {
        let url = self.url("/v1/health")?;
        self.send_json(self.http.get(url)).await
    }

    pub async fn list_assets(&self) -> Result<Vec<AssetEntry>, TransferError> {
        let url = self.url("/assets")?;
        let response: AssetListResponse = self.send_json(self.http.get(url)).await?;
        Ok(response.data)
    }
}

#[async_trait]
impl UploadTransport for ApiClient {
    async fn stored_chunks(&self, fingerprint: &Fingerprint) -> Result<Vec<u32>, TransferError> {
        let url = self.url("/upload/chunks")?;
        let req = self.http.get(url).query(&[("fileHash", fingerprint.as_str())]);
        let response: ResumeResponse = self.send_json(req).await?;
        Ok(response.indices())
    }

    async fn upload_chunk(
        &self,
        fingerprint: &Fingerprint,
        index: u32,
        data: Bytes,
    ) -> Result<(), TransferError> {
        let url = self.url("/upload")?;
        let req = self
            .http
            .post(url)
            .query(&[
                ("fileHash", fingerprint.to_string()),
                ("index", index.to_string()),
            ])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data);
        let _: ChunkAck = self.send_json(req).await?;
        Ok(())
    }

    async fn merge(
        &self,
        fingerprint: &Fingerprint,
        file_name: &str,
        total: u32,
    ) -> Result<String, TransferError> {
        let url = self.url("/upload/merge")?;
        let body = MergeRequest {
            fingerprint: fingerprint.to_string(),
            file_name: file_name.to_string(),
            total,
        };
        let response: MergeResponse = self.send_json(self.http.post(url).json(&body)).await?;
        Ok(response.url)
    }

    async fn artifact_exists(&self, url: &str) -> Result<bool, TransferError> {
        let url = self.url(url)?;
        let response = self
            .http
            .head(url)
            .send()
            .await
            .map_err(TransferError::from_reqwest)?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(TransferError::from_status(status, "")),
        }
    }
}
