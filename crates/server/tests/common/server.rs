//! Server test utilities.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use splice_core::config::AppConfig;
use splice_server::{AppState, create_router};
use splice_storage::{FilesystemBackend, ObjectStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// A test server wrapper with temporary storage.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    storage_root: PathBuf,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with temporary storage.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let storage_root = temp_dir.path().join("upload");

        let mut config = AppConfig::for_testing(&storage_root);
        modifier(&mut config);

        let storage: Arc<dyn ObjectStore> = Arc::new(
            FilesystemBackend::new(&storage_root)
                .await
                .expect("Failed to create storage backend"),
        );

        let state = AppState::new(config, storage);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            storage_root,
            _temp_dir: temp_dir,
        }
    }

    /// Root directory of the server's storage.
    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Send a request and return status, headers and raw body.
    pub async fn send(
        &self,
        request: Request<Body>,
    ) -> (StatusCode, axum::http::HeaderMap, bytes::Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body)
    }

    /// Send a request and parse the response body as JSON.
    pub async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, _, body) = self.send(request).await;
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Upload one chunk as a raw body.
    pub async fn upload_raw(&self, fingerprint: &str, index: u32, data: &[u8]) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(format!("/upload?fileHash={fingerprint}&index={index}"))
            .header("Content-Type", "application/octet-stream")
            .body(Body::from(data.to_vec()))
            .unwrap();
        self.send_json(request).await
    }

    /// Run a resume query.
    pub async fn resume(&self, fingerprint: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(format!("/upload/chunks?fileHash={fingerprint}"))
            .body(Body::empty())
            .unwrap();
        self.send_json(request).await
    }

    /// Request a merge.
    pub async fn merge(&self, fingerprint: &str, file_name: &str, total: u32) -> (StatusCode, Value) {
        let body = serde_json::json!({
            "fileHash": fingerprint,
            "fileName": file_name,
            "total": total,
        });
        let request = Request::builder()
            .method("POST")
            .uri("/upload/merge")
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        self.send_json(request).await
    }

    /// GET a path and return the JSON body.
    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send_json(request).await
    }
}
